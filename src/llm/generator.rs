//! Tool-mediated answer generation
//!
//! Drives the model through at most two rounds: an initial completion, and,
//! when the model requests tools, one follow-up completion over the
//! conversation augmented with the tool results. The model decides whether
//! retrieval happens at all; the loop only enforces the one-round cap.

use super::{ChatClient, Message};
use crate::error::Result;
use crate::tools::{ToolDefinition, ToolManager};
use tracing::{debug, warn};

/// System prompt for course-material answering
pub const SYSTEM_PROMPT: &str = "\
You are an AI assistant specialized in course materials and educational \
content, with access to a search tool for course information.

Search tool usage:
- Use the search tool only for questions about specific course content or detailed educational materials
- One search per query maximum
- Synthesize search results into accurate, fact-based responses
- If the search yields no results, state this clearly without offering alternatives

Response protocol:
- General knowledge questions: answer from existing knowledge without searching
- Course-specific questions: search first, then answer
- No meta-commentary: provide direct answers only; do not describe your reasoning process or the search itself

All responses must be brief, concise and focused, educational, and clear.";

/// Generates answers, executing requested tools between rounds
pub struct AnswerGenerator {
    client: Box<dyn ChatClient>,
}

impl AnswerGenerator {
    pub fn new(client: Box<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// Generate a final answer for `query`.
    ///
    /// `history` is an opaque formatted transcript appended to the system
    /// prompt. Tool requests in the first response are executed in request
    /// order through `tool_manager`; the second response is final even if it
    /// requests further tools. Chat API faults propagate as `Err` and are
    /// never conflated with "search found nothing".
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: &[ToolDefinition],
        tool_manager: Option<&ToolManager>,
    ) -> Result<String> {
        let system = match history {
            Some(history) if !history.is_empty() => {
                format!("{SYSTEM_PROMPT}\n\nPrevious conversation:\n{history}")
            }
            _ => SYSTEM_PROMPT.to_string(),
        };

        let mut messages = vec![Message::system(system), Message::user(query)];

        let response = self.client.complete(&messages, tools).await?;

        if response.tool_calls.is_empty() {
            return Ok(response.content.unwrap_or_default());
        }

        let Some(manager) = tool_manager else {
            // Tools requested but nobody to run them; return what text we have
            warn!("Model requested tools but no tool manager was provided");
            return Ok(response.content.unwrap_or_default());
        };

        // Execute every requested tool synchronously, in request order
        let tool_calls = response.tool_calls.clone();
        messages.push(Message::assistant(response.content, response.tool_calls));

        for call in &tool_calls {
            debug!("Executing tool '{}' ({})", call.name, call.id);
            let result = match manager.execute(&call.name, &call.arguments).await {
                Ok(text) => text,
                // Unknown tools and invalid arguments become tool-error
                // turns the model can react to, not aborts
                Err(e) => {
                    warn!("Tool '{}' failed: {}", call.name, e);
                    format!("Tool execution error: {e}")
                }
            };
            messages.push(Message::tool_result(call.id.clone(), result));
        }

        // One re-query round at most: this response is final, even if the
        // model asks for another search
        let final_response = self.client.complete(&messages, tools).await?;
        Ok(final_response.content.unwrap_or_default())
    }
}
