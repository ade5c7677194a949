//! OpenAI-compatible chat completions client

use super::{ChatClient, ChatResponse, Message, Role, ToolCall};
use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Chat client for any OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleClient {
    /// Create a client from configuration; the API key is read from the
    /// configured environment variable
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: std::env::var(&config.api_key_env).ok(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn message_to_value(message: &Message) -> Value {
        match message.role {
            Role::System => json!({
                "role": "system",
                "content": message.content.as_deref().unwrap_or(""),
            }),
            Role::User => json!({
                "role": "user",
                "content": message.content.as_deref().unwrap_or(""),
            }),
            Role::Assistant => {
                let mut value = json!({
                    "role": "assistant",
                    "content": message.content.as_deref().unwrap_or(""),
                });
                if !message.tool_calls.is_empty() {
                    let calls: Vec<Value> = message
                        .tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": Value::Object(tc.arguments.clone()).to_string(),
                                }
                            })
                        })
                        .collect();
                    value["tool_calls"] = Value::Array(calls);
                }
                value
            }
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": message.tool_call_id.as_deref().unwrap_or(""),
                "content": message.content.as_deref().unwrap_or(""),
            }),
        }
    }

    /// Parse the `arguments` field, which the wire protocol carries as a
    /// JSON-encoded string (some servers send a plain object)
    fn parse_arguments(value: &Value) -> Map<String, Value> {
        match value {
            Value::String(s) => serde_json::from_str::<Value>(s)
                .ok()
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default(),
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse> {
        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": messages.iter().map(Self::message_to_value).collect::<Vec<_>>(),
        });

        if !tools.is_empty() {
            let tool_defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tool_defs);
            body["tool_choice"] = json!("auto");
        }

        let url = format!("{}/chat/completions", self.base_url);
        debug!("Chat completion request to {} ({})", url, self.model);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Chat API connection failed ({url}): {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "Chat API error {status}: {text}"
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("Invalid chat API response: {e}")))?;

        let choice = json["choices"]
            .get(0)
            .ok_or_else(|| Error::Generation("No choices in response".to_string()))?;

        let content = choice["message"]["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(String::from);

        let tool_calls = choice["message"]["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| {
                        Some(ToolCall {
                            id: call["id"].as_str().unwrap_or_default().to_string(),
                            name: call["function"]["name"].as_str()?.to_string(),
                            arguments: Self::parse_arguments(&call["function"]["arguments"]),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason: choice["finish_reason"].as_str().map(String::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(url: &str) -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(&GenerationConfig {
            base_url: url.to_string(),
            model: "test-model".to_string(),
            api_key_env: "LECTERN_TEST_MISSING_KEY".to_string(),
            temperature: 0.0,
            max_tokens: 800,
        })
    }

    fn sample_tool() -> ToolDefinition {
        ToolDefinition {
            name: "search_course_content".to_string(),
            description: "Search".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    #[tokio::test]
    async fn test_text_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": "test-model" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "An answer" },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let response = client_for(&server.uri())
            .complete(&[Message::user("hello")], &[])
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("An answer"));
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_tool_call_parsed_from_string_arguments() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "search_course_content",
                                "arguments": "{\"query\": \"widgets\", \"lesson_number\": 2}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let response = client_for(&server.uri())
            .complete(&[Message::user("q")], &[sample_tool()])
            .await
            .unwrap();

        assert_eq!(response.tool_calls.len(), 1);
        let call = &response.tool_calls[0];
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "search_course_content");
        assert_eq!(call.arguments.get("query"), Some(&json!("widgets")));
        assert_eq!(call.arguments.get("lesson_number"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_api_error_becomes_generation_fault() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .complete(&[Message::user("q")], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_tools_advertised_in_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "tool_choice": "auto",
                "tools": [{ "function": { "name": "search_course_content" } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "ok" },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let response = client_for(&server.uri())
            .complete(&[Message::user("q")], &[sample_tool()])
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("ok"));
    }
}
