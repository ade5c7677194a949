//! Course content search tool

use super::{Source, Tool, ToolDefinition};
use crate::error::{Error, Result};
use crate::index::{SearchResults, VectorIndex};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Semantic search over course content with fuzzy course-name matching.
///
/// Records the provenance of the most recent search in a single-slot buffer,
/// overwritten on every call and drained by the orchestrator after
/// generation completes. The engine builds one tool instance per in-flight
/// query, so buffers never cross sessions.
pub struct CourseSearchTool {
    index: Arc<VectorIndex>,
    last_sources: Mutex<Vec<Source>>,
}

impl CourseSearchTool {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            last_sources: Mutex::new(Vec::new()),
        }
    }

    /// Format hits as provenance-tagged blocks and record their sources
    async fn format_results(&self, results: &SearchResults) -> String {
        let mut blocks = Vec::with_capacity(results.documents.len());
        let mut sources: Vec<Source> = Vec::new();

        for (document, meta) in results.documents.iter().zip(results.metadata.iter()) {
            let label = match meta.lesson_number {
                Some(n) => format!("{} - Lesson {}", meta.course_title, n),
                None => meta.course_title.clone(),
            };

            blocks.push(format!("[{label}]\n{document}"));

            // Lesson link when available, else the course link
            let url = match meta.lesson_number {
                Some(n) => match self.index.get_lesson_link(&meta.course_title, n).await {
                    Ok(Some(link)) => Some(link),
                    _ => self
                        .index
                        .get_course_link(&meta.course_title)
                        .await
                        .ok()
                        .flatten(),
                },
                None => self
                    .index
                    .get_course_link(&meta.course_title)
                    .await
                    .ok()
                    .flatten(),
            };

            let source = Source { label, url };
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        *self.last_sources.lock().unwrap() = sources;

        blocks.join("\n\n")
    }
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_course_content".to_string(),
            description:
                "Search course materials with smart course name matching and lesson filtering"
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| {
                Error::InvalidArgument("'query' is required and must be non-empty".to_string())
            })?;

        let course_name = args.get("course_name").and_then(|v| v.as_str());
        let lesson_number = args.get("lesson_number").and_then(|v| v.as_i64());

        debug!(
            "Searching: query='{}' course={:?} lesson={:?}",
            query, course_name, lesson_number
        );

        let results = self
            .index
            .search(query, course_name, lesson_number, None)
            .await;

        if let Some(error) = &results.error {
            return Ok(error.clone());
        }

        if results.is_empty() {
            let mut message = String::from("No relevant content found");
            if let Some(name) = course_name {
                message.push_str(&format!(" in course '{name}'"));
            }
            if let Some(n) = lesson_number {
                message.push_str(&format!(" in lesson {n}"));
            }
            message.push('.');
            return Ok(message);
        }

        Ok(self.format_results(&results).await)
    }

    fn take_sources(&self) -> Vec<Source> {
        std::mem::take(&mut self.last_sources.lock().unwrap())
    }
}
