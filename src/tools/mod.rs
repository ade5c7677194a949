//! Tool definitions and the tool registry
//!
//! Any type implementing [`Tool`] can be registered with a [`ToolManager`]
//! and surfaced to the model. The manager dispatches execution by name and
//! collects the sources recorded by search tools for later citation.

mod search;

pub use search::*;

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Tool definition surfaced to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A citation recorded by a search tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub label: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A capability the model can invoke
#[async_trait]
pub trait Tool: Send + Sync {
    /// Definition advertised to the model
    fn definition(&self) -> ToolDefinition;

    /// Execute with the model-provided arguments, returning the textual
    /// result the model will see
    async fn execute(&self, args: &Map<String, Value>) -> Result<String>;

    /// Drain the sources recorded by the most recent execution
    fn take_sources(&self) -> Vec<Source> {
        Vec::new()
    }
}

/// Name-keyed tool registry
#[derive(Default)]
pub struct ToolManager {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its declared name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
    }

    /// All registered tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Execute a tool by name.
    ///
    /// Fails with [`Error::UnknownTool`] when no tool carries the name; the
    /// generation loop reports that back to the model as a tool-error turn.
    pub async fn execute(&self, name: &str, args: &Map<String, Value>) -> Result<String> {
        match self.tools.get(name) {
            Some(tool) => tool.execute(args).await,
            None => Err(Error::UnknownTool(name.to_string())),
        }
    }

    /// Drain the sources recorded since the last drain.
    ///
    /// Read-and-clear: a second drain without an intervening search yields
    /// an empty list.
    pub fn drain_last_sources(&self) -> Vec<Source> {
        self.tools.values().flat_map(|t| t.take_sources()).collect()
    }
}
