//! Tool registry
//!
//! Tools implement [`ToolHandler`] and are registered by name. The registry is
//! shared by the server and safe to read from many requests at once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use stepmcp_core::{CallToolResult, McpError, McpResult, RequestContext};
use tracing::debug;

/// One named tool argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolArgument {
    /// Argument name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Whether the caller must supply it
    pub required: bool,
    /// Value used when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ToolArgument {
    /// A required string argument.
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// An optional string argument with a default value.
    pub fn optional(
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            default: Some(default.into()),
        }
    }
}

/// What `tools/list` reports for a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (unique within a registry)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Accepted arguments
    pub arguments: Vec<ToolArgument>,
}

impl ToolDescriptor {
    /// A descriptor without arguments.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arguments: Vec::new(),
        }
    }

    /// Add an argument.
    #[must_use]
    pub fn argument(mut self, argument: ToolArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// JSON Schema for the arguments object.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for arg in &self.arguments {
            let mut schema = json!({ "type": "string", "description": arg.description });
            if let Some(default) = &arg.default {
                schema["default"] = Value::String(default.clone());
            }
            properties.insert(arg.name.clone(), schema);
        }
        let required: Vec<&str> = self
            .arguments
            .iter()
            .filter(|a| a.required)
            .map(|a| a.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Arguments of a `tools/call` request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    /// Empty arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string argument.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), Value::String(value.into()));
        self
    }

    /// Raw value of an argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A required string argument.
    ///
    /// # Errors
    ///
    /// `InvalidParams` if the argument is missing or not a string.
    pub fn string(&self, name: &str) -> McpResult<String> {
        self.optional_string(name)?
            .ok_or_else(|| McpError::invalid_params(format!("Missing required argument '{}'", name)))
    }

    /// A string argument, falling back to `default` when missing or null.
    ///
    /// # Errors
    ///
    /// `InvalidParams` if the argument is present but not a string.
    pub fn string_or(&self, name: &str, default: &str) -> McpResult<String> {
        Ok(self
            .optional_string(name)?
            .unwrap_or_else(|| default.to_string()))
    }

    fn optional_string(&self, name: &str) -> McpResult<Option<String>> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(McpError::invalid_params(format!(
                "Argument '{}' must be a string, got {}",
                name, other
            ))),
        }
    }
}

impl TryFrom<Value> for ToolArguments {
    type Error = McpError;

    fn try_from(value: Value) -> McpResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self(map)),
            other => Err(McpError::invalid_params(format!(
                "Tool arguments must be an object, got {}",
                other
            ))),
        }
    }
}

impl From<Map<String, Value>> for ToolArguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A callable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and arguments.
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool for one request.
    async fn call(&self, args: ToolArguments, ctx: RequestContext) -> McpResult<CallToolResult>;
}

/// Name-indexed set of tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn ToolHandler>>>>,
}

impl ToolRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its descriptor's name.
    ///
    /// # Errors
    ///
    /// `InvalidParams` if a tool with that name already exists.
    pub fn register(&self, tool: Arc<dyn ToolHandler>) -> McpResult<()> {
        let name = tool.descriptor().name;
        let mut tools = self.tools.write();
        if tools.contains_key(&name) {
            return Err(McpError::invalid_params(format!(
                "Tool '{}' is already registered",
                name
            ))
            .with_component("tool_registry"));
        }
        debug!(tool = %name, "Registered tool");
        tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.read().get(name).cloned()
    }

    /// Descriptors of every tool, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<_> = self.tools.read().values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    /// Invoke a tool by name.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` for unknown names, otherwise whatever the tool returns.
    pub async fn call(
        &self,
        name: &str,
        args: ToolArguments,
        ctx: RequestContext,
    ) -> McpResult<CallToolResult> {
        // Clone the handler out so the lock isn't held across the await.
        let tool = self.get(name).ok_or_else(|| McpError::tool_not_found(name))?;
        tool.call(args, ctx)
            .await
            .map_err(|e| e.with_operation(format!("tools/call {}", name)))
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.tools.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
