//! MCP wire types used by the progress, logging and sampling surfaces.
//!
//! Only the subset of the MCP 2025-06-18 schema that stepmcp touches is
//! modelled here. Field names follow the protocol's camelCase spelling.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Progress
// ============================================================================

/// Opaque token a client attaches to a request when it wants progress updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    /// String token
    String(String),
    /// Numeric token
    Number(i64),
}

impl From<&str> for ProgressToken {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ProgressToken {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ProgressToken {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Progress notification per MCP 2025-06-18 specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressNotification {
    /// The progress token which was given in the initial request
    #[serde(rename = "progressToken")]
    pub progress_token: ProgressToken,
    /// The progress thus far. Increases every time progress is made.
    pub progress: f64,
    /// Total number of steps, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// An optional message describing the current progress
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Logging
// ============================================================================

/// Client log levels (syslog severities, RFC 5424)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Notice level
    Notice,
    /// Warning level
    Warning,
    /// Error level
    Error,
    /// Critical level
    Critical,
    /// Alert level
    Alert,
    /// Emergency level
    Emergency,
}

/// Log message sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingNotification {
    /// Severity
    pub level: LogLevel,
    /// Arbitrary JSON payload, usually a string
    pub data: Value,
    /// Optional logger name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
}

/// Server-initiated notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ServerNotification {
    /// Log message
    #[serde(rename = "notifications/message")]
    Message(LoggingNotification),

    /// Progress update
    #[serde(rename = "notifications/progress")]
    Progress(ProgressNotification),
}

impl ServerNotification {
    /// The JSON-RPC method name of this notification.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Message(_) => "notifications/message",
            Self::Progress(_) => "notifications/progress",
        }
    }
}

// ============================================================================
// Content and sampling
// ============================================================================

/// Role in a conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User role (human or client)
    #[default]
    User,
    /// Assistant role (AI or server)
    Assistant,
}

/// Content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Text content
    Text {
        /// The text
        text: String,
    },
}

impl Content {
    /// Create text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Borrow the text, if this is a text block.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
        }
    }
}

/// Sampling message structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingMessage {
    /// Message role
    pub role: Role,
    /// Message content
    pub content: Content,
}

impl SamplingMessage {
    /// A user-role text message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::text(text),
        }
    }

    /// An assistant-role text message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::text(text),
        }
    }
}

/// Create message request (for LLM sampling)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    /// Messages to include in the sampling request
    pub messages: Vec<SamplingMessage>,
    /// System prompt (optional)
    #[serde(rename = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Temperature for sampling (0.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate
    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(rename = "stopSequences", skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Create message result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMessageResult {
    /// The role of the message
    pub role: Role,
    /// The generated message content
    pub content: Content,
    /// Model used for generation
    pub model: String,
    /// Stop reason (if applicable)
    #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

// ============================================================================
// Tool results
// ============================================================================

/// Result of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Content blocks returned by the tool
    pub content: Vec<Content>,
    /// Whether the tool reported an error
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    /// A successful result with a single text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: None,
        }
    }

    /// Text of the first content block, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(Content::as_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_notification_wire_format() {
        let notification = ServerNotification::Progress(ProgressNotification {
            progress_token: ProgressToken::from("abc"),
            progress: 3.0,
            total: Some(10.0),
            message: Some("Long running progress: 3".to_string()),
        });

        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(
            value,
            json!({
                "method": "notifications/progress",
                "params": {
                    "progressToken": "abc",
                    "progress": 3.0,
                    "total": 10.0,
                    "message": "Long running progress: 3"
                }
            })
        );
    }

    #[test]
    fn test_numeric_progress_token() {
        let token: ProgressToken = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(token, ProgressToken::Number(42));
        assert_eq!(token.to_string(), "42");
    }

    #[test]
    fn test_sampling_request_skips_unset_fields() {
        let request = CreateMessageRequest {
            messages: vec![SamplingMessage::user("hi")],
            max_tokens: Some(100),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "messages": [{"role": "user", "content": {"type": "text", "text": "hi"}}],
                "maxTokens": 100
            })
        );
    }
}
