//! Core data models for the assistant
//!
//! Everything here is a transient, per-call value: messages produced while a
//! query flows through the supervisor and agents, and the input/output shape
//! shared by every tool. No durable state lives in this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

//
// ================= Messages =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// One turn in the conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: Role,
    /// Sender name: "user", an agent name, or a tool name for tool results
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl AgentMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            name: "user".to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            name: name.into(),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Assistant turn that requests tool invocations instead of answering
    pub fn tool_request(name: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            name: name.into(),
            content: String::new(),
            tool_calls,
        }
    }

    /// Result of a tool invocation, named after the tool that produced it
    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            name: tool_name.into(),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: Value,
}

/// Structured tool result.
///
/// Domain validation failures and upstream call failures are both carried in
/// the `data` payload under an `"error"` key with `success == false`; callers
/// (ultimately the language model) inspect that key rather than handling a
/// raised fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            data: serde_json::json!({ "error": message }),
            error: Some(message),
        }
    }
}
