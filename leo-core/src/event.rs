//! Line protocol of the chat stream.
//!
//! Every event is one JSON object on its own line:
//! `{"content": "..."}`, `{"tool_call": {...}}` or `{"error": "..."}`.

use serde::{Deserialize, Serialize};

use crate::Value;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ChatEvent {
    Content(String),
    ToolCall(ToolCallEvent),
    Error(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCallEvent {
    pub name: String,
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl ChatEvent {
    pub fn content(text: impl Into<String>) -> Self {
        ChatEvent::Content(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        ChatEvent::Error(message.into())
    }

    pub fn tool_call(name: impl Into<String>, arguments: Value, result: Option<String>) -> Self {
        ChatEvent::ToolCall(ToolCallEvent {
            name: name.into(),
            arguments,
            result,
        })
    }

    /// Serialized form without the trailing newline.
    pub fn to_line(&self) -> String {
        // Externally tagged enums of strings and maps cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }

    pub fn from_line(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }
}
