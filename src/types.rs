//! Conversation data types
//!
//! These mirror the values bag the backing agent process publishes for a
//! thread. Field names follow the wire format so snapshots deserialize as-is.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Name of the tool whose pending calls mean a subagent task is in flight
pub const TASK_TOOL_NAME: &str = "task";

// ============================================================================
// Messages
// ============================================================================

/// Role tag of a conversational turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Human,
    Ai,
    Tool,
    System,
    Remove,
    Function,
    /// Any role this crate does not model
    #[serde(other)]
    Other,
}

/// Message content: plain text or provider content blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<Value>),
}

impl MessageContent {
    /// Concatenated text of the content, ignoring non-text blocks
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// Tool invocation requested by an AI message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// One ordered conversational turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Locally authored human message with a fresh UUIDv4 id
    pub fn human(content: impl Into<MessageContent>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message_type: MessageType::Human,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Whether this message requests a `task` tool call (subagent run)
    #[must_use]
    pub fn has_task_tool_call(&self) -> bool {
        self.tool_calls
            .iter()
            .any(|call| call.name == TASK_TOOL_NAME)
    }
}

/// Branching metadata the stream keeps per message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub message_id: String,
    #[serde(default)]
    pub first_seen_checkpoint: Option<Checkpoint>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub branch_options: Vec<String>,
}

// ============================================================================
// Execution references
// ============================================================================

/// Reference to a prior execution point a run can resume from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_ns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_map: Option<Value>,
}

impl Checkpoint {
    pub fn new(checkpoint_id: impl Into<String>) -> Self {
        Self {
            checkpoint_id: Some(checkpoint_id.into()),
            ..Self::default()
        }
    }
}

/// A paused run awaiting external input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interrupt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// The agent deployment a conversation runs against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assistant {
    pub assistant_id: String,
    /// Run configuration merged into every submission
    #[serde(default)]
    pub config: Map<String, Value>,
}

// ============================================================================
// Application state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub status: TodoStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Email {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_content: Option<String>,
}

/// One discrete state mutation reported by the backing process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdateEvent {
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Stage that produced the update
    pub node: String,
    pub updated_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Map<String, Value>>,
    #[serde(
        default,
        rename = "messageId",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_id: Option<String>,
}

impl StateUpdateEvent {
    /// New event stamped with a fresh id and the current time
    pub fn new(
        node: impl Into<String>,
        updated_fields: Vec<String>,
        state: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            node: node.into(),
            updated_fields,
            state,
            message_id: None,
        }
    }

    /// State entries worth showing: drops null, `false` and empty strings
    pub fn meaningful_state(&self) -> Vec<(&str, &Value)> {
        let Some(state) = &self.state else {
            return Vec::new();
        };
        state
            .iter()
            .filter(|(_, value)| match value {
                Value::Null | Value::Bool(false) => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            })
            .map(|(key, value)| (key.as_str(), value))
            .collect()
    }
}

/// The values bag of a thread as published in each snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionValues {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub todos: Vec<TodoItem>,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    /// Renderer-owned descriptor, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<Value>,
    #[serde(default)]
    pub state_update_events: Vec<StateUpdateEvent>,

    // Fields mirrored into the values bag by older backends. Their types were
    // never fixed, so they stay raw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_human: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shown_menu: Option<Value>,
    /// Either a label or a structured record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_events: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_saved: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_menu: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive_case_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive_case_message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive_case_summary: Option<Value>,

    /// Keys this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
