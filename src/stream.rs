//! Trait abstractions for the remote stream
//!
//! The transport itself lives outside this crate. These traits describe the
//! capabilities the controller consumes, so tests can drive it with mocks.

use crate::types::{Assistant, Checkpoint, Interrupt, MessageMetadata, SessionValues};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stage that invokes tools; runs pause around it
pub const TOOLS_NODE: &str = "tools";

/// Terminal stage of every run
pub const END_NODE: &str = "__end__";

// ============================================================================
// Submission
// ============================================================================

/// Projection applied to the current values before the server confirms a run
#[derive(Clone)]
pub struct OptimisticValues(Arc<dyn Fn(&SessionValues) -> SessionValues + Send + Sync>);

impl OptimisticValues {
    pub fn new<F>(project: F) -> Self
    where
        F: Fn(&SessionValues) -> SessionValues + Send + Sync + 'static,
    {
        Self(Arc::new(project))
    }

    /// Replace the message list, keeping every other value
    pub fn messages(messages: Vec<crate::types::Message>) -> Self {
        Self::new(move |prev| SessionValues {
            messages: messages.clone(),
            ..prev.clone()
        })
    }

    pub fn project(&self, prev: &SessionValues) -> SessionValues {
        (self.0)(prev)
    }
}

impl fmt::Debug for OptimisticValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OptimisticValues(..)")
    }
}

/// Execution config sent with a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunConfig {
    /// Ceiling on agent steps, bounding runaway loops
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursion_limit: Option<u32>,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl RunConfig {
    /// Start from the assistant's own config, if any
    pub fn from_assistant(assistant: Option<&Assistant>) -> Self {
        let Some(assistant) = assistant else {
            return Self::default();
        };
        let mut values = assistant.config.clone();
        let recursion_limit = values
            .remove("recursion_limit")
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok());
        Self {
            recursion_limit,
            values,
        }
    }

    #[must_use]
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = Some(limit);
        self
    }
}

/// Control directive for the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Jump to a stage, applying `update` first (null for none)
    Goto { goto: String, update: Option<Value> },
    /// Resume an interrupted stage with a value
    Resume { resume: Value },
}

impl Command {
    pub fn goto_end() -> Self {
        Command::Goto {
            goto: END_NODE.to_string(),
            update: None,
        }
    }

    pub fn resume(value: Value) -> Self {
        Command::Resume { resume: value }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub optimistic_values: Option<OptimisticValues>,
    pub config: Option<RunConfig>,
    pub checkpoint: Option<Checkpoint>,
    pub interrupt_before: Vec<String>,
    pub interrupt_after: Vec<String>,
    pub command: Option<Command>,
}

impl SubmitOptions {
    /// Pause right after the tools stage, or right before it
    #[must_use]
    pub fn pause_at_tools(mut self, after: bool) -> Self {
        if after {
            self.interrupt_after = vec![TOOLS_NODE.to_string()];
        } else {
            self.interrupt_before = vec![TOOLS_NODE.to_string()];
        }
        self
    }
}

/// Options used when (re)subscribing to a thread
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    pub assistant_id: String,
    pub thread_id: Option<String>,
    pub reconnect_on_mount: bool,
    pub fetch_state_history: bool,
    pub default_headers: Vec<(String, String)>,
}

impl StreamOptions {
    pub fn new(assistant_id: impl Into<String>, thread_id: Option<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            thread_id,
            reconnect_on_mount: true,
            fetch_state_history: true,
            default_headers: vec![("x-auth-scheme".to_string(), "langsmith".to_string())],
        }
    }
}

// ============================================================================
// Updates delivered by the stream
// ============================================================================

/// Consolidated state of the thread as last reported by the stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSnapshot {
    #[serde(default)]
    pub values: SessionValues,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default)]
    pub is_thread_loading: bool,
    #[serde(default)]
    pub interrupt: Option<Interrupt>,
    /// Keyed by message id
    #[serde(default)]
    pub messages_metadata: HashMap<String, MessageMetadata>,
}

/// Callbacks the stream makes into the controller
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamUpdate {
    /// New consolidated snapshot; replaces the previous one wholesale
    Values(StreamSnapshot),
    /// Out-of-band custom event
    Custom(Value),
    /// A new thread or run was created
    Created,
    Finish,
    Error(String),
    /// The stream assigned a session identifier
    ThreadId(String),
}

// ============================================================================
// Collaborators
// ============================================================================

/// The remote stream. Submissions are fire-and-forget; results come back as
/// [`StreamUpdate`]s.
pub trait StreamAdapter: Send + Sync {
    /// Subscribe to a thread (or to nothing yet, when `thread_id` is `None`)
    fn connect(&self, options: &StreamOptions);

    /// Start or resume a run. `input` is a partial state update, or `None`.
    fn submit(&self, input: Option<Value>, options: SubmitOptions);

    /// Request cooperative cancellation of the in-flight run
    fn stop(&self);
}

/// Durable writes against the thread state
#[async_trait]
pub trait StateWriter: Send + Sync {
    /// Merge `values` (a partial state) into the thread's stored values
    async fn update_state(&self, thread_id: &str, values: Value) -> Result<(), String>;
}

/// Notified whenever the thread list may need refreshing
pub trait HistoryRevalidator: Send + Sync {
    fn revalidate(&self);
}

impl<F: Fn() + Send + Sync> HistoryRevalidator for F {
    fn revalidate(&self) {
        self();
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

impl<T: StreamAdapter + ?Sized> StreamAdapter for Arc<T> {
    fn connect(&self, options: &StreamOptions) {
        (**self).connect(options);
    }

    fn submit(&self, input: Option<Value>, options: SubmitOptions) {
        (**self).submit(input, options);
    }

    fn stop(&self) {
        (**self).stop();
    }
}

#[async_trait]
impl<T: StateWriter + ?Sized> StateWriter for Arc<T> {
    async fn update_state(&self, thread_id: &str, values: Value) -> Result<(), String> {
        (**self).update_state(thread_id, values).await
    }
}
