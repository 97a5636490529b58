//! Conversation controller
//!
//! Owns the exposed session state and turns caller intent into stream
//! submissions. Everything runs on the caller's task: operations take
//! `&mut self`, submit, and return; their effects show up through later
//! [`StreamUpdate`]s fed into [`ConversationController::handle`].

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::events::{aggregate_state_updates, ConversationEventLog};
use crate::session::SessionContext;
use crate::stream::{
    Command, HistoryRevalidator, OptimisticValues, RunConfig, StateWriter, StreamAdapter,
    StreamOptions, StreamSnapshot, StreamUpdate, SubmitOptions,
};
use crate::types::{
    Assistant, Checkpoint, Email, Interrupt, Message, MessageMetadata, MessageType,
    SessionValues, StateUpdateEvent, TodoItem,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Read-only view handed to the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatView {
    pub thread_id: Option<String>,
    pub messages: Vec<Message>,
    pub todos: Vec<TodoItem>,
    pub files: BTreeMap<String, String>,
    pub email: Option<Email>,
    pub ui: Option<Value>,
    pub is_loading: bool,
    pub is_thread_loading: bool,
    pub interrupt: Option<Interrupt>,
    /// Snapshot events followed by events derived from custom payloads
    pub state_update_events: Vec<StateUpdateEvent>,
    #[serde(skip)]
    messages_metadata: HashMap<String, MessageMetadata>,
}

impl ChatView {
    pub fn message_metadata(&self, message: &Message) -> Option<&MessageMetadata> {
        self.messages_metadata.get(&message.id)
    }
}

/// Drives one conversation over a [`StreamAdapter`]
pub struct ConversationController<A, W>
where
    A: StreamAdapter,
    W: StateWriter,
{
    config: SyncConfig,
    assistant: Option<Assistant>,
    adapter: A,
    writer: W,
    session: SessionContext,
    revalidator: Option<Arc<dyn HistoryRevalidator>>,
    snapshot: StreamSnapshot,
    /// Projected values shown until the next snapshot arrives
    optimistic: Option<SessionValues>,
    conversation_events: ConversationEventLog,
}

impl<A, W> ConversationController<A, W>
where
    A: StreamAdapter,
    W: StateWriter,
{
    pub fn new(
        config: SyncConfig,
        assistant: Option<Assistant>,
        adapter: A,
        writer: W,
        session: SessionContext,
    ) -> Self {
        let conversation_events = ConversationEventLog::new(config.max_conversation_events);
        Self {
            config,
            assistant,
            adapter,
            writer,
            session,
            revalidator: None,
            snapshot: StreamSnapshot::default(),
            optimistic: None,
            conversation_events,
        }
    }

    /// Notify `revalidator` whenever the thread list may have changed
    #[must_use]
    pub fn with_revalidator(mut self, revalidator: Arc<dyn HistoryRevalidator>) -> Self {
        self.revalidator = Some(revalidator);
        self
    }

    /// Subscribe the adapter to the current session
    pub fn connect(&self) {
        let assistant_id = self
            .assistant
            .as_ref()
            .map(|a| a.assistant_id.clone())
            .or_else(|| self.config.assistant_id.clone())
            .unwrap_or_default();
        let options = StreamOptions::new(assistant_id, self.session.thread_id().map(String::from));
        tracing::info!(
            assistant_id = %options.assistant_id,
            thread_id = ?options.thread_id,
            "Connecting conversation stream"
        );
        self.adapter.connect(&options);
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.session.thread_id()
    }

    // ==================== Operations ====================

    /// Send a human message. Returns the locally generated message id.
    pub fn send_message(&mut self, content: impl Into<String>) -> String {
        let message = Message::human(content.into());
        let id = message.id.clone();
        let input = json!({ "messages": [&message] });

        let optimistic = OptimisticValues::new(move |prev| {
            let mut next = prev.clone();
            next.messages.push(message.clone());
            next
        });
        let options = SubmitOptions {
            optimistic_values: Some(optimistic),
            config: Some(self.run_config().with_recursion_limit(self.config.recursion_limit)),
            ..SubmitOptions::default()
        };

        self.submit(Some(input), options);
        self.revalidate();
        id
    }

    /// Take one step. With a checkpoint, `messages` is ignored and execution
    /// resumes from that point; without one, `messages` is submitted fresh.
    pub fn run_single_step(
        &mut self,
        messages: Vec<Message>,
        checkpoint: Option<Checkpoint>,
        is_rerunning_subagent: bool,
        optimistic_messages: Option<Vec<Message>>,
    ) {
        let config = Some(self.run_config());
        match checkpoint {
            Some(checkpoint) => {
                let options = SubmitOptions {
                    optimistic_values: optimistic_messages.map(OptimisticValues::messages),
                    config,
                    checkpoint: Some(checkpoint),
                    ..SubmitOptions::default()
                }
                .pause_at_tools(is_rerunning_subagent);
                self.submit(None, options);
            }
            None => {
                let options = SubmitOptions {
                    config,
                    ..SubmitOptions::default()
                }
                .pause_at_tools(false);
                self.submit(Some(json!({ "messages": messages })), options);
            }
        }
    }

    /// Resume the current run without new input
    pub fn continue_stream(&mut self, has_task_tool_call: bool) {
        let options = SubmitOptions {
            config: Some(self.run_config().with_recursion_limit(self.config.recursion_limit)),
            ..SubmitOptions::default()
        }
        .pause_at_tools(has_task_tool_call);
        self.submit(None, options);
        self.revalidate();
    }

    pub fn stop_stream(&self) {
        tracing::debug!(thread_id = ?self.session.thread_id(), "Stopping stream");
        self.adapter.stop();
    }

    /// Force the run to its terminal stage
    pub fn mark_current_thread_as_resolved(&mut self) {
        let options = SubmitOptions {
            command: Some(Command::goto_end()),
            ..SubmitOptions::default()
        };
        self.submit(None, options);
        self.revalidate();
    }

    pub fn resume_interrupt(&mut self, value: Value) {
        let options = SubmitOptions {
            command: Some(Command::resume(value)),
            ..SubmitOptions::default()
        };
        self.submit(None, options);
        self.revalidate();
    }

    /// Persist the file mapping into the thread's stored state.
    ///
    /// Does nothing before a thread exists. The exposed files only change once
    /// the next snapshot carries the write.
    pub async fn set_files(&self, files: BTreeMap<String, String>) -> SyncResult<()> {
        let Some(thread_id) = self.session.thread_id() else {
            tracing::debug!("No thread yet, skipping file update");
            return Ok(());
        };
        tracing::debug!(thread_id = %thread_id, count = files.len(), "Updating thread files");
        self.writer
            .update_state(thread_id, json!({ "files": files }))
            .await
            .map_err(|message| {
                tracing::error!(thread_id = %thread_id, error = %message, "Failed to update files");
                SyncError::StateWrite {
                    thread_id: thread_id.to_string(),
                    message,
                }
            })
    }

    /// Move to another thread, or to none. Drops everything tied to the old one
    /// and resubscribes.
    pub fn switch_session(&mut self, thread_id: Option<String>) {
        let changed = match thread_id {
            Some(thread_id) => self.session.assign(Some(thread_id)),
            None => self.session.teardown(),
        };
        if !changed {
            return;
        }
        tracing::info!(thread_id = ?self.session.thread_id(), "Switched session");
        self.conversation_events.clear();
        self.snapshot = StreamSnapshot::default();
        self.optimistic = None;
        self.connect();
    }

    // ==================== Stream callbacks ====================

    pub fn handle(&mut self, update: StreamUpdate) {
        match update {
            StreamUpdate::Values(snapshot) => {
                self.snapshot = snapshot;
                self.optimistic = None;
            }
            StreamUpdate::Custom(payload) => self.on_custom_event(payload),
            StreamUpdate::Created => {
                tracing::debug!("Stream created a run");
                self.revalidate();
            }
            StreamUpdate::Finish => {
                tracing::debug!(thread_id = ?self.session.thread_id(), "Run finished");
                self.revalidate();
            }
            StreamUpdate::Error(message) => {
                tracing::warn!(thread_id = ?self.session.thread_id(), error = %message, "Run failed");
                self.revalidate();
            }
            StreamUpdate::ThreadId(thread_id) => {
                if self.session.assign(Some(thread_id)) {
                    tracing::info!(thread_id = ?self.session.thread_id(), "Stream assigned thread");
                }
            }
        }
    }

    fn on_custom_event(&mut self, payload: Value) {
        if self.conversation_events.push(payload) {
            tracing::debug!(
                retained = self.conversation_events.len(),
                evicted = self.conversation_events.evicted(),
                "Captured conversation event"
            );
        } else {
            tracing::debug!("Ignoring custom event that is not an object");
        }
    }

    // ==================== State exposure ====================

    pub fn values(&self) -> &SessionValues {
        self.optimistic.as_ref().unwrap_or(&self.snapshot.values)
    }

    pub fn messages(&self) -> &[Message] {
        &self.values().messages
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot.is_loading
    }

    pub fn interrupt(&self) -> Option<&Interrupt> {
        self.snapshot.interrupt.as_ref()
    }

    pub fn message_metadata(&self, message: &Message) -> Option<&MessageMetadata> {
        self.snapshot.messages_metadata.get(&message.id)
    }

    /// Whether the latest AI message delegates to a subagent, i.e. the next
    /// continue should pause after tools rather than before them
    pub fn has_pending_task_call(&self) -> bool {
        self.messages()
            .iter()
            .rev()
            .find(|m| m.message_type == MessageType::Ai)
            .is_some_and(Message::has_task_tool_call)
    }

    /// Snapshot events, then events re-derived from the retained custom payloads
    pub fn state_update_events(&self) -> Vec<StateUpdateEvent> {
        aggregate_state_updates(
            &self.values().state_update_events,
            self.conversation_events.derive(),
        )
    }

    pub fn view(&self) -> ChatView {
        let values = self.values();
        ChatView {
            thread_id: self.session.thread_id().map(String::from),
            messages: values.messages.clone(),
            todos: values.todos.clone(),
            files: values.files.clone(),
            email: values.email.clone(),
            ui: values.ui.clone(),
            is_loading: self.snapshot.is_loading,
            is_thread_loading: self.snapshot.is_thread_loading,
            interrupt: self.snapshot.interrupt.clone(),
            state_update_events: self.state_update_events(),
            messages_metadata: self.snapshot.messages_metadata.clone(),
        }
    }

    // ==================== Internals ====================

    fn run_config(&self) -> RunConfig {
        RunConfig::from_assistant(self.assistant.as_ref())
    }

    fn submit(&mut self, input: Option<Value>, options: SubmitOptions) {
        if let Some(optimistic) = &options.optimistic_values {
            self.optimistic = Some(optimistic.project(self.values()));
        }
        tracing::debug!(
            thread_id = ?self.session.thread_id(),
            has_input = input.is_some(),
            checkpoint = options.checkpoint.is_some(),
            interrupt_before = ?options.interrupt_before,
            interrupt_after = ?options.interrupt_after,
            command = ?options.command,
            "Submitting run"
        );
        self.adapter.submit(input, options);
    }

    fn revalidate(&self) {
        if let Some(revalidator) = &self.revalidator {
            revalidator.revalidate();
        }
    }
}
