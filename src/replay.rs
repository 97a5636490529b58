//! Replay of recorded stream sessions
//!
//! A recording is JSON lines. Each line is either a stream update
//! (`{"event": "custom", "data": {...}}`) or a controller action
//! (`{"action": "send_message", "content": "hi"}`). Blank lines are skipped.

use crate::controller::ConversationController;
use crate::error::{SyncError, SyncResult};
use crate::stream::{StateWriter, StreamAdapter, StreamOptions, StreamUpdate, SubmitOptions};
use crate::types::{Checkpoint, Message};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::BufRead;

/// Something the caller did during the recorded session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControllerAction {
    SendMessage {
        content: String,
    },
    RunSingleStep {
        #[serde(default)]
        messages: Vec<Message>,
        #[serde(default)]
        checkpoint: Option<Checkpoint>,
        #[serde(default)]
        is_rerunning_subagent: bool,
        #[serde(default)]
        optimistic_messages: Option<Vec<Message>>,
    },
    /// Without an explicit flag, the latest AI message decides
    ContinueStream {
        #[serde(default)]
        has_task_tool_call: Option<bool>,
    },
    StopStream,
    MarkResolved,
    ResumeInterrupt {
        #[serde(default)]
        value: Value,
    },
    SetFiles {
        files: BTreeMap<String, String>,
    },
    SwitchSession {
        #[serde(default)]
        thread_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReplayStep {
    Update(StreamUpdate),
    Action(ControllerAction),
}

/// Parse a recording, reporting the 1-based line of the first bad entry
pub fn parse_recording(reader: impl BufRead) -> SyncResult<Vec<ReplayStep>> {
    let mut steps = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let step = serde_json::from_str(&line).map_err(|source| SyncError::Recording {
            line: index + 1,
            source,
        })?;
        steps.push(step);
    }
    Ok(steps)
}

/// Feed every step to the controller, in order
pub async fn replay<A, W>(
    controller: &mut ConversationController<A, W>,
    steps: Vec<ReplayStep>,
) -> SyncResult<()>
where
    A: StreamAdapter,
    W: StateWriter,
{
    for step in steps {
        match step {
            ReplayStep::Update(update) => controller.handle(update),
            ReplayStep::Action(action) => apply_action(controller, action).await?,
        }
    }
    Ok(())
}

async fn apply_action<A, W>(
    controller: &mut ConversationController<A, W>,
    action: ControllerAction,
) -> SyncResult<()>
where
    A: StreamAdapter,
    W: StateWriter,
{
    match action {
        ControllerAction::SendMessage { content } => {
            controller.send_message(content);
        }
        ControllerAction::RunSingleStep {
            messages,
            checkpoint,
            is_rerunning_subagent,
            optimistic_messages,
        } => controller.run_single_step(
            messages,
            checkpoint,
            is_rerunning_subagent,
            optimistic_messages,
        ),
        ControllerAction::ContinueStream { has_task_tool_call } => {
            let has_task_tool_call =
                has_task_tool_call.unwrap_or_else(|| controller.has_pending_task_call());
            controller.continue_stream(has_task_tool_call);
        }
        ControllerAction::StopStream => controller.stop_stream(),
        ControllerAction::MarkResolved => controller.mark_current_thread_as_resolved(),
        ControllerAction::ResumeInterrupt { value } => controller.resume_interrupt(value),
        ControllerAction::SetFiles { files } => controller.set_files(files).await?,
        ControllerAction::SwitchSession { thread_id } => controller.switch_session(thread_id),
    }
    Ok(())
}

/// Adapter that only logs what it is asked to do
#[derive(Debug, Default)]
pub struct LoggingAdapter;

impl StreamAdapter for LoggingAdapter {
    fn connect(&self, options: &StreamOptions) {
        tracing::info!(
            assistant_id = %options.assistant_id,
            thread_id = ?options.thread_id,
            "connect"
        );
    }

    fn submit(&self, input: Option<Value>, options: SubmitOptions) {
        tracing::info!(
            input = ?input,
            checkpoint = ?options.checkpoint,
            interrupt_before = ?options.interrupt_before,
            interrupt_after = ?options.interrupt_after,
            command = ?options.command,
            "submit"
        );
    }

    fn stop(&self) {
        tracing::info!("stop");
    }
}

/// State writer that only logs the values it would persist
#[derive(Debug, Default)]
pub struct LoggingStateWriter;

#[async_trait]
impl StateWriter for LoggingStateWriter {
    async fn update_state(&self, thread_id: &str, values: Value) -> Result<(), String> {
        tracing::info!(thread_id = %thread_id, values = %values, "update_state");
        Ok(())
    }
}
