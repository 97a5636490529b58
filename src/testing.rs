//! Mock implementations for testing
//!
//! These mocks let the controller be exercised without a real stream.

use crate::config::SyncConfig;
use crate::controller::ConversationController;
use crate::session::{QueryThreadIdStore, SessionContext, ThreadIdStore};
use crate::stream::{HistoryRevalidator, StateWriter, StreamAdapter, StreamOptions, SubmitOptions};
use crate::types::Assistant;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Stream Adapter
// ============================================================================

/// One recorded `submit` call
#[derive(Debug, Clone)]
pub struct Submission {
    pub input: Option<Value>,
    pub options: SubmitOptions,
}

/// Stream adapter that records everything it is asked to do
#[derive(Default)]
pub struct MockStreamAdapter {
    pub submissions: Mutex<Vec<Submission>>,
    pub connections: Mutex<Vec<StreamOptions>>,
    stops: AtomicUsize,
}

impl MockStreamAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded_submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn recorded_connections(&self) -> Vec<StreamOptions> {
        self.connections.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl StreamAdapter for MockStreamAdapter {
    fn connect(&self, options: &StreamOptions) {
        self.connections.lock().unwrap().push(options.clone());
    }

    fn submit(&self, input: Option<Value>, options: SubmitOptions) {
        self.submissions
            .lock()
            .unwrap()
            .push(Submission { input, options });
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Mock State Writer
// ============================================================================

/// State writer that records writes and fails with queued errors
#[derive(Default)]
pub struct MockStateWriter {
    writes: Mutex<Vec<(String, Value)>>,
    failures: Mutex<VecDeque<String>>,
}

impl MockStateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next write with `message`
    pub fn queue_failure(&self, message: impl Into<String>) {
        self.failures.lock().unwrap().push_back(message.into());
    }

    pub fn recorded_writes(&self) -> Vec<(String, Value)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateWriter for MockStateWriter {
    async fn update_state(&self, thread_id: &str, values: Value) -> Result<(), String> {
        if let Some(message) = self.failures.lock().unwrap().pop_front() {
            return Err(message);
        }
        self.writes
            .lock()
            .unwrap()
            .push((thread_id.to_string(), values));
        Ok(())
    }
}

// ============================================================================
// Counting Revalidator
// ============================================================================

#[derive(Default)]
pub struct CountingRevalidator {
    count: AtomicUsize,
}

impl CountingRevalidator {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl HistoryRevalidator for CountingRevalidator {
    fn revalidate(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Memory Thread Id Store
// ============================================================================

/// Thread id kept only in memory
#[derive(Debug, Default)]
pub struct MemoryThreadIdStore {
    thread_id: Mutex<Option<String>>,
}

impl MemoryThreadIdStore {
    pub fn new(thread_id: Option<String>) -> Self {
        Self {
            thread_id: Mutex::new(thread_id),
        }
    }
}

impl ThreadIdStore for MemoryThreadIdStore {
    fn load(&self) -> Option<String> {
        self.thread_id.lock().unwrap().clone()
    }

    fn store(&self, thread_id: Option<&str>) {
        *self.thread_id.lock().unwrap() = thread_id.map(String::from);
    }
}

// ============================================================================
// Test Controller Builder
// ============================================================================

pub type MockController = ConversationController<Arc<MockStreamAdapter>, Arc<MockStateWriter>>;

/// Controller wired to mocks, with handles to inspect them
pub struct TestController {
    pub controller: MockController,
    pub adapter: Arc<MockStreamAdapter>,
    pub writer: Arc<MockStateWriter>,
    pub revalidator: Arc<CountingRevalidator>,
    pub store: Arc<QueryThreadIdStore>,
}

impl TestController {
    pub fn new() -> Self {
        TestControllerBuilder::new().build()
    }
}

#[derive(Default)]
pub struct TestControllerBuilder {
    config: SyncConfig,
    assistant_config: Option<Value>,
    thread_id: Option<String>,
}

impl TestControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an assistant whose config is the given JSON object
    pub fn assistant_config(mut self, config: Value) -> Self {
        self.assistant_config = Some(config);
        self
    }

    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn max_conversation_events(mut self, max: usize) -> Self {
        self.config.max_conversation_events = max;
        self
    }

    pub fn build(self) -> TestController {
        let query = self
            .thread_id
            .map(|id| format!("{}={id}", self.config.thread_param))
            .unwrap_or_default();
        let store = Arc::new(QueryThreadIdStore::new(self.config.thread_param.clone(), query));
        let session = SessionContext::init(store.clone());

        let assistant = self.assistant_config.map(|config| Assistant {
            assistant_id: "test-assistant".to_string(),
            config: config.as_object().cloned().unwrap_or_default(),
        });

        let adapter = Arc::new(MockStreamAdapter::new());
        let writer = Arc::new(MockStateWriter::new());
        let revalidator = Arc::new(CountingRevalidator::default());

        let controller = ConversationController::new(
            self.config,
            assistant,
            adapter.clone(),
            writer.clone(),
            session,
        )
        .with_revalidator(revalidator.clone());

        TestController {
            controller,
            adapter,
            writer,
            revalidator,
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_state_writer_failures_are_consumed() {
        let writer = MockStateWriter::new();
        writer.queue_failure("offline");

        assert!(writer.update_state("t", json!({})).await.is_err());
        assert!(writer.update_state("t", json!({"files": {}})).await.is_ok());
        assert_eq!(writer.recorded_writes(), vec![("t".to_string(), json!({"files": {}}))]);
    }

    #[test]
    fn test_mock_adapter_records_calls() {
        let adapter = MockStreamAdapter::new();
        adapter.connect(&StreamOptions::new("a", Some("t".into())));
        adapter.submit(None, SubmitOptions::default());
        adapter.stop();

        assert_eq!(adapter.recorded_connections()[0].thread_id.as_deref(), Some("t"));
        assert_eq!(adapter.recorded_submissions().len(), 1);
        assert_eq!(adapter.stop_count(), 1);
    }
}
