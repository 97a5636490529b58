//! Session identifier handling
//!
//! The current thread id lives in an externally synchronized place (a URL
//! query parameter in a browser shell). [`SessionContext`] reads it once at
//! init and writes every reassignment back through a [`ThreadIdStore`].

use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};

/// Where the current thread id is persisted
pub trait ThreadIdStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, thread_id: Option<&str>);
}

/// Thread id held in one parameter of a URL query string (`a=1&threadId=...`).
///
/// Values are percent-decoded on read and encoded on write. Other parameters
/// are preserved, in order, when the id is rewritten.
#[derive(Debug)]
pub struct QueryThreadIdStore {
    key: String,
    query: Mutex<String>,
}

impl QueryThreadIdStore {
    pub fn new(key: impl Into<String>, query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            key: key.into(),
            query: Mutex::new(query.trim_start_matches('?').to_string()),
        }
    }

    /// Current query string, without the leading `?`
    pub fn query(&self) -> String {
        self.query
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ThreadIdStore for QueryThreadIdStore {
    fn load(&self) -> Option<String> {
        let query = self.query.lock().unwrap_or_else(PoisonError::into_inner);
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| *key == self.key)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    fn store(&self, thread_id: Option<&str>) {
        let mut query = self.query.lock().unwrap_or_else(PoisonError::into_inner);
        let kept: Vec<(Cow<'_, str>, Cow<'_, str>)> = form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| *key != self.key)
            .collect();
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(kept);
        if let Some(id) = thread_id {
            serializer.append_pair(&self.key, id);
        }
        *query = serializer.finish();
    }
}

/// The active session key, passed explicitly instead of living in a global
pub struct SessionContext {
    store: Arc<dyn ThreadIdStore>,
    thread_id: Option<String>,
}

impl SessionContext {
    /// Read the persisted thread id, if any
    pub fn init(store: Arc<dyn ThreadIdStore>) -> Self {
        let thread_id = store.load();
        Self { store, thread_id }
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Set (or clear) the thread id and persist it. Returns whether it changed.
    pub fn assign(&mut self, thread_id: Option<String>) -> bool {
        if self.thread_id == thread_id {
            return false;
        }
        self.store.store(thread_id.as_deref());
        self.thread_id = thread_id;
        true
    }

    /// Forget the current session
    pub fn teardown(&mut self) -> bool {
        self.assign(None)
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("thread_id", &self.thread_id)
            .finish_non_exhaustive()
    }
}
