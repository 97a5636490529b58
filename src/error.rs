//! Error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to update state of thread {thread_id}: {message}")]
    StateWrite { thread_id: String, message: String },
    #[error("Invalid recording at line {line}: {source}")]
    Recording {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
