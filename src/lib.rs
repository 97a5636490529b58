//! Stream Sync - client-side synchronizer for agent conversation streams
//!
//! Keeps a live, resumable view of a multi-turn agent conversation by
//! merging snapshots from a remote stream with state updates derived from
//! out-of-band conversation events, and exposes the controls that drive the
//! conversation forward.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod replay;
pub mod session;
pub mod stream;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SyncConfig;
pub use controller::{ChatView, ConversationController};
pub use error::{SyncError, SyncResult};
pub use session::{QueryThreadIdStore, SessionContext, ThreadIdStore};
pub use stream::{
    Command, HistoryRevalidator, OptimisticValues, RunConfig, StateWriter, StreamAdapter,
    StreamOptions, StreamSnapshot, StreamUpdate, SubmitOptions,
};
pub use types::*;
