//! Secondary state-update events
//!
//! Out-of-band payloads pushed alongside the main stream are accumulated in
//! arrival order and translated into [`StateUpdateEvent`]s, which are then
//! merged behind the events the snapshot already carries.
//!
//! [`StateUpdateEvent`]: crate::types::StateUpdateEvent

mod aggregate;
mod derive;

#[cfg(test)]
mod proptests;

pub use aggregate::aggregate_state_updates;
pub use derive::{
    derive_state_updates, is_truthy, ConversationEventData, ConversationEventLog,
    CONVERSATION_NODE,
};
