//! Merge of snapshot and derived state updates

use crate::types::StateUpdateEvent;

/// Snapshot events first, in snapshot order, then derived events in
/// derivation order. No deduplication: identity is the event id alone.
pub fn aggregate_state_updates(
    authoritative: &[StateUpdateEvent],
    derived: Vec<StateUpdateEvent>,
) -> Vec<StateUpdateEvent> {
    let mut all = Vec::with_capacity(authoritative.len() + derived.len());
    all.extend_from_slice(authoritative);
    all.extend(derived);
    all
}
