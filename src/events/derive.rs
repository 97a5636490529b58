//! Derivation of state updates from out-of-band conversation events

use crate::types::StateUpdateEvent;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Origin tag of every locally derived event
pub const CONVERSATION_NODE: &str = "conversation";

/// Conversation-level signals pushed out-of-band by the backing process.
///
/// Every field is kept as raw JSON: the payload is untyped on the wire and
/// each field has its own recognition rule (strict `true`, non-empty string,
/// or plain truthiness).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConversationEventData {
    #[serde(default)]
    pub scale_human: Value,
    #[serde(default)]
    pub request_saved: Value,
    #[serde(default)]
    pub show_menu: Value,
    #[serde(default)]
    pub conversation_state: Value,
    #[serde(default)]
    pub sensitive_case_type: Value,
    #[serde(default)]
    pub sensitive_case_message: Value,
    #[serde(default)]
    pub sensitive_case_summary: Value,
}

impl ConversationEventData {
    /// Validate a raw custom-event payload. Anything but a JSON object is rejected.
    pub fn from_payload(payload: Value) -> Option<Self> {
        if !payload.is_object() {
            return None;
        }
        serde_json::from_value(payload).ok()
    }

    /// Translate into a state update, or `None` when no field carries a signal
    pub fn to_state_update(&self) -> Option<StateUpdateEvent> {
        let mut updated_fields = Vec::new();
        let mut state = Map::new();
        let mut record = |field: &str, value: &Value| {
            updated_fields.push(field.to_string());
            state.insert(field.to_string(), value.clone());
        };

        for (field, value) in [
            ("scale_human", &self.scale_human),
            ("request_saved", &self.request_saved),
            ("show_menu", &self.show_menu),
        ] {
            if *value == Value::Bool(true) {
                record(field, value);
            }
        }

        if is_truthy(&self.conversation_state) {
            record("conversation_state", &self.conversation_state);
        }

        // message and summary only count alongside a case type
        if is_truthy(&self.sensitive_case_type) {
            record("sensitive_case_type", &self.sensitive_case_type);
            if is_truthy(&self.sensitive_case_message) {
                record("sensitive_case_message", &self.sensitive_case_message);
            }
            if is_truthy(&self.sensitive_case_summary) {
                record("sensitive_case_summary", &self.sensitive_case_summary);
            }
        }

        if updated_fields.is_empty() {
            return None;
        }
        Some(StateUpdateEvent::new(
            CONVERSATION_NODE,
            updated_fields,
            Some(state),
        ))
    }
}

/// Derive one state update per meaningful item, preserving arrival order.
///
/// Pure over its input: ids and timestamps are fresh on every call, the
/// fields and values are not.
pub fn derive_state_updates<'a, I>(items: I) -> Vec<StateUpdateEvent>
where
    I: IntoIterator<Item = &'a ConversationEventData>,
{
    items
        .into_iter()
        .filter_map(ConversationEventData::to_state_update)
        .collect()
}

/// JSON truthiness: null, `false`, zero, NaN and `""` are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Arrival-ordered accumulation of conversation events for one session.
///
/// Holds at most `capacity` items, evicting the oldest first; a capacity of
/// zero keeps everything.
#[derive(Debug, Clone)]
pub struct ConversationEventLog {
    items: VecDeque<ConversationEventData>,
    capacity: usize,
    evicted: u64,
}

impl ConversationEventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
            evicted: 0,
        }
    }

    /// Accept a raw payload. Returns false when it was not a structured mapping.
    pub fn push(&mut self, payload: Value) -> bool {
        let Some(data) = ConversationEventData::from_payload(payload) else {
            return false;
        };
        if self.capacity > 0 && self.items.len() == self.capacity {
            self.items.pop_front();
            self.evicted += 1;
        }
        self.items.push_back(data);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.evicted = 0;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items dropped to honor the capacity since the last clear
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn derive(&self) -> Vec<StateUpdateEvent> {
        derive_state_updates(&self.items)
    }
}
