//! Property-based tests for event derivation and aggregation

use super::*;
use crate::types::StateUpdateEvent;
use proptest::prelude::*;
use serde_json::{json, Value};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-3i64..3).prop_map(|n| json!(n)),
        "[a-z]{0,6}".prop_map(Value::String),
        Just(json!({"nested": true})),
    ]
}

/// Payload object with each known field either absent or set to an arbitrary value
fn arb_payload() -> impl Strategy<Value = Value> {
    let fields = [
        "scale_human",
        "request_saved",
        "show_menu",
        "conversation_state",
        "sensitive_case_type",
        "sensitive_case_message",
        "sensitive_case_summary",
    ];
    proptest::collection::vec(proptest::option::of(arb_field_value()), fields.len()).prop_map(
        move |values| {
            let mut map = serde_json::Map::new();
            for (field, value) in fields.iter().zip(values) {
                if let Some(value) = value {
                    map.insert((*field).to_string(), value);
                }
            }
            Value::Object(map)
        },
    )
}

fn arb_items() -> impl Strategy<Value = Vec<ConversationEventData>> {
    proptest::collection::vec(arb_payload(), 0..12).prop_map(|payloads| {
        payloads
            .into_iter()
            .filter_map(ConversationEventData::from_payload)
            .collect()
    })
}

fn content(events: &[StateUpdateEvent]) -> Vec<(Vec<String>, Option<serde_json::Map<String, Value>>)> {
    events
        .iter()
        .map(|e| (e.updated_fields.clone(), e.state.clone()))
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_scale_human_only_on_strict_true(payload in arb_payload()) {
        let strict_true = payload.get("scale_human") == Some(&Value::Bool(true));
        let data = ConversationEventData::from_payload(payload).unwrap();
        let events = derive_state_updates([&data]);

        let hits: Vec<_> = events
            .iter()
            .filter(|e| e.updated_fields.iter().any(|f| f == "scale_human"))
            .collect();
        if strict_true {
            prop_assert_eq!(hits.len(), 1);
            let state = hits[0].state.as_ref().unwrap();
            prop_assert_eq!(&state["scale_human"], &Value::Bool(true));
        } else {
            prop_assert!(hits.is_empty());
        }
    }

    #[test]
    fn prop_sensitive_sub_fields_gated_by_type(payload in arb_payload()) {
        let type_truthy = payload
            .get("sensitive_case_type")
            .is_some_and(is_truthy);
        let data = ConversationEventData::from_payload(payload).unwrap();

        for event in derive_state_updates([&data]) {
            let has_sub = event.updated_fields.iter().any(|f| {
                f == "sensitive_case_message" || f == "sensitive_case_summary"
            });
            if has_sub {
                prop_assert!(type_truthy);
            }
        }
    }

    #[test]
    fn prop_derived_events_are_never_empty(items in arb_items()) {
        for event in derive_state_updates(&items) {
            prop_assert!(!event.updated_fields.is_empty());
            prop_assert_eq!(event.node.as_str(), CONVERSATION_NODE);
            let state = event.state.as_ref().unwrap();
            prop_assert_eq!(state.len(), event.updated_fields.len());
        }
    }

    #[test]
    fn prop_derivation_is_idempotent(items in arb_items()) {
        let first = derive_state_updates(&items);
        let second = derive_state_updates(&items);
        prop_assert_eq!(content(&first), content(&second));
    }

    #[test]
    fn prop_aggregation_keeps_groups_in_order(items in arb_items(), snapshot_len in 0usize..5) {
        let snapshot: Vec<StateUpdateEvent> = (0..snapshot_len)
            .map(|i| StateUpdateEvent::new(format!("node-{i}"), vec!["todos".into()], None))
            .collect();
        let derived = derive_state_updates(&items);
        let derived_ids: Vec<String> = derived.iter().map(|e| e.id.clone()).collect();

        let all = aggregate_state_updates(&snapshot, derived);
        let (head, tail) = all.split_at(snapshot.len());
        prop_assert_eq!(head, snapshot.as_slice());
        let tail_ids: Vec<String> = tail.iter().map(|e| e.id.clone()).collect();
        prop_assert_eq!(tail_ids, derived_ids);
    }
}
