//! Runtime configuration

use std::str::FromStr;

pub const DEFAULT_RECURSION_LIMIT: u32 = 100;
pub const DEFAULT_MAX_CONVERSATION_EVENTS: usize = 500;
pub const DEFAULT_THREAD_PARAM: &str = "threadId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Assistant to connect to when the application supplies none
    pub assistant_id: Option<String>,
    /// Step ceiling for sends and continues
    pub recursion_limit: u32,
    /// Retained out-of-band payloads per session (0 keeps all)
    pub max_conversation_events: usize,
    /// Query parameter holding the thread id
    pub thread_param: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            assistant_id: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            max_conversation_events: DEFAULT_MAX_CONVERSATION_EVENTS,
            thread_param: DEFAULT_THREAD_PARAM.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unparseable numbers fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            assistant_id: lookup("STREAM_SYNC_ASSISTANT_ID").filter(|id| !id.is_empty()),
            recursion_limit: parse_var(
                &lookup,
                "STREAM_SYNC_RECURSION_LIMIT",
                defaults.recursion_limit,
            ),
            max_conversation_events: parse_var(
                &lookup,
                "STREAM_SYNC_MAX_CONVERSATION_EVENTS",
                defaults.max_conversation_events,
            ),
            thread_param: lookup("STREAM_SYNC_THREAD_PARAM")
                .filter(|param| !param.is_empty())
                .unwrap_or(defaults.thread_param),
        }
    }
}

fn parse_var<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    let Some(raw) = lookup(name) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(var = name, value = %raw, "Ignoring unparseable config value");
        default
    })
}
