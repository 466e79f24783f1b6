//! Per-routine telemetry passed through to the compiler callback.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Adaptive-threshold telemetry record for one routine.
///
/// The dispatch layer tracks the call counter and otherwise passes the record
/// through untouched; the keys inside `data` belong to the compiler callback
/// (recompile counters, observed shapes, whatever it wants to remember
/// between misses).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameState {
    calls: u64,
    data: Map<String, JsonValue>,
}

impl FrameState {
    /// Fresh record with a zero call counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one interception of the routine.
    pub fn record_call(&mut self) {
        self.calls = self.calls.saturating_add(1);
    }

    /// Number of intercepted calls seen so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Read a telemetry entry.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    /// Write a telemetry entry, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.data.insert(key.into(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_counter_accumulates() {
        let mut state = FrameState::new();
        state.record_call();
        state.record_call();
        assert_eq!(state.calls(), 2);
    }

    #[test]
    fn telemetry_entries_round_trip() {
        let mut state = FrameState::new();
        assert!(state.insert("recompiles", json!(1)).is_none());
        assert_eq!(state.insert("recompiles", json!(2)), Some(json!(1)));
        assert_eq!(state.get("recompiles"), Some(&json!(2)));
    }
}
