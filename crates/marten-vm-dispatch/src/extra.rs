//! Per-routine dispatch state and its storage slots.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use marten_vm_frame::{FrameState, RoutineId};

use crate::cache::{BackendId, CacheEntry, GuardedCode};
use crate::strategy::ExecStrategy;

/// Mutable record attached 1:1 to a routine: specialization cache, call-site
/// telemetry, and execution strategy.
///
/// Created lazily on first interception and exclusively mutated by this
/// crate. Entries are append-only and kept in installation-recency order
/// (newest first), which is also guard scan order.
#[derive(Debug, Default)]
pub struct ExtraState {
    entries: SmallVec<[CacheEntry; 4]>,
    frame_state: FrameState,
    strategy: ExecStrategy,
}

impl ExtraState {
    /// Current execution strategy for the routine.
    pub fn strategy(&self) -> ExecStrategy {
        self.strategy
    }

    pub(crate) fn set_strategy(&mut self, strategy: ExecStrategy) {
        self.strategy = strategy;
    }

    /// Install a fresh compilation at the front of the scan order.
    pub(crate) fn install(&mut self, guarded: GuardedCode, backend: BackendId) -> &CacheEntry {
        self.entries.insert(0, CacheEntry::new(guarded, backend));
        &self.entries[0]
    }

    /// Installed cache entries, newest first.
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    /// Per-routine telemetry record.
    pub fn frame_state(&self) -> &FrameState {
        &self.frame_state
    }

    /// Split borrow for the compiler callback: entry list to read, telemetry
    /// to mutate.
    pub(crate) fn compile_view(&mut self) -> (&[CacheEntry], &mut FrameState) {
        (&self.entries, &mut self.frame_state)
    }

    pub(crate) fn frame_state_mut(&mut self) -> &mut FrameState {
        &mut self.frame_state
    }
}

/// The host's per-routine storage slots, materialized as a map keyed by
/// routine identity. At most one record exists per routine.
#[derive(Debug, Default)]
pub struct ExtraSlots {
    slots: FxHashMap<RoutineId, ExtraState>,
}

impl ExtraSlots {
    /// Empty slot store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the record for a routine, if one was ever created.
    pub fn get(&self, id: RoutineId) -> Option<&ExtraState> {
        self.slots.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: RoutineId) -> Option<&mut ExtraState> {
        self.slots.get_mut(&id)
    }

    /// Lazily create the record on first interception.
    pub(crate) fn ensure(&mut self, id: RoutineId) -> &mut ExtraState {
        self.slots.entry(id).or_default()
    }

    /// Whether a record exists for the routine.
    pub fn contains(&self, id: RoutineId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of routines with dispatch state.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no routine has dispatch state yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use marten_vm_frame::{EvalError, LocalsMapping, SpecializedCode};
    use serde_json::json;

    use crate::cache::Guard;

    struct AcceptAll;

    impl Guard for AcceptAll {
        fn matches(&self, _locals: &LocalsMapping) -> Result<bool, EvalError> {
            Ok(true)
        }
    }

    fn guarded(id: u64) -> GuardedCode {
        GuardedCode {
            guard: Arc::new(AcceptAll),
            code: Arc::new(SpecializedCode::new(id, RoutineId(1), format!("spec{id}"))),
            trace_annotation: format!("trace{id}"),
        }
    }

    #[test]
    fn slots_are_created_lazily_and_at_most_once() {
        let mut slots = ExtraSlots::new();
        assert!(!slots.contains(RoutineId(1)));

        slots.ensure(RoutineId(1)).set_strategy(ExecStrategy::run_only());
        slots.ensure(RoutineId(1));

        assert_eq!(slots.len(), 1);
        // ensure() must not reset an existing record.
        assert_eq!(
            slots.get(RoutineId(1)).map(|e| e.strategy()),
            Some(ExecStrategy::run_only())
        );
    }

    #[test]
    fn installs_go_to_the_front_of_scan_order() {
        let mut extra = ExtraState::default();
        extra.install(guarded(1), BackendId(0));
        extra.install(guarded(2), BackendId(0));

        let ids: Vec<u64> = extra.entries().iter().map(|e| e.code().id()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn compile_view_exposes_entries_and_mutable_telemetry() {
        let mut extra = ExtraState::default();
        extra.install(guarded(1), BackendId(0));

        let (entries, frame_state) = extra.compile_view();
        assert_eq!(entries.len(), 1);
        frame_state.insert("seen", json!(true));

        assert_eq!(extra.frame_state().get("seen"), Some(&json!(true)));
    }
}
