//! Call frames and local-variable snapshots.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::routine::{Routine, RoutineId};
use crate::value::Value;

/// An opaque namespace dictionary (globals or builtins).
pub type Namespace = FxHashMap<String, Value>;

/// Snapshot of a frame's local-variable bindings at dispatch time.
///
/// Guards evaluate against this snapshot; the compiler callback receives it
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct LocalsMapping {
    bindings: FxHashMap<String, Value>,
}

impl LocalsMapping {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a local variable.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Look up a binding by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the frame has no locals.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl FromIterator<(String, Value)> for LocalsMapping {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

/// One invocation's execution context.
///
/// Owned by the host for the invocation's duration; the dispatch layer
/// borrows it and never outlives it. `unwinding` marks a frame that is
/// propagating an exception rather than executing normally.
#[derive(Debug, Clone)]
pub struct CallFrame {
    routine: Arc<Routine>,
    locals: LocalsMapping,
    globals: Arc<Namespace>,
    builtins: Arc<Namespace>,
    unwinding: bool,
}

impl CallFrame {
    /// Create a frame for an invocation of `routine`.
    pub fn new(
        routine: Arc<Routine>,
        locals: LocalsMapping,
        globals: Arc<Namespace>,
        builtins: Arc<Namespace>,
    ) -> Self {
        Self {
            routine,
            locals,
            globals,
            builtins,
            unwinding: false,
        }
    }

    /// Mark this frame as unwinding due to a propagating exception.
    pub fn mark_unwinding(mut self) -> Self {
        self.unwinding = true;
        self
    }

    /// The routine being invoked.
    pub fn routine(&self) -> &Arc<Routine> {
        &self.routine
    }

    /// Identity of the routine being invoked.
    pub fn routine_id(&self) -> RoutineId {
        self.routine.id()
    }

    /// The frame's local-variable snapshot.
    pub fn locals(&self) -> &LocalsMapping {
        &self.locals
    }

    /// The enclosing global namespace.
    pub fn globals(&self) -> &Namespace {
        &self.globals
    }

    /// The builtin namespace.
    pub fn builtins(&self) -> &Namespace {
        &self.builtins
    }

    /// Whether this invocation is unwinding rather than executing normally.
    pub fn is_unwinding(&self) -> bool {
        self.unwinding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> CallFrame {
        let routine = Arc::new(Routine::new(RoutineId(1), "f", "test.mt", 1));
        let mut locals = LocalsMapping::new();
        locals.insert("x", Value::Int(3));
        CallFrame::new(
            routine,
            locals,
            Arc::new(Namespace::default()),
            Arc::new(Namespace::default()),
        )
    }

    #[test]
    fn frames_start_out_not_unwinding() {
        let frame = test_frame();
        assert!(!frame.is_unwinding());
        assert!(frame.mark_unwinding().is_unwinding());
    }

    #[test]
    fn locals_snapshot_is_readable_by_name() {
        let frame = test_frame();
        assert_eq!(frame.locals().get("x"), Some(&Value::Int(3)));
        assert_eq!(frame.locals().get("y"), None);
    }
}
