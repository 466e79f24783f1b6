//! Guard-protected specialization cache entries and lookup.

use std::fmt;
use std::sync::Arc;

use marten_vm_frame::{EvalError, LocalsMapping, SpecializedCode};

/// Identity of the compiler backend a specialization was produced for.
///
/// Entries compiled for one backend are invisible to lookups driven by a
/// different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendId(pub u64);

/// Predicate deciding whether a cached specialization is valid for the
/// current runtime state.
///
/// Implemented outside this crate; lookup treats it as infallible except for
/// host-runtime errors, which abort the whole dispatch.
pub trait Guard: Send + Sync {
    /// Evaluate the guard against a frame's local-variable snapshot.
    fn matches(&self, locals: &LocalsMapping) -> Result<bool, EvalError>;
}

/// A compilation result ready for installation: guard, specialized code, and
/// the human-readable trace label threaded through to specialized execution.
#[derive(Clone)]
pub struct GuardedCode {
    /// Validity predicate for the specialization.
    pub guard: Arc<dyn Guard>,
    /// The specialized compiled routine.
    pub code: Arc<SpecializedCode>,
    /// Trace label attached to specialized execution.
    pub trace_annotation: String,
}

impl fmt::Debug for GuardedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedCode")
            .field("code", &self.code)
            .field("trace_annotation", &self.trace_annotation)
            .finish_non_exhaustive()
    }
}

/// One installed guard/specialization pairing. Immutable once created; only
/// ever appended to a routine's entry list.
pub struct CacheEntry {
    guard: Arc<dyn Guard>,
    code: Arc<SpecializedCode>,
    trace_annotation: String,
    backend: BackendId,
}

impl CacheEntry {
    pub(crate) fn new(guarded: GuardedCode, backend: BackendId) -> Self {
        Self {
            guard: guarded.guard,
            code: guarded.code,
            trace_annotation: guarded.trace_annotation,
            backend,
        }
    }

    /// The specialized compiled routine.
    pub fn code(&self) -> &Arc<SpecializedCode> {
        &self.code
    }

    /// Trace label recorded at compilation time.
    pub fn trace_annotation(&self) -> &str {
        &self.trace_annotation
    }

    /// Backend the specialization was produced for.
    pub fn backend(&self) -> BackendId {
        self.backend
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("code", &self.code)
            .field("trace_annotation", &self.trace_annotation)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Scan `entries` in installation-recency order and return the first one
/// whose backend matches and whose guard accepts `locals`.
///
/// A `backend` of `None` (run-only or disabled callers) accepts entries from
/// any backend. A guard error propagates immediately with no further
/// scanning; `Ok(None)` is a cache miss.
pub fn lookup<'a>(
    entries: &'a [CacheEntry],
    locals: &LocalsMapping,
    backend: Option<BackendId>,
) -> Result<Option<&'a CacheEntry>, EvalError> {
    for entry in entries {
        if !backend.is_none_or(|b| b == entry.backend) {
            continue;
        }
        if entry.guard.matches(locals)? {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marten_vm_frame::{RoutineId, Value};

    struct LocalEquals {
        name: &'static str,
        expected: Value,
    }

    impl Guard for LocalEquals {
        fn matches(&self, locals: &LocalsMapping) -> Result<bool, EvalError> {
            Ok(locals.get(self.name) == Some(&self.expected))
        }
    }

    struct FailingGuard;

    impl Guard for FailingGuard {
        fn matches(&self, _locals: &LocalsMapping) -> Result<bool, EvalError> {
            Err(EvalError::internal("guard blew up"))
        }
    }

    fn entry(id: u64, guard: impl Guard + 'static, backend: BackendId) -> CacheEntry {
        CacheEntry::new(
            GuardedCode {
                guard: Arc::new(guard),
                code: Arc::new(SpecializedCode::new(id, RoutineId(1), format!("spec{id}"))),
                trace_annotation: format!("trace{id}"),
            },
            backend,
        )
    }

    fn int_locals(value: i64) -> LocalsMapping {
        let mut locals = LocalsMapping::new();
        locals.insert("x", Value::Int(value));
        locals
    }

    #[test]
    fn first_accepting_entry_in_recency_order_wins() {
        let backend = BackendId(0);
        // Both guards accept; the entry at index 0 is the newest install.
        let entries = vec![
            entry(
                2,
                LocalEquals {
                    name: "x",
                    expected: Value::Int(5),
                },
                backend,
            ),
            entry(
                1,
                LocalEquals {
                    name: "x",
                    expected: Value::Int(5),
                },
                backend,
            ),
        ];

        let hit = lookup(&entries, &int_locals(5), Some(backend))
            .expect("guard evaluation should succeed")
            .expect("a guard should accept");
        assert_eq!(hit.code().id(), 2);
    }

    #[test]
    fn entries_for_other_backends_are_skipped() {
        let entries = vec![entry(
            1,
            LocalEquals {
                name: "x",
                expected: Value::Int(5),
            },
            BackendId(7),
        )];

        let miss = lookup(&entries, &int_locals(5), Some(BackendId(8)))
            .expect("guard evaluation should succeed");
        assert!(miss.is_none());

        // No backend constraint accepts any entry.
        let hit = lookup(&entries, &int_locals(5), None).expect("guard evaluation should succeed");
        assert_eq!(hit.map(|e| e.code().id()), Some(1));
    }

    #[test]
    fn guard_error_aborts_the_scan() {
        let backend = BackendId(0);
        let entries = vec![
            entry(2, FailingGuard, backend),
            entry(
                1,
                LocalEquals {
                    name: "x",
                    expected: Value::Int(5),
                },
                backend,
            ),
        ];

        let err = lookup(&entries, &int_locals(5), Some(backend))
            .expect_err("the failing guard should abort lookup");
        assert!(err.to_string().contains("guard blew up"));
    }
}
