//! Interception callback states and the compiler callback protocol.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use marten_vm_frame::{CallFrame, FrameState, LocalsMapping};

use crate::cache::{BackendId, CacheEntry, GuardedCode};

/// External optimizing-compiler hook invoked on a genuine cache miss.
///
/// The hook decides whether to produce a specialization for the frame or to
/// opt the routine out of interception; the dispatch layer only interprets
/// the outcome, it never decides what to compile.
pub trait CompilerCallback: Send + Sync {
    /// Attempt to produce a specialization for `frame`.
    ///
    /// Receives the frame's locals snapshot, the routine's installed cache
    /// entries, and its telemetry record (mutable: the callback owns the keys
    /// inside it).
    fn compile(
        &self,
        frame: &CallFrame,
        locals: &LocalsMapping,
        entries: &[CacheEntry],
        state: &mut FrameState,
    ) -> Result<CompileOutcome, CompileError>;

    /// Identity of the backend this callback compiles for.
    fn backend(&self) -> BackendId;
}

/// Compiler decision for one cache miss, as a closed set of cases.
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    /// A specialization was produced; install it and run it.
    Compiled(GuardedCode),
    /// Skip this routine and everything it recursively calls, permanently.
    SkipRecursive,
    /// Compilation budget exhausted: keep serving the cache, never compile
    /// this routine or its nested calls again.
    BudgetExhausted,
    /// No specialization for this routine; nested calls stay interceptable.
    NoSpecialization,
}

/// Internal failure inside the compiler callback.
#[derive(Debug, Clone, Error)]
#[error("compiler callback failed: {0}")]
pub struct CompileError(pub String);

/// Value of the active-callback register: the process-wide "what to do on a
/// miss" handle, read and temporarily overridden per invocation.
#[derive(Clone, Default)]
pub enum CallbackState {
    /// Interception off: frames default-execute untouched.
    #[default]
    Disabled,
    /// Serve existing cache entries but never compile.
    RunOnly,
    /// Full interception through the given compiler callback.
    Compile(Arc<dyn CompilerCallback>),
}

impl CallbackState {
    /// Wrap a compiler callback.
    pub fn compile(callback: Arc<dyn CompilerCallback>) -> Self {
        Self::Compile(callback)
    }

    /// Whether this is the disabled sentinel.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Whether this is the run-only sentinel.
    pub fn is_run_only(&self) -> bool {
        matches!(self, Self::RunOnly)
    }

    /// Backend identity of the wrapped callback, if any.
    pub fn backend(&self) -> Option<BackendId> {
        match self {
            Self::Compile(callback) => Some(callback.backend()),
            Self::Disabled | Self::RunOnly => None,
        }
    }
}

/// Register save/restore decisions compare callback identity, not behavior:
/// two distinct callbacks for the same backend are different register values.
impl PartialEq for CallbackState {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Disabled, Self::Disabled) => true,
            (Self::RunOnly, Self::RunOnly) => true,
            (Self::Compile(a), Self::Compile(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for CallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::RunOnly => f.write_str("RunOnly"),
            Self::Compile(callback) => write!(f, "Compile({:?})", callback.backend()),
        }
    }
}
