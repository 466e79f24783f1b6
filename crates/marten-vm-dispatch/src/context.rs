//! Dispatch context: the active-callback register, per-routine slots, the
//! skip-guard-eval stance, and counters.

use std::sync::OnceLock;

use crate::callback::CallbackState;
use crate::extra::ExtraSlots;

static INTERCEPT_DISABLED: OnceLock<bool> = OnceLock::new();

fn parse_env_truthy(value: &str) -> bool {
    !matches!(value.trim(), "" | "0")
        && !value.trim().eq_ignore_ascii_case("false")
        && !value.trim().eq_ignore_ascii_case("off")
        && !value.trim().eq_ignore_ascii_case("no")
}

/// Check whether interception is disabled process-wide.
///
/// Set `MARTEN_DISABLE_INTERCEPT=1` to make [`DispatchContext::install_callback`]
/// a no-op; every frame then default-executes.
pub fn is_intercept_disabled() -> bool {
    *INTERCEPT_DISABLED.get_or_init(|| {
        std::env::var("MARTEN_DISABLE_INTERCEPT")
            .ok()
            .is_some_and(|v| parse_env_truthy(&v))
    })
}

/// Snapshot of dispatch counters for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchStats {
    /// Frames routed through dispatch.
    pub frames: u64,
    /// Frames that were unwinding and bypassed interception.
    pub unwinds: u64,
    /// Guard lookups that matched an installed entry.
    pub cache_hits: u64,
    /// Guard lookups that matched nothing.
    pub cache_misses: u64,
    /// Compiler callback invocations.
    pub compiles: u64,
    /// Compiler callback internal failures.
    pub compile_errors: u64,
    /// Frames bypassed outright by a Skip strategy, before any lookup.
    pub skips: u64,
    /// Frames run through default execution.
    pub default_evals: u64,
    /// Frames run through a specialized compilation.
    pub specialized_evals: u64,
}

/// Execution-context-scoped dispatch state.
///
/// The active-callback register has get/set semantics with a strict
/// save/restore lifecycle around every dispatched frame. It lives here,
/// threaded explicitly through each call, rather than in a bare global; the
/// host hands the context to every nested evaluation so re-entrant dispatch
/// observes the override its enclosing frame installed.
#[derive(Debug, Default)]
pub struct DispatchContext {
    pub(crate) register: CallbackState,
    pub(crate) slots: ExtraSlots,
    pub(crate) skip_guard_eval_unsafe: bool,
    pub(crate) stats: DispatchStats,
}

impl DispatchContext {
    /// Fresh context with interception disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the interception callback for this context.
    ///
    /// No-op when `MARTEN_DISABLE_INTERCEPT` is set.
    pub fn install_callback(&mut self, callback: CallbackState) {
        if is_intercept_disabled() {
            return;
        }
        self.register = callback;
    }

    /// Current value of the active-callback register.
    pub fn active(&self) -> &CallbackState {
        &self.register
    }

    /// Overwrite the register. Callers own the save/restore discipline.
    pub fn set_active(&mut self, callback: CallbackState) {
        self.register = callback;
    }

    /// Declare that the caches are warm and no further misses will occur.
    ///
    /// While set, a cache miss is a contract violation and dispatch fails
    /// with a diagnostic instead of compiling.
    pub fn set_skip_guard_eval_unsafe(&mut self, on: bool) {
        self.skip_guard_eval_unsafe = on;
    }

    /// Whether the skip-guard-eval stance is active.
    pub fn skip_guard_eval_unsafe(&self) -> bool {
        self.skip_guard_eval_unsafe
    }

    /// Per-routine dispatch state store.
    pub fn slots(&self) -> &ExtraSlots {
        &self.slots
    }

    /// Snapshot dispatch counters.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_values_parse_like_boolean_flags() {
        assert!(parse_env_truthy("1"));
        assert!(parse_env_truthy("yes"));
        assert!(!parse_env_truthy("0"));
        assert!(!parse_env_truthy("false"));
        assert!(!parse_env_truthy("OFF"));
        assert!(!parse_env_truthy("  "));
    }

    #[test]
    fn fresh_contexts_start_disabled_and_empty() {
        let ctx = DispatchContext::new();
        assert!(ctx.active().is_disabled());
        assert!(ctx.slots().is_empty());
        assert!(!ctx.skip_guard_eval_unsafe());
        assert_eq!(ctx.stats().frames, 0);
    }
}
