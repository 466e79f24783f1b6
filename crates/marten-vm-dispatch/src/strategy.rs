//! Per-routine execution strategy.
//!
//! Governs whether a routine is eligible for interception at all, both for
//! its own invocations and for the nested calls made while it runs. `Skip`
//! and `RunOnly` are terminal inside this layer: only external cache
//! invalidation ever resets a routine back to `Default`.

/// Action applied to a frame when dispatch sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameAction {
    /// Full interception: guard lookup, and compile on a miss.
    #[default]
    Default,
    /// Never intercept; default-execute immediately, no lookup.
    Skip,
    /// Serve the cache but never invoke the compiler.
    RunOnly,
}

/// `(current, recursive)` action pair for one routine.
///
/// `cur` governs the routine's own invocations; `recursive` is propagated as
/// the interception callback for calls nested under this routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecStrategy {
    /// Action for this routine's own invocations.
    pub cur: FrameAction,
    /// Action propagated to invocations nested under this routine.
    pub recursive: FrameAction,
}

impl ExecStrategy {
    /// Skip this routine and everything it recursively calls.
    pub const fn skip_recursive() -> Self {
        Self {
            cur: FrameAction::Skip,
            recursive: FrameAction::Skip,
        }
    }

    /// Compilation budget exhausted: cache-only for this routine and its
    /// nested calls.
    pub const fn run_only() -> Self {
        Self {
            cur: FrameAction::RunOnly,
            recursive: FrameAction::RunOnly,
        }
    }

    /// This routine opts out, nested calls keep default behavior.
    pub const fn skip_current() -> Self {
        Self {
            cur: FrameAction::Skip,
            recursive: FrameAction::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routines_start_fully_interceptable() {
        let strategy = ExecStrategy::default();
        assert_eq!(strategy.cur, FrameAction::Default);
        assert_eq!(strategy.recursive, FrameAction::Default);
    }

    #[test]
    fn terminal_strategies_pair_current_and_recursive_actions() {
        assert_eq!(
            ExecStrategy::skip_recursive(),
            ExecStrategy {
                cur: FrameAction::Skip,
                recursive: FrameAction::Skip
            }
        );
        assert_eq!(
            ExecStrategy::run_only(),
            ExecStrategy {
                cur: FrameAction::RunOnly,
                recursive: FrameAction::RunOnly
            }
        );
        assert_eq!(
            ExecStrategy::skip_current(),
            ExecStrategy {
                cur: FrameAction::Skip,
                recursive: FrameAction::Default
            }
        );
    }
}
