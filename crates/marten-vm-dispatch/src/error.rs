//! Dispatch failure taxonomy.

use thiserror::Error;

use marten_vm_frame::{EvalError, RoutineId};

use crate::callback::CompileError;

/// Terminal failures for one dispatched invocation.
///
/// No case is retried: callers must re-invoke the routine to try again.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Host-runtime failure from guard evaluation or execution, propagated
    /// untouched.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// The compiler callback failed internally.
    #[error(transparent)]
    Compiler(#[from] CompileError),

    /// A cache miss occurred while the caller had declared the caches warm.
    #[error(
        "recompilation triggered for {routine} with the skip_guard_eval_unsafe stance active; \
         warm up with enough inputs to guarantee no further recompilations before setting the stance"
    )]
    SkipGuardEvalStance {
        /// The routine that missed.
        routine: RoutineId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_errors_pass_through_their_message() {
        let err = DispatchError::from(EvalError::internal("stack gone"));
        assert_eq!(err.to_string(), "internal error: stack gone");
    }

    #[test]
    fn stance_violation_names_the_routine() {
        let err = DispatchError::SkipGuardEvalStance {
            routine: RoutineId(4),
        };
        assert!(err.to_string().contains("routine#4"));
    }
}
