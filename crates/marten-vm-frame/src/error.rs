//! Host-runtime errors.

use thiserror::Error;

use crate::value::Value;

/// Failure raised by guest execution or guard evaluation.
///
/// These are authoritative: the dispatch layer propagates them untouched,
/// with no retry and no strategy mutation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A guest exception propagating out of a routine.
    #[error("uncaught exception: {message}")]
    Thrown {
        /// The thrown value.
        value: Value,
        /// String form of the thrown value.
        message: String,
    },

    /// Host invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EvalError {
    /// Wrap a thrown guest value.
    pub fn thrown(value: Value) -> Self {
        let message = value.to_string();
        Self::Thrown { value, message }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
