//! # Marten VM Frame Model
//!
//! Data model for call frames and routines shared between the Marten
//! interpreter and the frame-dispatch layer.
//!
//! A [`Routine`] is the immutable per-routine code object; a [`CallFrame`] is
//! one invocation of it, carrying local/global/builtin bindings and the
//! unwind flag. [`FrameState`] is the per-routine telemetry record handed to
//! the optimizing compiler, and [`SpecializedCode`] is the handle it hands
//! back.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod frame;
pub mod routine;
pub mod state;
pub mod value;

pub use error::EvalError;
pub use frame::{CallFrame, LocalsMapping, Namespace};
pub use routine::{Routine, RoutineId, SpecializedCode};
pub use state::FrameState;
pub use value::Value;
