//! # Marten VM Dispatch
//!
//! Adaptive call-frame dispatch cache for the Marten VM.
//!
//! Every invocation of an interpreted routine is routed through
//! [`eval_frame`], which decides — without re-executing the routine's
//! bytecode when avoidable — whether a previously compiled specialization can
//! run instead, and otherwise defers to an external compiler callback and
//! records the result for future calls.
//!
//! The moving parts:
//!
//! - [`DispatchContext`] holds the active-callback register, the per-routine
//!   state slots, and counters, threaded explicitly through every call.
//! - [`ExtraState`] is the per-routine record: guard cache, telemetry, and
//!   execution strategy.
//! - [`CompilerCallback`] is the pluggable miss handler; its decisions come
//!   back as a [`CompileOutcome`].
//! - [`Host`] is the seam to the surrounding virtual machine: default and
//!   specialized execution plus frame retirement.
//!
//! This crate orchestrates *when* to look up, install, reuse, or bypass a
//! specialization. What to compile and how to guard it belong to the
//! compiler callback and guard implementations.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod callback;
pub mod context;
pub mod error;
pub mod eval_frame;
pub mod extra;
pub mod strategy;

pub use cache::{BackendId, CacheEntry, Guard, GuardedCode, lookup};
pub use callback::{CallbackState, CompileError, CompileOutcome, CompilerCallback};
pub use context::{DispatchContext, DispatchStats, is_intercept_disabled};
pub use error::DispatchError;
pub use eval_frame::{Host, eval_frame};
pub use extra::{ExtraSlots, ExtraState};
pub use strategy::{ExecStrategy, FrameAction};
