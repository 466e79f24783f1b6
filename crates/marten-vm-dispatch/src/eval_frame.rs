//! Dispatch orchestrator: the interception entrypoint the host invokes in
//! place of default execution.
//!
//! Per frame, the flow is: read the routine's execution strategy, scan its
//! guard cache (with the active-callback register bracketed to `Disabled` so
//! nested work during guard evaluation cannot re-enter interception), and on
//! a genuine miss hand the frame to the compiler callback, installing
//! whatever it produces. Result and failure semantics are indistinguishable
//! from running the routine directly.

use std::sync::Arc;

use tracing::{debug, trace};

use marten_vm_frame::{CallFrame, EvalError, LocalsMapping, RoutineId, SpecializedCode, Value};

use crate::cache::{self, BackendId};
use crate::callback::{CallbackState, CompileOutcome};
use crate::context::DispatchContext;
use crate::error::DispatchError;
use crate::extra::ExtraSlots;
use crate::strategy::{ExecStrategy, FrameAction};

/// Host virtual-machine seam consumed by the orchestrator.
///
/// Both evaluation methods may re-enter [`eval_frame`] for calls made while
/// the routine runs; they receive the dispatch context for exactly that
/// purpose.
pub trait Host {
    /// Run the routine's original (uncompiled) logic.
    fn eval_default(
        &mut self,
        ctx: &mut DispatchContext,
        frame: &CallFrame,
    ) -> Result<Value, EvalError>;

    /// Run a specialized compilation in place of the original routine.
    fn eval_specialized(
        &mut self,
        ctx: &mut DispatchContext,
        frame: &CallFrame,
        code: &Arc<SpecializedCode>,
        trace_annotation: &str,
    ) -> Result<Value, EvalError>;

    /// Retire a frame whose original logic was bypassed or aborted.
    ///
    /// Called after specialized execution and on every failure exit; hosts
    /// with no frame bookkeeping can keep the default no-op.
    fn retire_frame(&mut self, frame: &CallFrame) {
        let _ = frame;
    }
}

/// Dispatch one invocation.
///
/// Produces the invocation's result exactly as if the routine had been run
/// directly, substituting a cached or freshly compiled specialization when
/// one is legal for the current runtime state.
///
/// A routine that has never been intercepted and arrives while the register
/// holds a sentinel (`Disabled` or `RunOnly`) default-executes without
/// creating any per-routine state. Calls taking that shortcut are invisible
/// to telemetry; the counter starts with the first fully intercepted call.
/// This is a deliberate choice, not an accident: such routines have no cache
/// to serve and nothing profitable to count.
pub fn eval_frame<H: Host>(
    host: &mut H,
    ctx: &mut DispatchContext,
    frame: &CallFrame,
) -> Result<Value, DispatchError> {
    trace!(routine = %frame.routine(), "begin");
    ctx.stats.frames += 1;

    if frame.is_unwinding() {
        // Unwinding frames go straight to default execution so exception
        // propagation and unwind handlers behave exactly as uninstrumented.
        // There is nothing profitable to specialize on the way out.
        trace!(routine = %frame.routine(), "unwinding, default eval");
        ctx.stats.unwinds += 1;
        ctx.stats.default_evals += 1;
        return host.eval_default(ctx, frame).map_err(DispatchError::from);
    }

    let caller_callback = ctx.register.clone();
    let mut recursive_callback = caller_callback.clone();
    let routine_id = frame.routine_id();

    // Never-seen routine while interception is already off: pure
    // pass-through, no state created.
    if !matches!(caller_callback, CallbackState::Compile(_)) && !ctx.slots.contains(routine_id) {
        trace!(routine = %frame.routine(), "no cache and interception off, default eval");
        return eval_default_path(host, ctx, frame, &recursive_callback, &caller_callback);
    }

    let strategy = {
        let extra = ctx.slots.ensure(routine_id);
        extra.frame_state_mut().record_call();
        extra.strategy()
    };

    if strategy.cur != FrameAction::Default {
        match strategy.recursive {
            FrameAction::Skip => recursive_callback = CallbackState::Disabled,
            FrameAction::RunOnly => recursive_callback = CallbackState::RunOnly,
            FrameAction::Default => {}
        }
    }

    if strategy.cur == FrameAction::Skip {
        debug!(routine = %frame.routine(), "skip");
        ctx.stats.skips += 1;
        return eval_default_path(host, ctx, frame, &recursive_callback, &caller_callback);
    }

    // Guard evaluation is strictly bracketed by the disabled register value:
    // nested invocations it triggers must not re-enter this machinery. The
    // caller's value is put back before either execution path runs.
    let backend = caller_callback.backend();
    ctx.register = CallbackState::Disabled;
    let looked_up = lookup_in_slots(&ctx.slots, routine_id, frame.locals(), backend);
    ctx.register = caller_callback.clone();

    let hit = match looked_up {
        Err(err) => {
            // Guard evaluation raised: the host error is authoritative.
            host.retire_frame(frame);
            return Err(err.into());
        }
        Ok(hit) => hit,
    };

    if let Some((code, trace_annotation)) = hit {
        debug!(routine = %frame.routine(), %trace_annotation, "cache hit");
        ctx.stats.cache_hits += 1;
        return eval_specialized_path(
            host,
            ctx,
            frame,
            &code,
            &trace_annotation,
            &recursive_callback,
            &caller_callback,
        );
    }

    debug!(routine = %frame.routine(), "cache miss");
    ctx.stats.cache_misses += 1;

    if ctx.skip_guard_eval_unsafe {
        host.retire_frame(frame);
        return Err(DispatchError::SkipGuardEvalStance {
            routine: routine_id,
        });
    }

    let run_only = strategy.cur == FrameAction::RunOnly || caller_callback.is_run_only();
    if run_only {
        debug!(routine = %frame.routine(), "run-only, default eval on miss");
        return eval_default_path(host, ctx, frame, &recursive_callback, &caller_callback);
    }

    let CallbackState::Compile(compiler) = &caller_callback else {
        // Disabled register with existing state and an empty or stale cache.
        return eval_default_path(host, ctx, frame, &recursive_callback, &caller_callback);
    };
    let compiler = Arc::clone(compiler);

    // The compiler's own internal calls must not be mistaken for user-level
    // recursion: the register stays disabled for the callback's duration.
    ctx.stats.compiles += 1;
    ctx.register = CallbackState::Disabled;
    let outcome = {
        let Some(extra) = ctx.slots.get_mut(routine_id) else {
            return Err(EvalError::internal("dispatch state vanished during miss").into());
        };
        let (entries, frame_state) = extra.compile_view();
        compiler.compile(frame, frame.locals(), entries, frame_state)
    };

    let outcome = match outcome {
        Err(err) => {
            // The register deliberately stays disabled here: a compiler that
            // just failed is not handed further frames on this path, even if
            // the caller catches the error. Other routines' caches remain
            // usable through a freshly installed callback.
            debug!(routine = %frame.routine(), error = %err, "compiler callback failed");
            ctx.stats.compile_errors += 1;
            host.retire_frame(frame);
            return Err(err.into());
        }
        Ok(outcome) => {
            ctx.register = caller_callback.clone();
            outcome
        }
    };

    match outcome {
        CompileOutcome::SkipRecursive => {
            debug!(routine = %frame.routine(), "skip recursive");
            set_strategy(&mut ctx.slots, routine_id, ExecStrategy::skip_recursive());
            // Apply to the in-progress invocation too, unless an enclosing
            // strategy already pinned a recursive action.
            if strategy.recursive == FrameAction::Default {
                recursive_callback = CallbackState::Disabled;
            }
            eval_default_path(host, ctx, frame, &recursive_callback, &caller_callback)
        }
        CompileOutcome::BudgetExhausted => {
            debug!(routine = %frame.routine(), "compilation budget exhausted");
            set_strategy(&mut ctx.slots, routine_id, ExecStrategy::run_only());
            if strategy.recursive == FrameAction::Default {
                recursive_callback = CallbackState::RunOnly;
            }
            eval_default_path(host, ctx, frame, &recursive_callback, &caller_callback)
        }
        CompileOutcome::Compiled(guarded) => {
            let (code, trace_annotation) = {
                let Some(extra) = ctx.slots.get_mut(routine_id) else {
                    return Err(EvalError::internal("dispatch state vanished during install").into());
                };
                let entry = extra.install(guarded, compiler.backend());
                (Arc::clone(entry.code()), entry.trace_annotation().to_owned())
            };
            debug!(routine = %frame.routine(), %trace_annotation, "installed new cache entry");
            eval_specialized_path(
                host,
                ctx,
                frame,
                &code,
                &trace_annotation,
                &recursive_callback,
                &caller_callback,
            )
        }
        CompileOutcome::NoSpecialization => {
            debug!(routine = %frame.routine(), "no specialization, skip current");
            set_strategy(&mut ctx.slots, routine_id, ExecStrategy::skip_current());
            eval_default_path(host, ctx, frame, &recursive_callback, &caller_callback)
        }
    }
}

fn lookup_in_slots(
    slots: &ExtraSlots,
    routine_id: RoutineId,
    locals: &LocalsMapping,
    backend: Option<BackendId>,
) -> Result<Option<(Arc<SpecializedCode>, String)>, EvalError> {
    let Some(extra) = slots.get(routine_id) else {
        return Ok(None);
    };
    let hit = cache::lookup(extra.entries(), locals, backend)?;
    Ok(hit.map(|entry| (Arc::clone(entry.code()), entry.trace_annotation().to_owned())))
}

fn set_strategy(slots: &mut ExtraSlots, routine_id: RoutineId, strategy: ExecStrategy) {
    if let Some(extra) = slots.get_mut(routine_id) {
        extra.set_strategy(strategy);
    }
}

/// Run the routine's original logic under the recursive callback, restoring
/// the caller's register value afterwards.
///
/// The restore is skipped when caller and recursive values are identical:
/// the routine itself may have installed a new callback through the
/// register, and re-writing an identical value would clobber that.
fn eval_default_path<H: Host>(
    host: &mut H,
    ctx: &mut DispatchContext,
    frame: &CallFrame,
    recursive: &CallbackState,
    caller: &CallbackState,
) -> Result<Value, DispatchError> {
    ctx.stats.default_evals += 1;
    ctx.register = recursive.clone();
    let result = host.eval_default(ctx, frame);
    if caller != recursive {
        ctx.register = caller.clone();
    }
    result.map_err(DispatchError::from)
}

/// Run a specialized compilation with the same register discipline as the
/// default path, then retire the bypassed original frame.
fn eval_specialized_path<H: Host>(
    host: &mut H,
    ctx: &mut DispatchContext,
    frame: &CallFrame,
    code: &Arc<SpecializedCode>,
    trace_annotation: &str,
    recursive: &CallbackState,
    caller: &CallbackState,
) -> Result<Value, DispatchError> {
    ctx.stats.specialized_evals += 1;
    ctx.register = recursive.clone();
    let result = host.eval_specialized(ctx, frame, code, trace_annotation);
    if caller != recursive {
        ctx.register = caller.clone();
    }
    host.retire_frame(frame);
    result.map_err(DispatchError::from)
}
