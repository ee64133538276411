use crate::context::Context;
use crate::dispatch::{dispatch, dispatch_to};
use crate::envelope::Invoke;
use crate::liveness::Liveness;
use crate::promise::{CallError, Future};
use std::sync::Arc;

/// Run `fun(args...)` on the thread owning `target` and block until
/// it completes
///
/// Same arguments as [`dispatch`].  If the calling thread owns
/// `target`, the call runs inline and this never blocks.  Otherwise
/// the calling thread sleeps until the call has run on the target
/// thread.  Returns [`CallError::Skipped`] if the liveness owner was
/// destroyed before the call could run.
///
/// If `target` is not being serviced by a thread, a warning is
/// logged, as this call will then block until some thread starts
/// servicing it, which might be never.  Calling this against a
/// thread that is itself blocked waiting on the calling thread will
/// deadlock.
///
/// [`CallError::Skipped`]: enum.CallError.html#variant.Skipped
/// [`dispatch`]: fn.dispatch.html
pub fn exec<F, A>(
    target: &Context,
    owner: Option<&dyn Liveness>,
    fun: F,
    args: A,
) -> Result<F::Output, CallError>
where
    F: Invoke<A>,
    A: Send + 'static,
    F::Output: Send + 'static,
{
    wait(target, dispatch(target, owner, fun, args))
}

/// Blocking form of [`dispatch_to`]
///
/// [`dispatch_to`]: fn.dispatch_to.html
pub fn exec_to<T, F, R>(target: &Context, object: &Arc<T>, fun: F) -> Result<R, CallError>
where
    T: Send + Sync + 'static,
    F: FnOnce(&T) -> R + Send + 'static,
    R: Send + 'static,
{
    wait(target, dispatch_to(target, object, fun))
}

fn wait<R: Send + 'static>(target: &Context, future: Future<R>) -> Result<R, CallError> {
    if !target.is_running() {
        tracing::warn!(context = %target, state = ?target.state(), "target context is not running, call may deadlock");
    }
    future.result()
}
