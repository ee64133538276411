use crate::context::Context;
use crate::envelope::{CallEnvelope, Invoke};
use crate::event::{call_event_type, Event};
use crate::executor::Executor;
use crate::liveness::Liveness;
use crate::promise::{Future, Promise};
use std::sync::Arc;

/// Run `fun(args...)` on the thread owning `target`, returning a
/// [`Future`] for the result
///
/// `args` is a tuple, moved into the call, e.g. `(7,)` for a single
/// argument or `()` for none.
///
/// If the calling thread owns `target`, the call runs right away, and
/// the returned future has already resolved by the time this returns.
/// The liveness owner is not consulted in that case.
///
/// Otherwise the call is posted to `target`'s queue and runs when the
/// owning thread gets to it, in the order posted.  If `owner` is
/// given, it is checked at that point on the target thread, and if it
/// has been destroyed in the meantime the call is skipped and the
/// future resolves with [`CallError::Skipped`].
///
/// If no thread ever services `target`, the future never resolves.
///
/// [`CallError::Skipped`]: enum.CallError.html#variant.Skipped
/// [`Future`]: struct.Future.html
pub fn dispatch<F, A>(
    target: &Context,
    owner: Option<&dyn Liveness>,
    fun: F,
    args: A,
) -> Future<F::Output>
where
    F: Invoke<A>,
    A: Send + 'static,
    F::Output: Send + 'static,
{
    let (mut promise, future) = Promise::new();

    if target.is_current() {
        tracing::trace!(context = %target, "dispatch inline");
        promise.start();
        let value = fun.invoke(args);
        promise.finish(value);
    } else {
        let guard = owner.map(|o| o.guard());
        let envelope = CallEnvelope::new(fun, args, guard, promise);
        let key = target.attach(Executor::<F, A, F::Output>::new(target.id()));
        target.post(key, Event::new(call_event_type(), envelope));
    }
    future
}

/// Run `fun` on the thread owning `target` with a reference to
/// `object`
///
/// `object` is the liveness owner: the call is skipped if every
/// other `Arc` to it has gone by the time the call comes to run.  The
/// envelope only holds a weak reference, so an outstanding call
/// doesn't keep the object alive.
pub fn dispatch_to<T, F, R>(target: &Context, object: &Arc<T>, fun: F) -> Future<R>
where
    T: Send + Sync + 'static,
    F: FnOnce(&T) -> R + Send + 'static,
    R: Send + 'static,
{
    if target.is_current() {
        let object = object.clone();
        return dispatch(target, None, move || fun(&object), ());
    }

    let weak = Arc::downgrade(object);
    dispatch(
        target,
        Some(object as &dyn Liveness),
        move || {
            // The guard holds the object alive whilst the call runs
            let object = weak
                .upgrade()
                .expect("Guarded object destroyed after the guard passed");
            fun(&object)
        },
        (),
    )
}
