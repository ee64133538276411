use crate::context::{ContextId, Delivery, Receiver};
use crate::envelope::{CallEnvelope, Invoke};
use crate::event::{call_event_type, Event};
use std::marker::PhantomData;

/// Transient receiver that runs a single call envelope on its
/// context's thread and then deletes itself
///
/// One is attached per cross-thread dispatch.  Executors are never
/// reused, so any number may be attached to the same context at once.
pub(crate) struct Executor<F, A, R> {
    bound_to: ContextId,
    // The executor only ever sees the envelope in the event; it owns
    // none of its contents
    _envelope: PhantomData<fn() -> (F, A, R)>,
}

impl<F, A, R> Executor<F, A, R>
where
    F: Invoke<A, Output = R>,
    A: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(bound_to: ContextId) -> Self {
        Self {
            bound_to,
            _envelope: PhantomData,
        }
    }

    fn execute(&self, envelope: CallEnvelope<F, A, R>) {
        let (fun, args, guard, mut promise) = envelope.open();

        // The guard is checked here, on the target thread, after
        // dequeueing and right before the call.  Whilst the call runs,
        // the owner is kept alive by `_hold`.
        let _hold = match guard {
            None => None,
            Some(guard) => match guard.hold() {
                Some(strong) => Some(strong),
                None => {
                    tracing::trace!(context = %self.bound_to, ?guard, "liveness owner gone; call skipped");
                    promise.skip();
                    return;
                }
            },
        };

        promise.start();
        let value = fun.invoke(args);
        promise.finish(value);
    }
}

impl<F, A, R> Receiver for Executor<F, A, R>
where
    F: Invoke<A, Output = R>,
    A: Send + 'static,
    R: Send + 'static,
{
    fn event(&mut self, event: Event, delivery: &mut Delivery<'_>) -> bool {
        if event.kind() != call_event_type() {
            return false;
        }
        debug_assert_eq!(delivery.context().id(), self.bound_to);

        // Deleted whichever way this goes, including when the call
        // skips
        delivery.delete_later();
        match event.downcast::<CallEnvelope<F, A, R>>() {
            Ok(envelope) => {
                tracing::trace!(context = %self.bound_to, receiver = ?delivery.key(), "deliver call");
                self.execute(envelope);
                true
            }
            Err(_) => false,
        }
    }
}
