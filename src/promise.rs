use crate::context::Context;
use crate::dispatch::dispatch;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Progress of a [`Promise`]
///
/// Moves forward only: `Pending`, then optionally `Started`, then
/// exactly one of the terminal states.
///
/// [`Promise`]: struct.Promise.html
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PromiseState {
    /// Not yet picked up for execution
    Pending,
    /// Execution has begun
    Started,
    /// Finished with a value (which is `()` for a void call)
    Finished,
    /// Finished without a value because the liveness guard failed
    Skipped,
    /// The promise was dropped without being finished
    Abandoned,
}

impl PromiseState {
    /// Test whether no further transition is possible
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Skipped | Self::Abandoned)
    }
}

/// Reason that a call resolved without a value
#[derive(thiserror::Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum CallError {
    #[error("call skipped because its liveness owner was destroyed before execution")]
    Skipped,
    #[error("call abandoned before producing a result")]
    Abandoned,
}

type Continuation<R> = Box<dyn FnOnce(Result<R, CallError>) + Send + 'static>;

struct Slot<R> {
    state: PromiseState,
    outcome: Option<Result<R, CallError>>,
    then: Option<Continuation<R>>,
}

impl<R> Slot<R> {
    // Only ever called once the state is terminal, and only by the
    // single reader
    fn take_outcome(&mut self) -> Result<R, CallError> {
        self.outcome
            .take()
            .expect("Promise outcome has already been taken")
    }
}

struct Shared<R> {
    mutex: Mutex<Slot<R>>,
    condvar: Condvar,
}

impl<R> Shared<R> {
    // Nothing panics whilst holding the lock, so a poisoned lock
    // still holds consistent data
    fn lock(&self) -> MutexGuard<'_, Slot<R>> {
        self.mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Writer half of a single-assignment result channel
///
/// [`Promise::finish`] and [`Promise::skip`] take `self`, so a
/// promise can be finished at most once.  If it is dropped without
/// being finished, the paired [`Future`] resolves as
/// [`CallError::Abandoned`], so that waiters are never left hanging
/// on a promise that no longer exists.
///
/// [`CallError::Abandoned`]: enum.CallError.html#variant.Abandoned
/// [`Future`]: struct.Future.html
/// [`Promise::finish`]: struct.Promise.html#method.finish
/// [`Promise::skip`]: struct.Promise.html#method.skip
pub struct Promise<R: Send + 'static> {
    shared: Arc<Shared<R>>,
    done: bool,
}

impl<R: Send + 'static> Promise<R> {
    /// Create a connected promise and future
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Promise<R>, Future<R>) {
        let shared = Arc::new(Shared {
            mutex: Mutex::new(Slot {
                state: PromiseState::Pending,
                outcome: None,
                then: None,
            }),
            condvar: Condvar::new(),
        });
        (
            Promise {
                shared: shared.clone(),
                done: false,
            },
            Future { shared },
        )
    }

    /// Mark execution as begun.  Has no effect unless pending.
    pub fn start(&mut self) {
        let mut lock = self.shared.lock();
        if lock.state == PromiseState::Pending {
            lock.state = PromiseState::Started;
        }
    }

    /// Resolve with a value
    pub fn finish(mut self, value: R) {
        self.complete(PromiseState::Finished, Ok(value));
    }

    /// Resolve without a value
    pub fn skip(mut self) {
        self.complete(PromiseState::Skipped, Err(CallError::Skipped));
    }

    fn complete(&mut self, state: PromiseState, outcome: Result<R, CallError>) {
        self.done = true;
        let mut lock = self.shared.lock();
        debug_assert!(!lock.state.is_terminal());
        lock.state = state;
        lock.outcome = Some(outcome);
        let then = lock.then.take();
        let outcome = then.as_ref().map(|_| lock.take_outcome());
        drop(lock);
        self.shared.condvar.notify_all();

        if let (Some(then), Some(outcome)) = (then, outcome) {
            then(outcome);
        }
    }
}

impl<R: Send + 'static> Drop for Promise<R> {
    fn drop(&mut self) {
        if !self.done {
            self.complete(PromiseState::Abandoned, Err(CallError::Abandoned));
        }
    }
}

/// Reader half of a single-assignment result channel
///
/// The state may be observed from any thread.  The result itself is
/// moved out exactly once, either by blocking on [`Future::result`]
/// or through a continuation registered with [`Future::then`].
///
/// [`Future::result`]: struct.Future.html#method.result
/// [`Future::then`]: struct.Future.html#method.then
pub struct Future<R: Send + 'static> {
    shared: Arc<Shared<R>>,
}

impl<R: Send + 'static> Future<R> {
    /// Get the current state of the paired promise
    pub fn state(&self) -> PromiseState {
        self.shared.lock().state
    }

    /// Test whether execution has begun or is already over
    pub fn is_started(&self) -> bool {
        self.state() != PromiseState::Pending
    }

    /// Test whether the future has resolved
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Block until the future has resolved
    pub fn wait(&self) {
        let mut lock = self.shared.lock();
        while !lock.state.is_terminal() {
            lock = self
                .shared
                .condvar
                .wait(lock)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the future has resolved or the timeout passes.
    /// Returns `true` if it resolved.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut lock = self.shared.lock();
        while !lock.state.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            lock = self
                .shared
                .condvar
                .wait_timeout(lock, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Block until the future has resolved, then return the result
    pub fn result(self) -> Result<R, CallError> {
        self.wait();
        self.shared.lock().take_outcome()
    }

    /// Run `f` on `context` with the result once the future resolves.
    /// If it has resolved already, `f` is dispatched right away.
    ///
    /// The continuation does not keep `context` alive.  If the context
    /// has been dropped by the time the future resolves, `f` is
    /// dropped without running.
    pub fn then(
        self,
        context: &Context,
        f: impl FnOnce(Result<R, CallError>) + Send + 'static,
    ) {
        let context = context.downgrade();
        let then: Continuation<R> = Box::new(move |outcome| match context.upgrade() {
            Some(context) => {
                dispatch(&context, None, f, (outcome,));
            }
            None => tracing::trace!("continuation dropped; its context is gone"),
        });

        let mut lock = self.shared.lock();
        if lock.state.is_terminal() {
            let outcome = lock.take_outcome();
            drop(lock);
            then(outcome);
        } else {
            lock.then = Some(then);
        }
    }

    /// Run `f` on `context` with the value, if the future resolves
    /// with one.  Nothing runs if the call was skipped or abandoned.
    pub fn then_some(self, context: &Context, f: impl FnOnce(R) + Send + 'static) {
        self.then(context, move |outcome| {
            if let Ok(value) = outcome {
                f(value);
            }
        });
    }
}

impl<R: Send + 'static> fmt::Debug for Future<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("state", &self.state())
            .finish()
    }
}
