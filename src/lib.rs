//! **threadcall** runs calls on the thread that owns a resource.
//!
//! Some state can only be touched from one thread: the thread that
//! created a window, a connection polled by one event loop, a
//! non-`Send` object.  This crate lets any thread schedule a call
//! onto such a thread, collect its result through a [`Future`], and
//! optionally tie the call to the lifetime of an owner object so that
//! it is skipped if the owner is destroyed before the call runs.
//!
//! - [Overview of types](#overview-of-types)
//! - [Dispatch paths](#dispatch-paths)
//! - [Liveness guards](#liveness-guards)
//! - [Example](#example)
//!
//! # Overview of types
//!
//! [`Context`] is a handle to an execution context: a FIFO queue of
//! posted events drained by exactly one thread.  A [`LoopThread`]
//! spawns a thread to own a fresh context.  An [`EventLoop`] adopts
//! the current thread instead, like the main thread of an
//! application.
//!
//! [`dispatch`] and [`dispatch_to`] schedule a call onto a context
//! and return a [`Future`].  [`exec`] and [`exec_to`] do the same and
//! block until the call has run.  The [`dispatch!`] and [`exec!`]
//! macros give a call-like syntax to these.
//!
//! [`Promise`] and [`Future`] are the two halves of a single-use
//! result channel.  A [`Future`] may be waited on from any thread, or
//! given a continuation to run on a chosen context with
//! [`Future::then`].
//!
//! [`Liveness`] is implemented by anything that can act as a liveness
//! owner: any `Arc<T>`, or a [`Lifeline`] token.
//!
//! Lower down, [`Receiver`], [`Event`] and [`register_event_type`]
//! allow other kinds of events to be posted to a context alongside
//! dispatched calls.
//!
//! # Dispatch paths
//!
//! If the calling thread owns the target context, the call is made
//! inline, before [`dispatch`] returns, and the future has already
//! resolved.  No liveness check is made in this case, as nothing can
//! be destroyed between the check and the call.
//!
//! Otherwise the callable and its arguments are moved into an
//! envelope and posted to the target's queue, addressed to a
//! transient executor attached to that context.  When the owning
//! thread reaches it, the executor checks the liveness guard, makes
//! the call, resolves the promise and deletes itself.  Calls posted
//! from one thread to one context run in the order they were posted.
//!
//! If nothing ever services the target context, the call never runs
//! and the future never resolves.  [`exec`] logs a warning when
//! called against a context that is not running.
//!
//! # Liveness guards
//!
//! A guard is a `Weak` observation of the owner.  It is checked only
//! on the target thread, after dequeueing and immediately before the
//! call.  Checking at dispatch time would leave a window in which the
//! owner is destroyed before the call runs.  If the check fails, the
//! call is skipped and its future resolves with
//! [`CallError::Skipped`].  If it passes, the owner is kept alive
//! until the call returns.
//!
//! # Example
//!
//! ```
//!# use threadcall::{dispatch, exec, Context, LoopThread};
//! fn square(x: u64) -> u64 {
//!     x * x
//! }
//!
//! let worker = LoopThread::spawn("worker").unwrap();
//! let future = dispatch(worker.context(), None, square, (7,));
//! assert_eq!(future.result(), Ok(49));
//!
//! // The call really runs on the worker
//! let id = exec(worker.context(), None, || Context::current().map(|c| c.id()), ());
//! assert_eq!(id, Ok(Some(worker.context().id())));
//! ```
//!
//! [`CallError::Skipped`]: enum.CallError.html#variant.Skipped
//! [`Context`]: struct.Context.html
//! [`EventLoop`]: struct.EventLoop.html
//! [`Event`]: struct.Event.html
//! [`Future::then`]: struct.Future.html#method.then
//! [`Future`]: struct.Future.html
//! [`Lifeline`]: struct.Lifeline.html
//! [`Liveness`]: trait.Liveness.html
//! [`LoopThread`]: struct.LoopThread.html
//! [`Promise`]: struct.Promise.html
//! [`Receiver`]: trait.Receiver.html
//! [`dispatch!`]: macro.dispatch.html
//! [`dispatch_to`]: fn.dispatch_to.html
//! [`dispatch`]: fn.dispatch.html
//! [`exec!`]: macro.exec.html
//! [`exec_to`]: fn.exec_to.html
//! [`exec`]: fn.exec.html
//! [`register_event_type`]: fn.register_event_type.html

// Insist on 2018 style
#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use context::{Context, ContextId, Delivery, LoopState, Receiver, ReceiverKey};
pub use dispatch::{dispatch, dispatch_to};
pub use envelope::Invoke;
pub use event::{register_event_type, Event, EventError, EventType};
pub use exec::{exec, exec_to};
pub use liveness::{Guard, Lifeline, Liveness};
pub use promise::{CallError, Future, Promise, PromiseState};
pub use thread::{Builder, EventLoop, LoopError, LoopThread};

// Static assertions
static_assertions::assert_impl_all!(Context: Send, Sync, Clone);
static_assertions::assert_impl_all!(Future<u8>: Send, Sync);
static_assertions::assert_impl_all!(Promise<u8>: Send, Sync);
static_assertions::assert_impl_all!(Guard: Send, Sync, Clone);
static_assertions::assert_impl_all!(Lifeline: Send, Sync);
static_assertions::assert_impl_all!(Event: Send);
static_assertions::assert_impl_all!(LoopThread: Send);
static_assertions::assert_not_impl_any!(Future<u8>: Clone);
static_assertions::assert_not_impl_any!(Promise<u8>: Clone);
static_assertions::assert_not_impl_any!(Lifeline: Clone);
static_assertions::assert_not_impl_any!(Event: Clone, Sync);
static_assertions::assert_not_impl_any!(EventLoop: Send, Sync);

mod context;
mod dispatch;
mod envelope;
mod event;
mod exec;
mod executor;
mod liveness;
mod macros;
mod promise;
mod thread;

#[cfg(test)]
mod test;
