use crate::event::Event;
use slab::Slab;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

const POISONED: &str = "threadcall context lock poisoned";

thread_local! {
    // Context bound to this thread, if any
    static CURRENT: RefCell<Option<Context>> = RefCell::new(None);
}

/// Process-unique identity of a [`Context`]
///
/// [`Context`]: struct.Context.html
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw numeric value
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// State of the thread servicing a [`Context`]
///
/// [`Context`]: struct.Context.html
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    /// No thread has been started for this context yet.  Posted
    /// items are queued but nothing drains them.
    Idle,
    /// A thread owns this context and services its queue
    Running,
    /// The owning thread has gone away.  Items still queued will not
    /// be processed unless the context is started again.
    Stopped,
}

/// Handle to a receiver attached to a [`Context`]
///
/// Keys are never reissued: once a receiver is deleted, its key
/// refers to nothing, even if its slot is reused.
///
/// [`Context`]: struct.Context.html
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ReceiverKey {
    index: usize,
    gen: u64,
}

/// Something that can be attached to a [`Context`] and handle the
/// events posted to it
///
/// Handlers always run on the thread that owns the context.  Return
/// `false` if the event kind was not recognised.
///
/// [`Context`]: struct.Context.html
pub trait Receiver: Send + 'static {
    fn event(&mut self, event: Event, delivery: &mut Delivery<'_>) -> bool;
}

/// Delivery details passed to [`Receiver::event`]
///
/// [`Receiver::event`]: trait.Receiver.html#tymethod.event
pub struct Delivery<'a> {
    context: &'a Context,
    key: ReceiverKey,
    delete: bool,
}

impl<'a> Delivery<'a> {
    /// The context delivering the event, which is also the current
    /// context of this thread
    #[inline]
    pub fn context(&self) -> &Context {
        self.context
    }

    /// Key of the receiver handling the event
    #[inline]
    pub fn key(&self) -> ReceiverKey {
        self.key
    }

    /// Detach and drop the receiver once its handler returns.  Any
    /// further events addressed to it are discarded.
    #[inline]
    pub fn delete_later(&mut self) {
        self.delete = true;
    }
}

type BoxReceiver = Box<dyn Receiver>;

struct Slot {
    gen: u64,
    // `None` whilst the receiver is borrowed for delivery
    receiver: Option<BoxReceiver>,
}

enum Posted {
    Event(ReceiverKey, Event),
    Quit,
}

struct Inner {
    state: LoopState,
    bound: Option<ThreadId>,
    queue: VecDeque<Posted>,
    receivers: Slab<Slot>,
    next_gen: u64,
}

impl Inner {
    // Get the slot for `key`, if its receiver has not been deleted
    fn slot_mut(&mut self, key: ReceiverKey) -> Option<&mut Slot> {
        self.receivers.get_mut(key.index).filter(|s| s.gen == key.gen)
    }
}

struct Shared {
    id: ContextId,
    name: Option<String>,
    mutex: Mutex<Inner>,
    condvar: Condvar,
}

/// An execution context: a FIFO queue of posted events drained by
/// exactly one thread
///
/// A [`Context`] is a cheap reference-counted handle which may be
/// cloned and passed to any thread.  Events are delivered in the
/// order they were posted, and only ever on the thread that owns the
/// context, i.e. a [`LoopThread`] or a thread that has adopted the
/// context by creating an [`EventLoop`].
///
/// [`Context`]: struct.Context.html
/// [`EventLoop`]: struct.EventLoop.html
/// [`LoopThread`]: struct.LoopThread.html
#[derive(Clone)]
pub struct Context {
    shared: Arc<Shared>,
}

enum Wait {
    NoWait,
    Forever,
}

impl Context {
    pub(crate) fn new(name: Option<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: ContextId::next(),
                name,
                mutex: Mutex::new(Inner {
                    state: LoopState::Idle,
                    bound: None,
                    queue: VecDeque::new(),
                    receivers: Slab::new(),
                    next_gen: 0,
                }),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Get the context bound to the calling thread, or `None` if this
    /// thread does not own a context
    pub fn current() -> Option<Context> {
        CURRENT.try_with(|c| c.borrow().clone()).ok().flatten()
    }

    /// Test whether the calling thread is the one that owns this
    /// context
    pub fn is_current(&self) -> bool {
        CURRENT
            .try_with(|c| c.borrow().as_ref().map_or(false, |c| c.id() == self.id()))
            .unwrap_or(false)
    }

    /// Get the identity of this context
    #[inline]
    pub fn id(&self) -> ContextId {
        self.shared.id
    }

    /// Get the name given when the context was created, if any
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.shared.name.as_deref()
    }

    /// Get the state of the thread servicing this context
    pub fn state(&self) -> LoopState {
        self.lock().state
    }

    /// Test whether a thread currently owns and services this context
    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// Number of items waiting in the queue
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Check the number of attached receivers (for testing)
    #[cfg(test)]
    pub(crate) fn receiver_count(&self) -> usize {
        self.lock().receivers.len()
    }

    /// Attach a receiver to this context.  Events posted to the
    /// returned key will be handled by it on the owning thread.
    pub fn attach(&self, receiver: impl Receiver) -> ReceiverKey {
        let mut lock = self.lock();
        let gen = lock.next_gen;
        lock.next_gen += 1;
        let index = lock.receivers.insert(Slot {
            gen,
            receiver: Some(Box::new(receiver)),
        });
        ReceiverKey { index, gen }
    }

    /// Queue an event for the given receiver.  Never blocks on the
    /// receiver; delivery happens later on the owning thread.
    pub fn post(&self, key: ReceiverKey, event: Event) {
        tracing::trace!(context = %self, receiver = key.index, kind = event.kind().raw(), "post");
        self.push(Posted::Event(key, event));
    }

    /// Ask the owning thread to stop processing once everything
    /// posted before this call has been handled
    pub fn quit(&self) {
        self.push(Posted::Quit);
    }

    fn push(&self, item: Posted) {
        let mut lock = self.lock();
        let empty = lock.queue.is_empty();
        lock.queue.push_back(item);
        drop(lock);

        if empty {
            self.shared.condvar.notify_all();
        }
    }

    pub(crate) fn downgrade(&self) -> WeakContext {
        WeakContext(Arc::downgrade(&self.shared))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.mutex.lock().expect(POISONED)
    }

    pub(crate) fn set_state(&self, state: LoopState) {
        self.lock().state = state;
    }

    /// Make this the context of the calling thread until the returned
    /// binding is dropped
    pub(crate) fn bind(&self) -> Binding {
        let tid = std::thread::current().id();
        if Context::current().is_some() {
            panic!("This thread already owns a context; cannot also bind {}", self);
        }
        let mut lock = self.lock();
        if lock.bound.is_some() {
            panic!("Context {} is already owned by another thread", self);
        }
        lock.bound = Some(tid);
        lock.state = LoopState::Running;
        drop(lock);

        CURRENT.with(|c| *c.borrow_mut() = Some(self.clone()));
        Binding {
            context: self.clone(),
            _not_send: PhantomData,
        }
    }

    /// Process items until a quit marker is reached
    pub(crate) fn run(&self) {
        self.check_current();
        while let Some(item) = self.pop(Wait::Forever) {
            match item {
                Posted::Quit => break,
                Posted::Event(key, event) => self.deliver(key, event),
            }
        }
    }

    /// Process the items that are queued right now, but not those
    /// queued whilst processing.  Returns the number of events
    /// delivered and whether a quit marker was seen.
    pub(crate) fn process_pending(&self) -> (usize, bool) {
        self.check_current();
        let mut count = self.pending();
        let mut delivered = 0;
        while count > 0 {
            count -= 1;
            match self.pop(Wait::NoWait) {
                None => break,
                Some(Posted::Quit) => return (delivered, true),
                Some(Posted::Event(key, event)) => {
                    self.deliver(key, event);
                    delivered += 1;
                }
            }
        }
        (delivered, false)
    }

    /// Wait until at least one item is queued, or the timeout passes.
    /// Returns `true` if there is something to process.
    pub(crate) fn wait_pending(&self, timeout: Duration) -> bool {
        let mut lock = self.lock();
        // A timeout too far out to represent is the same as none
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            while lock.queue.is_empty() {
                lock = self.shared.condvar.wait(lock).expect(POISONED);
            }
            return true;
        };
        while lock.queue.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            lock = self
                .shared
                .condvar
                .wait_timeout(lock, deadline - now)
                .expect(POISONED)
                .0;
        }
        true
    }

    fn check_current(&self) {
        assert!(
            self.is_current(),
            "Events of {} may only be processed on its own thread",
            self
        );
    }

    fn pop(&self, wait: Wait) -> Option<Posted> {
        let mut lock = self.lock();
        loop {
            if let Some(item) = lock.queue.pop_front() {
                return Some(item);
            }
            lock = match wait {
                Wait::NoWait => return None,
                Wait::Forever => self.shared.condvar.wait(lock).expect(POISONED),
            };
        }
    }

    fn deliver(&self, key: ReceiverKey, event: Event) {
        let mut receiver = match self.borrow_receiver(key) {
            Some(r) => r,
            None => {
                tracing::trace!(context = %self, receiver = key.index, "dropped event for deleted receiver");
                return;
            }
        };

        let kind = event.kind();
        let mut flight = InFlight {
            context: self,
            key,
            landed: false,
        };
        let mut delivery = Delivery {
            context: self,
            key,
            delete: false,
        };
        if !receiver.event(event, &mut delivery) {
            tracing::debug!(context = %self, receiver = key.index, kind = kind.raw(), "receiver ignored event");
        }
        flight.landed = true;

        let mut lock = self.lock();
        let slot = lock
            .slot_mut(key)
            .expect("Receiver slot unexpectedly deleted during delivery");
        if slot.receiver.is_some() {
            panic!("Receiver slot unexpectedly occupied by another receiver during delivery");
        }
        if delivery.delete {
            lock.receivers.remove(key.index);
            drop(lock);
            drop(receiver);
        } else {
            slot.receiver = Some(receiver);
        }
    }

    /// Borrow a receiver from its slot, leaving `None` there.  Returns
    /// `None` if the receiver has been deleted.  Panics on re-entrant
    /// delivery to the same receiver.
    fn borrow_receiver(&self, key: ReceiverKey) -> Option<BoxReceiver> {
        let mut lock = self.lock();
        let slot = lock.slot_mut(key)?;
        match slot.receiver.take() {
            Some(r) => Some(r),
            None => panic!("Receiver has been borrowed from its slot twice"),
        }
    }
}

/// Non-owning handle to a [`Context`], for items stored inside its
/// own queue
///
/// [`Context`]: struct.Context.html
pub(crate) struct WeakContext(Weak<Shared>);

impl WeakContext {
    pub(crate) fn upgrade(&self) -> Option<Context> {
        self.0.upgrade().map(|shared| Context { shared })
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.id()),
            None => self.id().fmt(f),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// Ownership of a context by the current thread.  Releases it on
/// drop, including when unwinding.
pub(crate) struct Binding {
    context: Context,
    // Must be dropped on the thread that created it
    _not_send: PhantomData<*const u8>,
}

impl Drop for Binding {
    fn drop(&mut self) {
        let _ = CURRENT.try_with(|c| c.borrow_mut().take());
        // Ignore poisoning here, to not panic in panic handler
        if let Ok(mut lock) = self.context.shared.mutex.lock() {
            lock.bound = None;
            lock.state = LoopState::Stopped;
        }
        self.context.shared.condvar.notify_all();
    }
}

// Clears the slot of a receiver whose handler unwound, so the slab
// does not keep a permanently borrowed entry
struct InFlight<'a> {
    context: &'a Context,
    key: ReceiverKey,
    landed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.landed {
            return;
        }
        if let Ok(mut lock) = self.context.shared.mutex.lock() {
            if lock.slot_mut(self.key).is_some() {
                lock.receivers.remove(self.key.index);
            }
        }
    }
}
