use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

type Observed = dyn Any + Send + Sync;

/// An object whose continued existence can be checked from another
/// thread
///
/// Implemented for any `Arc<T>`, and for [`Lifeline`], a bare token
/// for owners that aren't themselves kept in an `Arc`.  Passing a
/// [`Liveness`] owner to [`dispatch`] makes the call conditional on
/// the owner still existing when the call comes to be executed.
///
/// [`Lifeline`]: struct.Lifeline.html
/// [`Liveness`]: trait.Liveness.html
/// [`dispatch`]: fn.dispatch.html
pub trait Liveness {
    /// Capture a [`Guard`] observing this owner
    ///
    /// [`Guard`]: struct.Guard.html
    fn guard(&self) -> Guard;
}

impl<T: Send + Sync + 'static> Liveness for Arc<T> {
    fn guard(&self) -> Guard {
        let strong: Arc<Observed> = self.clone();
        Guard::new(&strong)
    }
}

/// Weak observation of a liveness owner, together with the identity
/// it had when the guard was captured
///
/// This does not keep the owner alive.  Checking it is race-free
/// against concurrent destruction of the owner, as it rests on the
/// atomic upgrade of a `Weak`.  The observed allocation is kept
/// reserved by the `Weak`, so the identity can't be recycled by an
/// unrelated object whilst the guard exists.
#[derive(Clone)]
pub struct Guard {
    observed: Weak<Observed>,
    expected: usize,
}

impl Guard {
    fn new(strong: &Arc<Observed>) -> Self {
        Self {
            observed: Arc::downgrade(strong),
            expected: identity(strong),
        }
    }

    /// Test whether the owner still exists.  The answer may be stale
    /// by the time the caller looks at it, unless the owner is only
    /// ever destroyed on the calling thread.
    pub fn is_alive(&self) -> bool {
        self.hold().is_some()
    }

    /// Keep the owner alive for as long as the returned value is held,
    /// or return `None` if it has already been destroyed
    pub(crate) fn hold(&self) -> Option<Arc<Observed>> {
        self.observed
            .upgrade()
            .filter(|strong| identity(strong) == self.expected)
    }
}

// A guard captured once can stand in for its owner on further calls
impl Liveness for Guard {
    fn guard(&self) -> Guard {
        self.clone()
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("expected", &format_args!("{:#x}", self.expected))
            .field("alive", &self.is_alive())
            .finish()
    }
}

fn identity(strong: &Arc<Observed>) -> usize {
    Arc::as_ptr(strong) as *const () as usize
}

/// A liveness token with no other content
///
/// Keep one inside a structure (or on the stack) whose lifetime
/// calls should be tied to.  Dropping the [`Lifeline`] marks the
/// owner as destroyed, and any guarded calls not yet executed are
/// skipped.  It is a "move" type and cannot be cloned.
///
/// [`Lifeline`]: struct.Lifeline.html
pub struct Lifeline(Arc<Observed>);

struct Token;

impl Lifeline {
    /// Create a live token.  It stays live until dropped.
    pub fn new() -> Self {
        Self(Arc::new(Token))
    }

    /// Number of outstanding [`Guard`] instances observing this
    /// lifeline
    ///
    /// [`Guard`]: struct.Guard.html
    pub fn observers(&self) -> usize {
        Arc::weak_count(&self.0)
    }
}

impl Default for Lifeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness for Lifeline {
    fn guard(&self) -> Guard {
        Guard::new(&self.0)
    }
}

impl fmt::Debug for Lifeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lifeline({:#x})", identity(&self.0))
    }
}
