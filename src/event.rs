use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Tag distinguishing one kind of posted [`Event`] from another
///
/// Values below [`EventType::USER`] are reserved.  Obtain new values
/// with [`register_event_type`], which hands out each value at most
/// once per process.
///
/// [`Event`]: struct.Event.html
/// [`register_event_type`]: fn.register_event_type.html
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct EventType(u32);

impl EventType {
    /// First value available for registration
    pub const USER: u32 = 1000;

    /// Last value available for registration
    pub const MAX_USER: u32 = 65535;

    /// Get the raw numeric value
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({})", self.0)
    }
}

/// Failure to register an [`EventType`]
///
/// [`EventType`]: struct.EventType.html
#[derive(thiserror::Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum EventError {
    #[error("all event types from {} to {} have been registered", EventType::USER, EventType::MAX_USER)]
    Exhausted,
}

static NEXT_TYPE: AtomicU32 = AtomicU32::new(EventType::USER);

/// Register a new process-wide [`EventType`]
///
/// Each call returns a distinct value.  Safe to call from any thread.
///
/// [`EventType`]: struct.EventType.html
pub fn register_event_type() -> Result<EventType, EventError> {
    // Never let the counter run past the end, so that exhaustion is
    // sticky and no value wraps round to be handed out twice
    NEXT_TYPE
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            (v <= EventType::MAX_USER).then(|| v + 1)
        })
        .map(EventType)
        .map_err(|_| EventError::Exhausted)
}

/// Event type used for call envelopes.  Registered on first use and
/// constant afterwards.
pub(crate) fn call_event_type() -> EventType {
    static CALL: OnceLock<EventType> = OnceLock::new();
    *CALL.get_or_init(|| {
        register_event_type().expect("No event type left to register for call envelopes")
    })
}

/// An item posted to a [`Context`] for delivery to a [`Receiver`]
///
/// This owns its payload exclusively.  It is a "move" type and cannot
/// be cloned, so a posted payload is delivered at most once.
///
/// [`Context`]: struct.Context.html
/// [`Receiver`]: trait.Receiver.html
pub struct Event {
    kind: EventType,
    payload: Box<dyn Any + Send>,
}

impl Event {
    /// Create an event of the given kind carrying `payload`
    pub fn new<P: Any + Send>(kind: EventType, payload: P) -> Self {
        Self {
            kind,
            payload: Box::new(payload),
        }
    }

    /// Get the kind of this event
    #[inline]
    pub fn kind(&self) -> EventType {
        self.kind
    }

    /// Test whether the payload is of type `P`
    #[inline]
    pub fn is<P: Any>(&self) -> bool {
        self.payload.is::<P>()
    }

    /// Take the payload out, if it is of type `P`.  Otherwise the
    /// event is handed back unchanged.
    pub fn downcast<P: Any>(self) -> Result<P, Self> {
        let kind = self.kind;
        match self.payload.downcast::<P>() {
            Ok(p) => Ok(*p),
            Err(payload) => Err(Self { kind, payload }),
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("kind", &self.kind).finish_non_exhaustive()
    }
}
