use crate::context::{Binding, Context, LoopState};
use std::panic::AssertUnwindSafe;
use std::thread::JoinHandle;
use std::time::Duration;

/// Failure of a [`LoopThread`]
///
/// [`LoopThread`]: struct.LoopThread.html
#[derive(thiserror::Error, Debug)]
pub enum LoopError {
    #[error("loop thread has already been started")]
    AlreadyStarted,
    #[error("failed to spawn loop thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("loop thread panicked: {0}")]
    Panicked(String),
}

/// Configuration for a [`LoopThread`]
///
/// [`LoopThread`]: struct.LoopThread.html
#[derive(Debug, Default, Clone)]
pub struct Builder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl Builder {
    /// Start with an unnamed thread and the default stack size
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the OS thread, also used to label the context in logs
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Stack size for the OS thread, in bytes
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Create the [`LoopThread`] without starting it.  Calls may
    /// already be dispatched to its context, and will run once it is
    /// started.
    ///
    /// [`LoopThread`]: struct.LoopThread.html
    pub fn build(self) -> LoopThread {
        LoopThread {
            context: Context::new(self.name),
            stack_size: self.stack_size,
            handle: None,
        }
    }

    /// Create and start the [`LoopThread`]
    ///
    /// [`LoopThread`]: struct.LoopThread.html
    pub fn spawn(self) -> Result<LoopThread, LoopError> {
        let mut thread = self.build();
        thread.start()?;
        Ok(thread)
    }
}

/// A thread that services a [`Context`]
///
/// The thread runs the context's event loop, delivering each posted
/// event in turn, until [`LoopThread::quit`] is called.  A panic from
/// an event handler (e.g. from a dispatched call) terminates the
/// thread; it is reported by [`LoopThread::join`].
///
/// When dropped, the thread is asked to quit once it has handled
/// everything already queued, and is then joined.
///
/// [`Context`]: struct.Context.html
/// [`LoopThread::join`]: struct.LoopThread.html#method.join
/// [`LoopThread::quit`]: struct.LoopThread.html#method.quit
pub struct LoopThread {
    context: Context,
    stack_size: Option<usize>,
    handle: Option<JoinHandle<Option<String>>>,
}

impl LoopThread {
    /// Create a named loop thread without starting it
    pub fn new(name: impl Into<String>) -> Self {
        Builder::new().name(name).build()
    }

    /// Create and start a named loop thread
    pub fn spawn(name: impl Into<String>) -> Result<Self, LoopError> {
        Builder::new().name(name).spawn()
    }

    /// Start the OS thread.  The context reports itself as running
    /// from the moment this returns successfully.  A thread that has
    /// been joined may be started again.
    pub fn start(&mut self) -> Result<(), LoopError> {
        if self.handle.is_some() {
            return Err(LoopError::AlreadyStarted);
        }
        let mut builder = std::thread::Builder::new();
        if let Some(name) = self.context.name() {
            builder = builder.name(name.to_string());
        }
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        let previous = self.context.state();
        self.context.set_state(LoopState::Running);
        let context = self.context.clone();
        match builder.spawn(move || run_loop(context)) {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.context.set_state(previous);
                Err(LoopError::Spawn(e))
            }
        }
    }

    /// Get the context this thread services
    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Test whether the thread has been started and not yet exited
    pub fn is_running(&self) -> bool {
        self.context.is_running()
    }

    /// Ask the thread to stop once everything queued so far has been
    /// handled
    pub fn quit(&self) {
        self.context.quit();
    }

    /// Wait for the thread to exit.  Returns immediately if it was
    /// never started.  Doesn't ask it to quit; see
    /// [`LoopThread::quit`].
    ///
    /// [`LoopThread::quit`]: struct.LoopThread.html#method.quit
    pub fn join(&mut self) -> Result<(), LoopError> {
        match self.handle.take().map(JoinHandle::join) {
            None | Some(Ok(None)) => Ok(()),
            Some(Ok(Some(msg))) => Err(LoopError::Panicked(msg)),
            Some(Err(e)) => Err(LoopError::Panicked(panic_message(e))),
        }
    }
}

impl Drop for LoopThread {
    fn drop(&mut self) {
        // Joining from the thread itself would never return
        if self.handle.is_some() && !self.context.is_current() {
            self.quit();
            let _ = self.join();
        }
    }
}

fn run_loop(context: Context) -> Option<String> {
    let _binding = context.bind();
    tracing::debug!(context = %context, "loop thread started");
    let rv = match std::panic::catch_unwind(AssertUnwindSafe(|| context.run())) {
        Ok(()) => None,
        Err(e) => {
            let msg = panic_message(e);
            tracing::error!(context = %context, panic = %msg, "loop thread terminated by panic");
            Some(msg)
        }
    };
    tracing::debug!(context = %context, "loop thread stopped");
    rv
}

// Pass through panic message if it is a `String` or `&str`, else
// generate some debugging output
fn panic_message(e: Box<dyn std::any::Any + Send>) -> String {
    match e.downcast::<String>() {
        Ok(v) => *v,
        Err(e) => match e.downcast::<&str>() {
            Ok(v) => v.to_string(),
            Err(e) => format!("Panic with unknown type: {:?}", e.type_id()),
        },
    }
}

/// Event loop on the current thread
///
/// Creating an [`EventLoop`] makes the current thread the owner of a
/// new [`Context`], like the main thread of an application.  Calls
/// dispatched to that context from other threads are queued until
/// this thread processes them with [`EventLoop::exec`] or
/// [`EventLoop::process_events`].  Calls dispatched from this thread
/// itself run inline.
///
/// The context counts as running for as long as the [`EventLoop`]
/// exists, whether or not events are being processed at a given
/// moment.
///
/// [`Context`]: struct.Context.html
/// [`EventLoop::exec`]: struct.EventLoop.html#method.exec
/// [`EventLoop::process_events`]: struct.EventLoop.html#method.process_events
/// [`EventLoop`]: struct.EventLoop.html
pub struct EventLoop {
    context: Context,
    _binding: Binding,
}

impl EventLoop {
    /// Adopt the current thread.  Panics if this thread already owns a
    /// context.
    pub fn new() -> Self {
        Self::adopt(None)
    }

    /// Adopt the current thread with a named context.  Panics if this
    /// thread already owns a context.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::adopt(Some(name.into()))
    }

    fn adopt(name: Option<String>) -> Self {
        let context = Context::new(name);
        let binding = context.bind();
        Self {
            context,
            _binding: binding,
        }
    }

    /// Get the context owned by this thread
    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Handle the events queued right now, without waiting.  Events
    /// posted whilst doing so are left for the next call.  Returns
    /// the number handled.  A quit marker ends the batch early.
    pub fn process_events(&self) -> usize {
        self.context.process_pending().0
    }

    /// Wait up to `timeout` for something to be queued.  Returns
    /// `true` if there is something to process.
    pub fn wait_for_events(&self, timeout: Duration) -> bool {
        self.context.wait_pending(timeout)
    }

    /// Handle events as they arrive until [`EventLoop::quit`] is
    /// called
    ///
    /// [`EventLoop::quit`]: struct.EventLoop.html#method.quit
    pub fn exec(&self) {
        self.context.run();
    }

    /// Make [`EventLoop::exec`] return once it reaches this point in
    /// the queue.  May also be called via the context from any thread.
    ///
    /// [`EventLoop::exec`]: struct.EventLoop.html#method.exec
    pub fn quit(&self) {
        self.context.quit();
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
