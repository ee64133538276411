//! Macros
//!
//! These give call syntax to [`dispatch`] and [`exec`]: the target
//! context (and optionally the liveness owner) go in `[]`, followed
//! by something that reads like the call itself.  The argument
//! expressions are evaluated on the calling thread, before dispatch,
//! and their values are moved into the call.
//!
//! [`dispatch`]: fn.dispatch.html
//! [`exec`]: fn.exec.html

/// Dispatch a call to the thread owning a context
///
/// ```ignore
/// let future = dispatch!([context], function(arg1, arg2...));
/// let future = dispatch!([context, owner], function(arg1, arg2...));
/// let future = dispatch!([context], move || expression);
/// let future = dispatch!([context, owner], move || expression);
/// ```
///
/// `context` is a [`Context`], `owner` anything implementing
/// [`Liveness`], and the result is a [`Future`].  See [`dispatch`].
///
/// [`Context`]: struct.Context.html
/// [`Future`]: struct.Future.html
/// [`Liveness`]: trait.Liveness.html
/// [`dispatch`]: fn.dispatch.html
#[macro_export]
macro_rules! dispatch {
    ([$ctx:expr], $fun:ident($($arg:expr),* $(,)?)) => {
        $crate::dispatch(&$ctx, None, $fun, ($($arg,)*))
    };
    ([$ctx:expr, $owner:expr], $fun:ident($($arg:expr),* $(,)?)) => {
        $crate::dispatch(&$ctx, Some(&$owner as &dyn $crate::Liveness), $fun, ($($arg,)*))
    };
    ([$ctx:expr], $closure:expr) => {
        $crate::dispatch(&$ctx, None, $closure, ())
    };
    ([$ctx:expr, $owner:expr], $closure:expr) => {
        $crate::dispatch(&$ctx, Some(&$owner as &dyn $crate::Liveness), $closure, ())
    };
}

/// Run a call on the thread owning a context and wait for it
///
/// ```ignore
/// let result = exec!([context], function(arg1, arg2...));
/// let result = exec!([context, owner], function(arg1, arg2...));
/// let result = exec!([context], move || expression);
/// ```
///
/// Takes the same forms as [`dispatch!`], and returns
/// `Result<R, CallError>`.  See [`exec`].
///
/// [`dispatch!`]: macro.dispatch.html
/// [`exec`]: fn.exec.html
#[macro_export]
macro_rules! exec {
    ([$ctx:expr], $fun:ident($($arg:expr),* $(,)?)) => {
        $crate::exec(&$ctx, None, $fun, ($($arg,)*))
    };
    ([$ctx:expr, $owner:expr], $fun:ident($($arg:expr),* $(,)?)) => {
        $crate::exec(&$ctx, Some(&$owner as &dyn $crate::Liveness), $fun, ($($arg,)*))
    };
    ([$ctx:expr], $closure:expr) => {
        $crate::exec(&$ctx, None, $closure, ())
    };
    ([$ctx:expr, $owner:expr], $closure:expr) => {
        $crate::exec(&$ctx, Some(&$owner as &dyn $crate::Liveness), $closure, ())
    };
}
