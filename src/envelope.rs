use crate::liveness::Guard;
use crate::promise::Promise;

/// A callable that accepts the argument tuple `Args`
///
/// Implemented for every `FnOnce` taking from zero to eight
/// arguments, with `Args` the tuple of those argument types, e.g.
/// `()`, `(u32,)` or `(String, Vec<u8>)`.  A callable and argument
/// tuple that don't match fail to compile, so mismatches never reach
/// another thread.
pub trait Invoke<Args>: Send + 'static {
    type Output;

    /// Call with the arguments unpacked from the tuple
    fn invoke(self, args: Args) -> Self::Output;
}

macro_rules! impl_invoke {
    ($($arg:ident)*) => {
        impl<Fun, Out, $($arg,)*> Invoke<($($arg,)*)> for Fun
        where
            Fun: FnOnce($($arg),*) -> Out + Send + 'static,
        {
            type Output = Out;

            #[inline]
            #[allow(non_snake_case)]
            fn invoke(self, ($($arg,)*): ($($arg,)*)) -> Out {
                self($($arg),*)
            }
        }
    };
}

impl_invoke!();
impl_invoke!(A1);
impl_invoke!(A1 A2);
impl_invoke!(A1 A2 A3);
impl_invoke!(A1 A2 A3 A4);
impl_invoke!(A1 A2 A3 A4 A5);
impl_invoke!(A1 A2 A3 A4 A5 A6);
impl_invoke!(A1 A2 A3 A4 A5 A6 A7);
impl_invoke!(A1 A2 A3 A4 A5 A6 A7 A8);

/// The unit of cross-thread work: a callable, the arguments it will
/// be called with, an optional liveness guard and the promise for its
/// result
///
/// Everything is owned by value.  Nothing else can see the callable
/// or its arguments whilst they are in transit, and the envelope
/// can't be cloned.  It is opened exactly once, by the executor on
/// the target thread.
pub(crate) struct CallEnvelope<F, A, R>
where
    F: Invoke<A, Output = R>,
    R: Send + 'static,
{
    fun: F,
    args: A,
    guard: Option<Guard>,
    promise: Promise<R>,
}

impl<F, A, R> CallEnvelope<F, A, R>
where
    F: Invoke<A, Output = R>,
    A: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(fun: F, args: A, guard: Option<Guard>, promise: Promise<R>) -> Self {
        Self {
            fun,
            args,
            guard,
            promise,
        }
    }

    pub(crate) fn open(self) -> (F, A, Option<Guard>, Promise<R>) {
        (self.fun, self.args, self.guard, self.promise)
    }
}
