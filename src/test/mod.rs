mod liveness;
mod macros;
mod promise;
mod thread;

use crate::EventLoop;
use std::time::{Duration, Instant};

/// Process events on `el` until `done` returns true.  Panics if that
/// takes more than a few seconds.
pub(crate) fn pump_until(el: &EventLoop, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        if Instant::now() > deadline {
            panic!("Timed out waiting for event loop condition");
        }
        el.wait_for_events(Duration::from_millis(10));
        el.process_events();
    }
}

pub(crate) fn square(x: u64) -> u64 {
    x * x
}

pub(crate) fn add(a: u32, b: u32) -> u32 {
    a + b
}
