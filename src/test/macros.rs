use super::{add, square};
use crate::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[test]
fn dispatch_call_syntax() {
    let worker = LoopThread::spawn("macro").unwrap();
    let f = dispatch!([worker.context()], square(7));
    assert_eq!(f.result(), Ok(49));
    let f = dispatch!([worker.context()], add(1, 2,));
    assert_eq!(f.result(), Ok(3));
}

#[test]
fn dispatch_with_owner_skips() {
    let mut worker = LoopThread::new("macro-skip");
    let lifeline = Lifeline::new();
    let f = dispatch!([worker.context(), lifeline], square(2));
    drop(lifeline);
    worker.start().unwrap();
    assert_eq!(f.result(), Err(CallError::Skipped));
}

#[test]
fn dispatch_closure() {
    let worker = LoopThread::spawn("macro-closure").unwrap();
    let ran = Arc::new(AtomicBool::new(false));
    let r = ran.clone();
    let owner = Lifeline::new();
    let f = dispatch!([worker.context(), owner], move || r.store(true, Ordering::SeqCst));
    assert_eq!(f.result(), Ok(()));
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn exec_call_syntax() {
    let worker = LoopThread::spawn("macro-exec").unwrap();
    assert_eq!(exec!([worker.context()], add(2, 3)), Ok(5));
    let owner = Arc::new(10_u32);
    let o = owner.clone();
    assert_eq!(exec!([worker.context(), owner], move || *o + 1), Ok(11));
}

#[test]
fn exec_inline_on_own_thread() {
    let el = EventLoop::new();
    assert_eq!(exec!([el.context()], square(4)), Ok(16));
}
