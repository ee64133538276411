//! Test `Promise` and `Future`

use crate::*;
use std::sync::{mpsc, Arc};
use std::time::Duration;

#[test]
fn states_move_forward() {
    let (mut p, f) = Promise::<u32>::new();
    assert_eq!(f.state(), PromiseState::Pending);
    assert!(!f.is_started());
    p.start();
    assert_eq!(f.state(), PromiseState::Started);
    p.start();
    assert_eq!(f.state(), PromiseState::Started);
    assert!(!f.is_finished());
    p.finish(3);
    assert_eq!(f.state(), PromiseState::Finished);
    assert!(f.is_started());
    assert_eq!(f.result(), Ok(3));
}

#[test]
fn skip_resolves_without_value() {
    let (p, f) = Promise::<String>::new();
    p.skip();
    assert_eq!(f.state(), PromiseState::Skipped);
    assert_eq!(f.result(), Err(CallError::Skipped));
}

#[test]
fn dropped_promise_abandons() {
    let (p, f) = Promise::<()>::new();
    drop(p);
    assert_eq!(f.state(), PromiseState::Abandoned);
    assert_eq!(f.result(), Err(CallError::Abandoned));
}

#[test]
fn result_blocks_until_finished_elsewhere() {
    let (mut p, f) = Promise::new();
    let writer = std::thread::spawn(move || {
        p.start();
        std::thread::sleep(Duration::from_millis(20));
        p.finish(vec![1, 2, 3]);
    });
    assert_eq!(f.result(), Ok(vec![1, 2, 3]));
    writer.join().unwrap();
}

#[test]
fn wait_timeout_on_pending() {
    let (p, f) = Promise::<u8>::new();
    assert!(!f.wait_timeout(Duration::from_millis(10)));
    p.finish(1);
    assert!(f.wait_timeout(Duration::from_millis(10)));
    f.wait();
}

#[test]
fn then_runs_on_given_context() {
    let worker = LoopThread::spawn("then").unwrap();
    let (tx, rx) = mpsc::channel();

    // Registered before the promise finishes
    let (p, f) = Promise::<u32>::new();
    let tx1 = tx.clone();
    f.then(worker.context(), move |r| {
        let id = Context::current().map(|c| c.id());
        tx1.send((id, r)).unwrap();
    });
    p.finish(10);
    let (id, r) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(id, Some(worker.context().id()));
    assert_eq!(r, Ok(10));

    // Registered after the promise has finished
    let (p, f) = Promise::<u32>::new();
    p.skip();
    f.then(worker.context(), move |r| {
        let id = Context::current().map(|c| c.id());
        tx.send((id, r)).unwrap();
    });
    let (id, r) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(id, Some(worker.context().id()));
    assert_eq!(r, Err(CallError::Skipped));
}

#[test]
fn then_some_ignores_missing_values() {
    let worker = LoopThread::spawn("then_some").unwrap();
    let (tx, rx) = mpsc::channel();

    let (p, f) = Promise::<u32>::new();
    let tx1 = tx.clone();
    f.then_some(worker.context(), move |v| tx1.send(v).unwrap());
    p.skip();

    let (p, f) = Promise::<u32>::new();
    f.then_some(worker.context(), move |v| tx.send(v).unwrap());
    drop(p);

    // Anything the continuations were going to do is done by the
    // time a later call has run
    exec(worker.context(), None, || (), ()).unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn then_on_own_context_runs_inline() {
    let el = EventLoop::new();
    let (tx, rx) = mpsc::channel();
    let (p, f) = Promise::<u32>::new();
    p.finish(4);
    f.then(el.context(), move |r| tx.send(r).unwrap());
    assert_eq!(rx.try_recv(), Ok(Ok(4)));
}

#[test]
fn wait_timeout_without_limit() {
    let (p, f) = Promise::<u8>::new();
    p.finish(2);
    assert!(f.wait_timeout(Duration::MAX));

    let (mut p, f) = Promise::<u8>::new();
    let writer = std::thread::spawn(move || {
        p.start();
        std::thread::sleep(Duration::from_millis(20));
        p.finish(3);
    });
    assert!(f.wait_timeout(Duration::MAX));
    assert_eq!(f.result(), Ok(3));
    writer.join().unwrap();
}

#[test]
fn continuation_does_not_keep_context_alive() {
    let thread = LoopThread::new("then-unserviced");
    let marker = Arc::new(());
    let m = marker.clone();
    let (tx, rx) = mpsc::channel();
    let f = dispatch(thread.context(), None, move || drop(m), ());
    f.then(thread.context(), move |r| tx.send(r).unwrap());
    assert_eq!(Arc::strong_count(&marker), 2);

    // Dropping the context frees the queued call, and the continuation
    // is dropped unrun as its context has gone
    drop(thread);
    assert_eq!(Arc::strong_count(&marker), 1);
    assert!(rx.recv().is_err());
}
