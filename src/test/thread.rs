//! Test `LoopThread` lifecycle and `EventLoop`

use super::square;
use crate::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn builder_names_thread_and_context() {
    let worker = Builder::new().name("named").spawn().unwrap();
    assert_eq!(worker.context().name(), Some("named"));
    let name = exec(
        worker.context(),
        None,
        || std::thread::current().name().map(String::from),
        (),
    );
    assert_eq!(name, Ok(Some("named".to_string())));
}

#[test]
fn stack_size_is_applied() {
    let worker = Builder::new()
        .name("big-stack")
        .stack_size(4 * 1024 * 1024)
        .spawn()
        .unwrap();
    assert_eq!(exec(worker.context(), None, square, (12,)), Ok(144));
}

#[test]
fn start_twice_fails() {
    let mut worker = LoopThread::spawn("twice").unwrap();
    assert!(worker.is_running());
    match worker.start() {
        Err(LoopError::AlreadyStarted) => (),
        other => panic!("Unexpected start result: {:?}", other),
    }
    assert_eq!(
        LoopError::AlreadyStarted.to_string(),
        "loop thread has already been started"
    );
}

#[test]
fn state_follows_lifecycle() {
    let mut worker = LoopThread::new("lifecycle");
    assert_eq!(worker.context().state(), LoopState::Idle);
    worker.start().unwrap();
    assert_eq!(worker.context().state(), LoopState::Running);
    worker.quit();
    worker.join().unwrap();
    assert_eq!(worker.context().state(), LoopState::Stopped);
    assert!(!worker.is_running());
}

#[test]
fn quit_runs_earlier_calls_first() {
    let mut worker = LoopThread::spawn("drain").unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let futures: Vec<_> = (0..3)
        .map(|_| {
            let c = count.clone();
            dispatch(
                worker.context(),
                None,
                move || {
                    std::thread::sleep(Duration::from_millis(5));
                    c.fetch_add(1, Ordering::SeqCst);
                },
                (),
            )
        })
        .collect();
    worker.quit();
    worker.join().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert!(futures.iter().all(|f| f.is_finished()));
}

#[test]
fn calls_after_join_stay_queued() {
    let mut worker = LoopThread::spawn("joined").unwrap();
    worker.quit();
    worker.join().unwrap();
    let f = dispatch(worker.context(), None, square, (2,));
    assert!(!f.wait_timeout(Duration::from_millis(20)));
    assert_eq!(f.state(), PromiseState::Pending);
    assert_eq!(worker.context().pending(), 1);

    // Restarting picks up what was left behind
    worker.start().unwrap();
    assert_eq!(f.result(), Ok(4));
}

#[test]
fn drop_drains_queue_and_joins() {
    let worker = LoopThread::spawn("dropped").unwrap();
    let f = dispatch(
        worker.context(),
        None,
        || {
            std::thread::sleep(Duration::from_millis(20));
            square(9)
        },
        (),
    );
    drop(worker);
    assert!(f.is_finished());
    assert_eq!(f.result(), Ok(81));
}

#[test]
fn join_without_start_returns() {
    let mut worker = LoopThread::new("unstarted");
    worker.join().unwrap();
    assert_eq!(worker.context().state(), LoopState::Idle);
}

#[test]
fn event_loop_exec_until_quit() {
    let el = EventLoop::new();
    let ctx = el.context().clone();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let sender = std::thread::spawn(move || {
        let futures: Vec<_> = (0..5)
            .map(|_| {
                let c = c.clone();
                dispatch(&ctx, None, move || c.fetch_add(1, Ordering::SeqCst), ())
            })
            .collect();
        ctx.quit();
        futures
    });
    el.exec();
    let futures = sender.join().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 5);
    assert!(futures.iter().all(|f| f.is_finished()));
    assert!(el.context().is_running());
}
