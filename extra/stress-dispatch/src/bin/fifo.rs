//! Flood one worker with calls from several producer threads, and
//! check that each producer's calls ran in the order it made them.
//!
//! Usage: fifo [PRODUCERS [CALLS]]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use stress_dispatch::{arg_or, Tally};
use threadcall::{dispatch, LoopThread};

fn main() {
    let producers = arg_or(1, 8);
    let calls = arg_or(2, 100000);
    let worker = LoopThread::spawn("fifo").expect("Failed to start worker");
    let last = Arc::new(Mutex::new(vec![None::<usize>; producers]));
    let tally = Arc::new(Tally::default());
    let start = Instant::now();

    let handles: Vec<_> = (0..producers)
        .map(|p| {
            let ctx = worker.context().clone();
            let last = last.clone();
            let tally = tally.clone();
            thread::spawn(move || {
                let mut futures = Vec::with_capacity(calls);
                for i in 0..calls {
                    let last = last.clone();
                    futures.push(dispatch(
                        &ctx,
                        None,
                        move || {
                            let mut last = last.lock().expect("Lock poisoned");
                            if let Some(prev) = last[p] {
                                assert_eq!(prev + 1, i, "Producer {} out of order", p);
                            }
                            last[p] = Some(i);
                        },
                        (),
                    ));
                }
                for f in futures {
                    f.result().expect("Call did not run");
                    tally.ran();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("Producer panicked");
    }

    tally.report("fifo");
    println!("{} calls in {:?}", producers * calls, start.elapsed());
}
