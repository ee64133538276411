//! Race destruction of a liveness owner against calls guarded by it.
//!
//! Each round hands the only strong reference of a fresh owner to a
//! dropper thread, and at the same moment dispatches a guarded call
//! to a worker.  Either the call is skipped, or it runs with the owner
//! still alive.  A call that runs and finds the owner gone is a bug,
//! and panics.
//!
//! What we want to see in the output is a good mix of RAN and SKIPPED.
//! If one side dominates, adjust the spin count, which will depend on
//! the CPU and on debug or release builds.
//!
//! Usage: guard_race [ROUNDS [SPIN]]

use std::sync::{mpsc, Arc};
use std::thread;
use stress_dispatch::{arg_or, Tally};
use threadcall::{dispatch, CallError, LoopThread};

struct Owner(usize);

fn main() {
    let rounds = arg_or(1, 100000);
    let spin = arg_or(2, 200);
    let worker = LoopThread::spawn("guard-race").expect("Failed to start worker");
    let tally = Tally::default();

    let (tx, rx) = mpsc::channel::<Arc<Owner>>();
    let dropper = thread::spawn(move || {
        for owner in rx {
            for _ in 0..spin {
                std::hint::spin_loop();
            }
            drop(owner);
        }
    });

    let mut futures = Vec::with_capacity(1000);
    for round in 0..rounds {
        let owner = Arc::new(Owner(round));
        let weak = Arc::downgrade(&owner);
        let future = dispatch(
            worker.context(),
            Some(&owner),
            move || match weak.upgrade() {
                Some(o) => o.0,
                None => panic!("Call ran after its owner was destroyed"),
            },
            (),
        );
        tx.send(owner).expect("Dropper thread went away");
        futures.push((round, future));

        if futures.len() == futures.capacity() {
            for (round, future) in futures.drain(..) {
                match future.result() {
                    Ok(v) => {
                        assert_eq!(v, round);
                        tally.ran();
                    }
                    Err(CallError::Skipped) => tally.skipped(),
                    Err(e) => panic!("Unexpected outcome for round {}: {}", round, e),
                }
            }
        }
    }
    for (round, future) in futures {
        match future.result() {
            Ok(v) => {
                assert_eq!(v, round);
                tally.ran();
            }
            Err(CallError::Skipped) => tally.skipped(),
            Err(e) => panic!("Unexpected outcome for round {}: {}", round, e),
        }
    }

    drop(tx);
    dropper.join().expect("Dropper thread panicked");
    tally.report("guard_race");
}
