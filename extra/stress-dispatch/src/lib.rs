use std::sync::atomic::{AtomicUsize, Ordering};

/// Get the numeric command-line argument at `index`, or `default` if
/// it is absent
pub fn arg_or(index: usize, default: usize) -> usize {
    match std::env::args().nth(index) {
        None => default,
        Some(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("Argument {} is not a number: {:?}", index, v)),
    }
}

/// Counts of how dispatched calls were resolved
#[derive(Default)]
pub struct Tally {
    ran: AtomicUsize,
    skipped: AtomicUsize,
}

impl Tally {
    pub fn ran(&self) {
        self.ran.fetch_add(1, Ordering::Relaxed);
    }

    pub fn skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self, label: &str) {
        println!(
            "{}: RAN {} SKIPPED {}",
            label,
            self.ran.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed)
        );
    }
}
