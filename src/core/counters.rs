use crate::domain::model::RunSummary;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide counters. Any stage may bump them; `snapshot` can be read at
/// any time and is final once every stage has returned.
#[derive(Debug, Default)]
pub struct RunCounters {
    total: AtomicU64,
    valid: AtomicU64,
    invalid: AtomicU64,
    processed: AtomicU64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one domain accepted from the input, returning the new total.
    pub fn record_input(&self) -> u64 {
        self.total.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Counts one classified result, returning how many have been processed.
    pub fn record_result(&self, valid: bool) -> u64 {
        if valid {
            self.valid.fetch_add(1, Ordering::Relaxed);
        } else {
            self.invalid.fetch_add(1, Ordering::Relaxed);
        }
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            total: self.total(),
            valid_count: self.valid.load(Ordering::Relaxed),
            invalid_count: self.invalid.load(Ordering::Relaxed),
        }
    }
}
