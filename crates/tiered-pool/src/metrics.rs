//! Pool lifetime counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of pool activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct PoolMetrics {
    /// Resources built by the factory.
    pub created: u64,
    /// Factory calls that returned an error.
    pub create_failures: u64,
    /// Acquisitions served from an idle tier.
    pub reused: u64,
    /// Resources accepted back into an idle tier.
    pub released: u64,
    /// Resources passed to the destructor.
    pub destroyed: u64,
    /// Overflow residents the recycler moved into the primary tier.
    pub recycled: u64,
}

impl PoolMetrics {
    /// Acquisitions that hit either idle tier, as a fraction of all
    /// successful acquisitions.
    #[must_use]
    pub fn reuse_ratio(&self) -> f64 {
        let total = self.created + self.reused;
        if total == 0 {
            0.0
        } else {
            self.reused as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    created: AtomicU64,
    create_failures: AtomicU64,
    reused: AtomicU64,
    released: AtomicU64,
    destroyed: AtomicU64,
    recycled: AtomicU64,
}

impl Counters {
    pub(crate) fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_create_failure(&self) {
        self.create_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reused(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_destroyed(&self) {
        self.destroyed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_recycled(&self) {
        self.recycled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolMetrics {
        PoolMetrics {
            created: self.created.load(Ordering::Relaxed),
            create_failures: self.create_failures.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
        }
    }
}
