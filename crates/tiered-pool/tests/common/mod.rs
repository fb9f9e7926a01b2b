//! Shared helpers for pool integration tests.

#![allow(dead_code, clippy::expect_used)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tiered_pool::Pool;

/// A pool of string ids ("r1", "r2", ...) that records every factory call
/// and every destroyed resource.
pub struct Harness {
    pub pool: Pool<String, io::Error>,
    created: Arc<AtomicUsize>,
    destroyed: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    pub fn new(min_idle: usize, max_idle: usize) -> Self {
        Self::with_interval(min_idle, max_idle, Duration::from_secs(30 * 60))
    }

    pub fn with_interval(min_idle: usize, max_idle: usize, interval: Duration) -> Self {
        let created = Arc::new(AtomicUsize::new(0));
        let destroyed = Arc::new(Mutex::new(Vec::new()));

        let counter = created.clone();
        let graveyard = destroyed.clone();
        let pool = Pool::builder()
            .min_idle(min_idle)
            .max_idle(max_idle)
            .recycle_interval(interval)
            .factory(move || {
                let id = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(format!("r{id}")) }
            })
            .destructor(move |resource: String| graveyard.lock().push(resource))
            .build();

        Self {
            pool,
            created,
            destroyed,
        }
    }

    /// Number of factory calls so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Resources passed to the destructor, in order.
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().clone()
    }

    /// Shared handle on the destroyed list that outlives the harness.
    pub fn graveyard(&self) -> Arc<Mutex<Vec<String>>> {
        self.destroyed.clone()
    }

    /// Check out `n` resources at once.
    pub async fn checkout(&self, n: usize) -> Vec<String> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.pool.acquire().await.expect("acquire failed"));
        }
        out
    }

    /// Release every resource without an error.
    pub fn release_all(&self, resources: Vec<String>) {
        for resource in resources {
            self.pool
                .release(Some(resource), None)
                .expect("release failed");
        }
    }
}

/// Error used to report a resource as broken.
pub fn broken() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "connection reset")
}
