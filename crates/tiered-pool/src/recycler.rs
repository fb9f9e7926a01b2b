//! Background compaction of the overflow tier.
//!
//! Under load, released resources spill from the primary tier into the
//! overflow tier. Once the load is gone those extra residents are dead
//! weight, so a background task periodically drains the overflow tier:
//! each resident moves into the primary tier if there is room and is
//! destroyed otherwise. Repeated idle passes converge the overflow tier to
//! empty and the pool to its `min_idle` footprint.
//!
//! The task only holds a [`Weak`] reference to the pool. It exits when the
//! pool is closed, when the stop signal fires, or when the last pool handle
//! has been dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::pool::PoolInner;

/// Owner side of a running recycler task.
#[derive(Debug)]
pub(crate) struct RecyclerHandle {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl RecyclerHandle {
    /// Spawn the recycler for `pool` on `runtime`.
    pub(crate) fn spawn<T, E>(
        runtime: &Handle,
        pool: Weak<PoolInner<T, E>>,
        period: Duration,
    ) -> Self
    where
        T: Send + 'static,
        E: 'static,
    {
        let stop = Arc::new(Notify::new());
        let task = runtime.spawn(run(pool, stop.clone(), period));
        tracing::debug!(period = ?period, "recycler started");
        Self { stop, task }
    }

    /// Ask the task to exit at its next wakeup.
    ///
    /// The signal is latched, so it is not lost if the task is in the middle
    /// of a pass.
    pub(crate) fn stop(&self) {
        self.stop.notify_one();
    }

    /// Stop the task and wait until it has exited.
    pub(crate) async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::error!("recycler task panicked");
            }
        }
    }

    /// Stop the task without waiting for it.
    pub(crate) fn abort(self) {
        self.stop();
        self.task.abort();
    }
}

async fn run<T, E>(pool: Weak<PoolInner<T, E>>, stop: Arc<Notify>, period: Duration)
where
    T: Send + 'static,
    E: 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = stop.notified() => break,
            _ = ticker.tick() => {}
        }

        // Upgrade only for the duration of a pass.
        let Some(pool) = pool.upgrade() else {
            break;
        };
        if pool.is_closed() {
            break;
        }
        pool.recycle_pass();
    }

    tracing::debug!("recycler stopped");
}
