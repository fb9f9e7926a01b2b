//! Overflow-tier compaction tests.
//!
//! Background passes are driven with Tokio's paused clock so the tests do
//! not wait for real time to pass.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use common::Harness;

const INTERVAL: Duration = Duration::from_secs(60);

/// Fill the pool so primary is full and overflow holds `overflow` resources.
async fn fill(h: &Harness, primary: usize, overflow: usize) {
    let resources = h.checkout(primary + overflow).await;
    h.release_all(resources);
    let status = h.pool.status();
    assert_eq!(status.primary_idle, primary);
    assert_eq!(status.overflow_idle, overflow);
}

// =============================================================================
// Manual passes
// =============================================================================

#[tokio::test]
async fn test_pass_destroys_overflow_when_primary_full() {
    let h = Harness::new(2, 5);
    fill(&h, 2, 3).await;

    let processed = h.pool.recycle();

    assert_eq!(processed, 3);
    let status = h.pool.status();
    assert_eq!(status.primary_idle, 2);
    assert_eq!(status.overflow_idle, 0);

    let mut destroyed = h.destroyed();
    destroyed.sort();
    assert_eq!(destroyed, vec!["r3", "r4", "r5"]);
}

#[tokio::test]
async fn test_pass_moves_overflow_into_free_primary_slots() {
    let h = Harness::new(3, 6);
    fill(&h, 3, 3).await;

    // Free two primary slots: acquire takes from primary first.
    let held = h.checkout(2).await;
    assert_eq!(h.pool.status().primary_idle, 1);

    h.pool.recycle();

    // min(overflow=3, free primary=2) moved, remainder destroyed.
    let status = h.pool.status();
    assert_eq!(status.primary_idle, 3);
    assert_eq!(status.overflow_idle, 0);
    assert_eq!(h.destroyed().len(), 1);
    assert_eq!(h.pool.metrics().recycled, 2);

    drop(held);
}

#[tokio::test]
async fn test_pass_on_empty_overflow_is_noop() {
    let h = Harness::new(2, 4);
    fill(&h, 2, 0).await;

    assert_eq!(h.pool.recycle(), 0);
    assert_eq!(h.pool.status().primary_idle, 2);
    assert!(h.destroyed().is_empty());
}

#[tokio::test]
async fn test_pass_on_uninitialized_pool() {
    let h = Harness::new(2, 4);

    assert_eq!(h.pool.recycle(), 0);
    assert!(!h.pool.is_initialized());
}

#[tokio::test]
async fn test_repeated_passes_converge_to_min_footprint() {
    let h = Harness::new(2, 6);
    fill(&h, 2, 4).await;

    for _ in 0..3 {
        h.pool.recycle();
    }

    let status = h.pool.status();
    assert_eq!(status.overflow_idle, 0);
    assert_eq!(status.idle(), status.min_idle);
}

// =============================================================================
// Background task
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_background_pass_runs_each_interval() {
    let h = Harness::with_interval(1, 4, INTERVAL);
    fill(&h, 1, 3).await;

    // Nothing happens before the first period elapses.
    tokio::time::sleep(INTERVAL / 2).await;
    assert_eq!(h.pool.status().overflow_idle, 3);

    tokio::time::sleep(INTERVAL).await;
    tokio::task::yield_now().await;

    let status = h.pool.status();
    assert_eq!(status.primary_idle, 1);
    assert_eq!(status.overflow_idle, 0);
    assert_eq!(h.destroyed().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_background_pass_refills_primary() {
    let h = Harness::with_interval(2, 4, INTERVAL);
    fill(&h, 2, 2).await;
    let held = h.checkout(2).await;
    assert_eq!(h.pool.status().primary_idle, 0);

    tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
    tokio::task::yield_now().await;

    let status = h.pool.status();
    assert_eq!(status.primary_idle, 2);
    assert_eq!(status.overflow_idle, 0);
    assert!(h.destroyed().is_empty());

    h.release_all(held);
}

#[tokio::test(start_paused = true)]
async fn test_recycler_stops_after_close() {
    let h = Harness::with_interval(1, 3, INTERVAL);
    fill(&h, 1, 2).await;

    h.pool.close().await;
    let destroyed_at_close = h.destroyed().len();
    assert_eq!(destroyed_at_close, 3);

    tokio::time::sleep(INTERVAL * 3).await;
    tokio::task::yield_now().await;

    assert_eq!(h.destroyed().len(), destroyed_at_close);
    assert_eq!(h.pool.metrics().destroyed, 3);
}

#[tokio::test(start_paused = true)]
async fn test_recycler_does_not_keep_pool_alive() {
    let h = Harness::with_interval(1, 3, INTERVAL);
    fill(&h, 1, 2).await;
    let graveyard = h.graveyard();

    drop(h);
    assert_eq!(graveyard.lock().len(), 3);

    tokio::time::sleep(INTERVAL * 2).await;
    tokio::task::yield_now().await;
    assert_eq!(graveyard.lock().len(), 3);
}
