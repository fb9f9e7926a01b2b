//! # tiered-pool
//!
//! A generic pool that amortizes the cost of building expensive reusable
//! resources, such as network clients, across many concurrent consumers.
//!
//! ## Design
//!
//! - Two bounded idle tiers: a primary tier of `min_idle` resources that is
//!   always filled first, and an overflow tier absorbing up to
//!   `max_idle - min_idle` more under load
//! - Lazy initialization on first use, guarded so it happens once
//! - Acquisition never waits: primary tier, then overflow tier, then the
//!   caller's factory
//! - Release never waits: resources reported as faulted are destroyed, and
//!   so is anything that finds both tiers full
//! - A background recycler periodically drains the overflow tier, shrinking
//!   the pool back toward `min_idle` when load subsides
//!
//! The pool only bounds *idle* resources. It does not track or limit
//! resources that are checked out.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tiered_pool::{Pool, PoolConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool: Pool<Vec<u8>, std::io::Error> = Pool::builder()
//!     .config(
//!         PoolConfig::new()
//!             .min_idle(5)
//!             .max_idle(20)
//!             .recycle_interval(Duration::from_secs(300)),
//!     )
//!     .factory(|| async { Ok(Vec::with_capacity(4096)) })
//!     .destructor(|buf: Vec<u8>| drop(buf))
//!     .build();
//!
//! let buf = pool.acquire().await?;
//! // Use the resource...
//! pool.release(Some(buf), None)?;
//!
//! // Or let a guard hand it back on drop.
//! let buf = pool.get().await?;
//! assert!(buf.capacity() >= 4096);
//! drop(buf);
//!
//! pool.close().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod pool;
pub mod queue;
mod recycler;

pub use config::PoolConfig;
pub use error::{BoxError, PoolError};
pub use lifecycle::{Destructor, DiscardReason, Factory};
pub use metrics::PoolMetrics;
pub use pool::{Pool, PoolBuilder, PoolStatus, Pooled, Released};
pub use queue::IdleQueue;
