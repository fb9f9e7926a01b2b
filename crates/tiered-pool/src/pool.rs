//! Two-tier resource pool implementation.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::config::PoolConfig;
use crate::error::{BoxError, PoolError};
use crate::lifecycle::{Destructor, DiscardReason, Factory, run_destructor};
use crate::metrics::{Counters, PoolMetrics};
use crate::queue::IdleQueue;
use crate::recycler::RecyclerHandle;

/// A pool of reusable resources.
///
/// Idle resources live in two bounded tiers. The primary tier holds up to
/// `min_idle` resources and is always filled first. The overflow tier holds
/// up to `max_idle - min_idle` more and is compacted by a background
/// recycler during quiet periods.
///
/// Acquisition never waits for a resource to be returned: when both tiers
/// are empty the factory builds a new one. Release never waits either:
/// when both tiers are full the resource is destroyed.
///
/// When both tiers hold resources, acquisition always takes from the
/// primary tier first.
///
/// `Pool` is a cheap handle; clones share the same state. Dropping the last
/// handle closes the pool.
pub struct Pool<T, E = BoxError> {
    inner: Arc<PoolInner<T, E>>,
}

pub(crate) struct PoolInner<T, E> {
    config: PoolConfig,
    factory: Option<Box<dyn Factory<T, Error = E>>>,
    destructor: Option<Arc<dyn Destructor<T>>>,
    tiers: OnceCell<Tiers<T>>,
    recycler: Mutex<Option<RecyclerHandle>>,
    closed: AtomicBool,
    counters: Counters,
}

struct Tiers<T> {
    primary: IdleQueue<T>,
    overflow: IdleQueue<T>,
}

impl<T> Tiers<T> {
    fn new(config: &PoolConfig) -> Self {
        Self {
            primary: IdleQueue::new(config.min_idle),
            overflow: IdleQueue::new(config.overflow_capacity()),
        }
    }
}

/// Where a released resource ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    /// Stored in the primary tier.
    Primary,
    /// Stored in the overflow tier.
    Overflow,
    /// Passed to the destructor.
    Destroyed(DiscardReason),
    /// No resource was given.
    Ignored,
}

impl Released {
    /// Whether the resource is now idle in the pool.
    #[must_use]
    pub fn is_retained(&self) -> bool {
        matches!(self, Self::Primary | Self::Overflow)
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Idle resources in the primary tier.
    pub primary_idle: usize,
    /// Idle resources in the overflow tier.
    pub overflow_idle: usize,
    /// Primary tier capacity.
    pub min_idle: usize,
    /// Total idle capacity.
    pub max_idle: usize,
    /// Whether the pool has been closed.
    pub closed: bool,
}

impl PoolStatus {
    /// Idle resources across both tiers.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.primary_idle + self.overflow_idle
    }
}

impl<T, E> Pool<T, E>
where
    T: Send + 'static,
    E: 'static,
{
    /// Create a builder for a pool.
    pub fn builder() -> PoolBuilder<T, E> {
        PoolBuilder::new()
    }

    /// Create the idle tiers and start the recycler.
    ///
    /// Calling this is optional: the first [`acquire`](Self::acquire) or
    /// [`release`](Self::release) initializes the pool. Repeated or
    /// concurrent calls initialize it once.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] after [`close`](Self::close), and
    /// [`PoolError::NoRuntime`] if called outside a Tokio runtime.
    pub fn initialize(&self) -> Result<(), PoolError<E>> {
        if self.inner.is_closed() {
            return Err(PoolError::Closed);
        }
        self.inner.tiers().map(|_| ())
    }

    /// Take a resource from the pool, constructing one if none is idle.
    ///
    /// Tries the primary tier, then the overflow tier, then the factory.
    /// This never waits for another caller to release a resource.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Closed`] if the pool has been closed.
    /// - [`PoolError::Misconfigured`] if no factory was configured.
    /// - [`PoolError::Create`] with the factory's error if construction
    ///   failed. Nothing is cached in that case.
    pub async fn acquire(&self) -> Result<T, PoolError<E>> {
        let inner = &self.inner;
        if inner.is_closed() {
            return Err(PoolError::Closed);
        }

        let tiers = inner.tiers()?;
        let Some(factory) = inner.factory.as_deref() else {
            tracing::warn!("no factory configured for the pool");
            return Err(PoolError::Misconfigured("no factory configured".into()));
        };

        if let Some(resource) = tiers.primary.try_pop() {
            inner.counters.record_reused();
            tracing::trace!(tier = "primary", "acquired idle resource");
            return Ok(resource);
        }
        if let Some(resource) = tiers.overflow.try_pop() {
            inner.counters.record_reused();
            tracing::trace!(tier = "overflow", "acquired idle resource");
            return Ok(resource);
        }

        tracing::debug!("idle tiers empty; constructing resource");
        let resource = match factory.create().await {
            Ok(resource) => resource,
            Err(e) => {
                inner.counters.record_create_failure();
                tracing::debug!("resource construction failed");
                return Err(PoolError::Create(e));
            }
        };
        inner.counters.record_created();

        if inner.is_closed() {
            inner.destroy(resource, DiscardReason::Closed);
            return Err(PoolError::Closed);
        }
        Ok(resource)
    }

    /// Take a resource wrapped in a guard that releases it on drop.
    ///
    /// # Errors
    ///
    /// Same as [`acquire`](Self::acquire).
    pub async fn get(&self) -> Result<Pooled<T, E>, PoolError<E>> {
        let resource = self.acquire().await?;
        Ok(Pooled {
            resource: Some(resource),
            pool: Arc::downgrade(&self.inner),
            destructor: self.inner.destructor.clone(),
            faulted: false,
        })
    }

    /// Return a resource to the pool.
    ///
    /// - `None` is ignored.
    /// - If `last_error` is set the resource is known to be bad and is
    ///   destroyed, whatever the tiers hold.
    /// - Otherwise it goes to the primary tier, then the overflow tier, and
    ///   is destroyed if both are full.
    ///
    /// This never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] if the pool has been closed. The
    /// resource is destroyed rather than leaked.
    pub fn release(
        &self,
        resource: Option<T>,
        last_error: Option<&dyn std::error::Error>,
    ) -> Result<Released, PoolError<E>> {
        let Some(resource) = resource else {
            return Ok(Released::Ignored);
        };

        // A resource that did not come from `acquire` may arrive first.
        // Closed and faulted releases destroy without touching the tiers.
        if !self.inner.is_closed() && last_error.is_none() {
            if let Err(e) = self.inner.tiers() {
                self.inner.destroy(resource, DiscardReason::PoolFull);
                return Err(e);
            }
        }
        self.inner.check_in(resource, last_error)
    }

    /// Run one recycler pass now.
    ///
    /// Returns the number of overflow residents processed.
    pub fn recycle(&self) -> usize {
        let processed = self.inner.recycle_pass();
        if self.inner.is_closed() {
            self.inner.drain_idle();
        }
        processed
    }

    /// Close the pool.
    ///
    /// Marks the pool closed, stops the recycler and waits for it to exit,
    /// then destroys every idle resource. Calls made after this point fail
    /// with [`PoolError::Closed`]. Closing twice is a no-op.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let recycler = self.inner.recycler.lock().take();
        if let Some(recycler) = recycler {
            recycler.shutdown().await;
        }

        let destroyed = self.inner.drain_idle();
        tracing::info!(destroyed, "resource pool closed");
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Check if the idle tiers and recycler have been set up.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.tiers.get().is_some()
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let (primary_idle, overflow_idle) = self
            .inner
            .tiers
            .get()
            .map_or((0, 0), |t| (t.primary.len(), t.overflow.len()));

        PoolStatus {
            primary_idle,
            overflow_idle,
            min_idle: self.inner.config.min_idle,
            max_idle: self.inner.config.max_idle,
            closed: self.inner.is_closed(),
        }
    }

    /// Get a snapshot of the pool's lifetime counters.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        self.inner.counters.snapshot()
    }

    /// Get the normalized pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl<T, E> Clone for Pool<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Pool<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.inner.config)
            .field("initialized", &self.inner.tiers.get().is_some())
            .field("closed", &self.inner.is_closed())
            .finish_non_exhaustive()
    }
}

impl<T, E> PoolInner<T, E> {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn destroy(&self, resource: T, reason: DiscardReason) {
        tracing::trace!(reason = %reason, "destroying resource");
        run_destructor(self.destructor.as_deref(), resource, reason);
        self.counters.record_destroyed();
    }

    /// Destroy everything idle in both tiers.
    fn drain_idle(&self) -> usize {
        let Some(tiers) = self.tiers.get() else {
            return 0;
        };

        let mut destroyed = 0;
        for resource in tiers.primary.drain().chain(tiers.overflow.drain()) {
            self.destroy(resource, DiscardReason::Closed);
            destroyed += 1;
        }
        destroyed
    }

    /// Store or destroy a returned resource.
    fn check_in(
        &self,
        resource: T,
        last_error: Option<&dyn std::error::Error>,
    ) -> Result<Released, PoolError<E>> {
        if self.is_closed() {
            self.destroy(resource, DiscardReason::Closed);
            return Err(PoolError::Closed);
        }

        if let Some(error) = last_error {
            tracing::debug!(error = %error, "discarding faulted resource");
            self.destroy(resource, DiscardReason::Faulted);
            return Ok(Released::Destroyed(DiscardReason::Faulted));
        }

        let Some(tiers) = self.tiers.get() else {
            self.destroy(resource, DiscardReason::PoolFull);
            return Ok(Released::Destroyed(DiscardReason::PoolFull));
        };

        let released = match tiers.primary.try_push(resource) {
            Ok(()) => Released::Primary,
            Err(resource) => match tiers.overflow.try_push(resource) {
                Ok(()) => Released::Overflow,
                Err(resource) => {
                    self.destroy(resource, DiscardReason::PoolFull);
                    return Ok(Released::Destroyed(DiscardReason::PoolFull));
                }
            },
        };

        // A close that raced past the check above may already have drained
        // the tiers; drain again so nothing is stranded.
        if self.is_closed() {
            self.drain_idle();
            return Err(PoolError::Closed);
        }

        self.counters.record_released();
        tracing::trace!(tier = ?released, "released resource");
        Ok(released)
    }

    /// One compaction pass over the overflow tier.
    pub(crate) fn recycle_pass(&self) -> usize {
        let Some(tiers) = self.tiers.get() else {
            return 0;
        };

        // Bounded by the occupancy at pass start so concurrent releases
        // cannot keep the pass running.
        let pending = tiers.overflow.len();
        let mut moved = 0;
        let mut destroyed = 0;

        for resource in tiers.overflow.drain().take(pending) {
            match tiers.primary.try_push(resource) {
                Ok(()) => {
                    self.counters.record_recycled();
                    moved += 1;
                }
                Err(resource) => {
                    self.destroy(resource, DiscardReason::Surplus);
                    destroyed += 1;
                }
            }
        }

        if moved + destroyed > 0 {
            tracing::debug!(moved, destroyed, "recycled overflow tier");
        }
        moved + destroyed
    }
}

impl<T, E> PoolInner<T, E>
where
    T: Send + 'static,
    E: 'static,
{
    /// Get the tiers, creating them and starting the recycler on first use.
    fn tiers(self: &Arc<Self>) -> Result<&Tiers<T>, PoolError<E>> {
        self.tiers.get_or_try_init(|| {
            let runtime =
                tokio::runtime::Handle::try_current().map_err(|_| PoolError::NoRuntime)?;
            let recycler = RecyclerHandle::spawn(
                &runtime,
                Arc::downgrade(self),
                self.config.recycle_interval,
            );

            // Checked under the lock so a concurrent close either takes this
            // handle or sees it already stopped.
            let mut slot = self.recycler.lock();
            if self.is_closed() {
                recycler.stop();
            }
            *slot = Some(recycler);

            tracing::debug!(
                min_idle = self.config.min_idle,
                max_idle = self.config.max_idle,
                "resource pool initialized"
            );
            Ok(Tiers::new(&self.config))
        })
    }
}

impl<T, E> Drop for PoolInner<T, E> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(recycler) = self.recycler.get_mut().take() {
            recycler.abort();
        }
        let destroyed = self.drain_idle();
        if destroyed > 0 {
            tracing::debug!(destroyed, "resource pool dropped");
        }
    }
}

/// Builder for [`Pool`].
#[must_use = "builder does nothing itself, use `.build()` to build it"]
pub struct PoolBuilder<T, E = BoxError> {
    config: PoolConfig,
    factory: Option<Box<dyn Factory<T, Error = E>>>,
    destructor: Option<Arc<dyn Destructor<T>>>,
}

impl<T, E> PoolBuilder<T, E>
where
    T: Send + 'static,
    E: 'static,
{
    fn new() -> Self {
        Self {
            config: PoolConfig::default(),
            factory: None,
            destructor: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the primary tier capacity.
    pub fn min_idle(mut self, count: usize) -> Self {
        self.config.min_idle = count;
        self
    }

    /// Set the total idle capacity.
    pub fn max_idle(mut self, count: usize) -> Self {
        self.config.max_idle = count;
        self
    }

    /// Set the recycler period.
    pub fn recycle_interval(mut self, interval: Duration) -> Self {
        self.config.recycle_interval = interval;
        self
    }

    /// Set the resource factory.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Factory<T, Error = E> + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Set the resource destructor.
    ///
    /// Without one, discarded resources are simply dropped.
    pub fn destructor<D>(mut self, destructor: D) -> Self
    where
        D: Destructor<T> + 'static,
    {
        self.destructor = Some(Arc::new(destructor));
        self
    }

    /// Build the pool.
    ///
    /// Nothing is allocated or spawned until the pool is first used or
    /// [`Pool::initialize`] is called.
    pub fn build(self) -> Pool<T, E> {
        Pool {
            inner: Arc::new(PoolInner {
                config: self.config.normalized(),
                factory: self.factory,
                destructor: self.destructor,
                tiers: OnceCell::new(),
                recycler: Mutex::new(None),
                closed: AtomicBool::new(false),
                counters: Counters::default(),
            }),
        }
    }
}

impl<T, E> fmt::Debug for PoolBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("config", &self.config)
            .field("factory", &self.factory.is_some())
            .field("destructor", &self.destructor.is_some())
            .finish()
    }
}

/// Marker error used when a guard's holder reports the resource as bad.
#[derive(Debug, thiserror::Error)]
#[error("resource marked faulted by its holder")]
struct MarkedFaulted;

/// A resource borrowed from a [`Pool`].
///
/// Dereferences to the resource. When dropped the resource is released
/// back to the pool, or destroyed if it was marked faulted or the pool is
/// gone.
#[must_use]
pub struct Pooled<T, E = BoxError> {
    resource: Option<T>,
    pool: Weak<PoolInner<T, E>>,
    destructor: Option<Arc<dyn Destructor<T>>>,
    faulted: bool,
}

impl<T, E> Pooled<T, E> {
    /// Mark the resource as bad so it is destroyed instead of reused.
    pub fn mark_faulted(&mut self) {
        self.faulted = true;
    }

    /// Whether the resource has been marked bad.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Take the resource out of pool management.
    ///
    /// The pool will neither reuse nor destroy it.
    #[allow(clippy::expect_used)] // present until the guard is consumed
    pub fn detach(mut self) -> T {
        self.resource.take().expect("pooled resource already taken")
    }

    /// Release the resource now and report where it went.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] if the pool has been closed or dropped.
    /// The resource is destroyed in that case.
    pub fn release(mut self) -> Result<Released, PoolError<E>> {
        self.give_back()
    }

    fn give_back(&mut self) -> Result<Released, PoolError<E>> {
        let Some(resource) = self.resource.take() else {
            return Ok(Released::Ignored);
        };
        let Some(pool) = self.pool.upgrade() else {
            tracing::trace!("pool dropped before resource was released");
            run_destructor(self.destructor.as_deref(), resource, DiscardReason::Closed);
            return Err(PoolError::Closed);
        };

        let fault = self.faulted.then_some(MarkedFaulted);
        pool.check_in(resource, fault.as_ref().map(|e| e as &dyn std::error::Error))
    }
}

impl<T, E> Deref for Pooled<T, E> {
    type Target = T;

    #[allow(clippy::expect_used)] // present until the guard is consumed
    fn deref(&self) -> &T {
        self.resource.as_ref().expect("pooled resource already taken")
    }
}

impl<T, E> DerefMut for Pooled<T, E> {
    #[allow(clippy::expect_used)] // present until the guard is consumed
    fn deref_mut(&mut self) -> &mut T {
        self.resource.as_mut().expect("pooled resource already taken")
    }
}

impl<T, E> Drop for Pooled<T, E> {
    fn drop(&mut self) {
        if self.give_back().is_err() {
            tracing::trace!("guard dropped after pool shutdown");
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Pooled<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("resource", &self.resource)
            .field("faulted", &self.faulted)
            .finish()
    }
}
