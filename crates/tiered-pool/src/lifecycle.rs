//! Resource lifecycle collaborators.
//!
//! The pool never inspects the resources it holds. Construction and
//! permanent release are delegated to two caller-supplied seams:
//!
//! - [`Factory`] builds a new resource on a cache miss.
//! - [`Destructor`] tears a resource down when the pool discards it.
//!
//! Both are implemented for plain closures, so most callers never name
//! these traits directly:
//!
//! ```rust
//! use tiered_pool::Pool;
//!
//! let pool: Pool<String, std::io::Error> = Pool::builder()
//!     .factory(|| async { Ok(String::from("conn")) })
//!     .destructor(|conn: String| drop(conn))
//!     .build();
//! ```

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;

/// Boxed future returned by [`Factory::create`].
pub type CreateFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Constructs new resources on demand.
///
/// The pool calls this on every cache miss during acquisition. The call is
/// not interrupted by the pool; bounding a slow construction (for example
/// with `tokio::time::timeout`) is the implementor's responsibility.
pub trait Factory<T>: Send + Sync {
    /// Error returned when construction fails.
    type Error;

    /// Construct a new resource.
    fn create(&self) -> CreateFuture<'_, T, Self::Error>;
}

impl<T, E, F, Fut> Factory<T> for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    type Error = E;

    fn create(&self) -> CreateFuture<'_, T, E> {
        Box::pin(self())
    }
}

/// Permanently releases resources the pool discards.
///
/// Called for faulted resources, for releases that find both tiers full,
/// for surplus removed by the recycler, and for every idle resource at
/// shutdown. It must not block for long: it runs inline on the releasing
/// thread or on the recycler task.
pub trait Destructor<T>: Send + Sync {
    /// Tear the resource down.
    fn destroy(&self, resource: T);
}

impl<T, F> Destructor<T> for F
where
    F: Fn(T) + Send + Sync,
{
    fn destroy(&self, resource: T) {
        self(resource)
    }
}

/// Why the pool discarded a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiscardReason {
    /// The caller reported an error alongside the resource.
    Faulted,
    /// Both idle tiers were full.
    PoolFull,
    /// The recycler found no room for an overflow resident.
    Surplus,
    /// The pool was closed.
    Closed,
}

impl DiscardReason {
    /// Short label used in log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faulted => "faulted",
            Self::PoolFull => "pool_full",
            Self::Surplus => "surplus",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run a destructor, containing any panic it raises.
///
/// Destructor failures are never propagated to the releasing caller or the
/// recycler; they are logged and the resource is considered gone.
pub(crate) fn run_destructor<T>(
    destructor: Option<&dyn Destructor<T>>,
    resource: T,
    reason: DiscardReason,
) {
    match destructor {
        Some(destructor) => {
            if catch_unwind(AssertUnwindSafe(|| destructor.destroy(resource))).is_err() {
                tracing::error!(reason = %reason, "resource destructor panicked");
            }
        }
        None => {
            tracing::trace!(reason = %reason, "no destructor configured; dropping resource");
            drop(resource);
        }
    }
}
