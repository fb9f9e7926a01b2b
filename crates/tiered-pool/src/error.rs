//! Pool error types.

use thiserror::Error;

/// Boxed error used as the default factory error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during pool operations.
///
/// `E` is the error type produced by the pool's factory. Construction
/// failures are passed through unchanged in [`PoolError::Create`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError<E> {
    /// Pool is closed.
    #[error("pool is closed")]
    Closed,

    /// Pool is missing a required collaborator.
    #[error("pool is misconfigured: {0}")]
    Misconfigured(String),

    /// The factory failed to construct a resource.
    #[error("failed to create resource: {0}")]
    Create(#[source] E),

    /// Initialization needs a Tokio runtime to host the recycler.
    #[error("pool initialization requires a Tokio runtime")]
    NoRuntime,
}

impl<E> PoolError<E> {
    /// Check whether this error was caused by a closed pool.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Check whether this error was caused by a missing collaborator.
    #[must_use]
    pub fn is_misconfigured(&self) -> bool {
        matches!(self, Self::Misconfigured(_))
    }

    /// Extract the factory error, if this is one.
    pub fn into_create_error(self) -> Option<E> {
        match self {
            Self::Create(e) => Some(e),
            _ => None,
        }
    }
}
