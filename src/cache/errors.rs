use crate::instance::InstanceUriError;
use crate::key::KeyError;
use crate::refresh::RefreshError;
use thiserror::Error;

/// Errors returned by [`LazyRefreshCache::connection_info`](super::LazyRefreshCache::connection_info).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CacheError {
    /// The refresh this call waited on failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// The caller's cancellation token fired before the refresh completed.
    ///
    /// Local to the cancelled caller; the refresh keeps running for others.
    #[error("wait for connection info was cancelled")]
    Cancelled,

    /// The cache has been closed.
    #[error("connection info cache is closed")]
    Closed,
}

/// Errors returned while constructing a [`LazyRefreshCache`](super::LazyRefreshCache).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The instance URI could not be parsed.
    #[error("invalid instance URI: {0}")]
    InvalidInstanceUri(#[from] InstanceUriError),

    /// The signing key could not be generated or loaded.
    #[error("failed to prepare signing key: {0}")]
    Key(#[from] KeyError),
}
