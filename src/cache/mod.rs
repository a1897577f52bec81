//! Lazy-refresh connection info cache.
//!
//! [`LazyRefreshCache`] fetches connection info for one instance on demand and
//! serves it from memory until invalidated. Callers that miss the cache at the same
//! time share a single refresh.
//!
//! Primary types are re-exported at the crate root.

mod builder;
mod errors;
mod source;

pub use builder::{LazyRefreshCacheBuilder, StalePolicy, DEFAULT_REFRESH_TIMEOUT};
pub use errors::{BuildError, CacheError};
pub use source::{CacheStatus, LazyRefreshCache};
