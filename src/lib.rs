#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

//! Client-side connection info for managed database instances.
//!
//! Connecting to an instance over mutual TLS needs a short-lived client certificate
//! issued by the administrative API, the instance's CA certificate, and its IP
//! addresses. This crate fetches that material and caches it so dialers do not
//! have to manage certificates or control-plane calls themselves.
//!
//! The primary entry point is [`LazyRefreshCache`]. It fetches on first use, serves
//! the cached value until [`force_refresh`](LazyRefreshCache::force_refresh) is
//! called, and coalesces concurrent callers into a single refresh.
//!
//! ```no_run
//! use alloydb_connector::{AdminApiClient, IpType, LazyRefreshCache};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(client: Arc<dyn AdminApiClient>) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = LazyRefreshCache::builder_from_str(
//!     "projects/my-project/locations/my-region/clusters/my-cluster/instances/my-instance",
//!     client,
//! )?
//! .build()?;
//!
//! let info = cache.connection_info(&CancellationToken::new()).await?;
//! let addr = info.addr(IpType::Private)?;
//! let client_cert = info.client_certificate();
//! let client_key = info.client_key();
//! # Ok(())
//! # }
//! ```
//!
//! The transport to the administrative API is supplied by the caller through
//! [`AdminApiClient`].
//!
//! ## Features
//!
//! - **`logging`** (default): emit diagnostics through the `log` crate
//! - **`tracing`**: emit diagnostics through `tracing` instead

pub mod admin;
pub mod cache;
pub mod cert;
pub mod connection_info;
pub mod instance;
pub mod key;
pub mod logging;
pub mod metrics;
pub mod refresh;

pub(crate) mod observability;
pub(crate) mod prelude;

// -----------------------
// Re-exports
// -----------------------

pub use crate::{
    admin::{
        AdminApiClient, AdminApiError, CertificateRequest, ClientCertificateResponse,
        InstanceMetadata,
    },
    cache::{
        BuildError, CacheError, CacheStatus, LazyRefreshCache, LazyRefreshCacheBuilder,
        StalePolicy,
    },
    cert::{Certificate, CertificateError},
    connection_info::{ConnectionInfo, ConnectionInfoError, IpType},
    instance::{InstanceUri, InstanceUriError},
    key::{KeyAlgorithm, KeyConfig, KeyError, KeyMaterial, PrivateKey},
    logging::{FacadeLogger, Logger, NullLogger},
    metrics::{
        Attributes, MetricRecorder, MetricsError, NullMetricRecorder, PrometheusMetricRecorder,
        RefreshStatus, RefreshType,
    },
    refresh::{fetch_connection_info, RefreshError},
};
