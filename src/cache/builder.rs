use super::errors::BuildError;
use super::source::{CacheParts, LazyRefreshCache};
use crate::admin::AdminApiClient;
use crate::instance::InstanceUri;
use crate::key::{KeyConfig, KeyMaterial};
use crate::logging::{FacadeLogger, Logger};
use crate::metrics::{MetricRecorder, NullMetricRecorder};
use crate::refresh::Refresher;
use std::fmt::Debug;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single refresh attempt.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(60);

/// When to drop a cached value after refreshes keep failing.
///
/// A failed refresh never replaces the cached value. With the default policy the
/// value is kept indefinitely; setting `max_consecutive_failures` evicts it once
/// that many refreshes in a row have failed.
///
/// # Examples
///
/// ```rust
/// use alloydb_connector::StalePolicy;
/// use std::num::NonZeroU32;
///
/// let keep = StalePolicy::default();
/// assert_eq!(keep.max_consecutive_failures, None);
///
/// let evict = StalePolicy::evict_after(NonZeroU32::new(3).unwrap());
/// assert_eq!(evict.max_consecutive_failures.map(NonZeroU32::get), Some(3));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StalePolicy {
    /// Failures in a row after which the cached value is evicted.
    ///
    /// `None` means never evict.
    pub max_consecutive_failures: Option<NonZeroU32>,
}

impl StalePolicy {
    /// Never evicts the cached value.
    pub const fn never_evict() -> Self {
        Self {
            max_consecutive_failures: None,
        }
    }

    /// Evicts the cached value after `failures` consecutive refresh failures.
    pub const fn evict_after(failures: NonZeroU32) -> Self {
        Self {
            max_consecutive_failures: Some(failures),
        }
    }

    pub(crate) fn should_evict(&self, consecutive_failures: u32) -> bool {
        self.max_consecutive_failures
            .is_some_and(|max| consecutive_failures >= max.get())
    }
}

/// Builder for [`LazyRefreshCache`].
///
/// Only the instance and the admin API client are required.
///
/// | Option | Default |
/// |---|---|
/// | [`logger`](Self::logger) | [`FacadeLogger`] |
/// | [`signing_key`](Self::signing_key) | generated ECDSA P-256 |
/// | [`refresh_timeout`](Self::refresh_timeout) | 60 seconds |
/// | [`dialer_id`](Self::dialer_id) | empty |
/// | [`disable_metadata_exchange`](Self::disable_metadata_exchange) | `false` |
/// | [`user_agent`](Self::user_agent) | empty |
/// | [`metric_recorder`](Self::metric_recorder) | [`NullMetricRecorder`] |
/// | [`refresh_buffer`](Self::refresh_buffer) | none |
/// | [`stale_policy`](Self::stale_policy) | never evict |
///
/// # Example
///
/// ```no_run
/// use alloydb_connector::{AdminApiClient, InstanceUri, KeyAlgorithm, KeyConfig, LazyRefreshCache};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example(client: Arc<dyn AdminApiClient>) -> Result<(), Box<dyn std::error::Error>> {
/// let instance: InstanceUri =
///     "projects/my-project/locations/my-region/clusters/my-cluster/instances/my-instance".parse()?;
///
/// let cache = LazyRefreshCache::builder(instance, client)
///     .signing_key(KeyConfig::Generate(KeyAlgorithm::EcdsaP384))
///     .refresh_timeout(Duration::from_secs(30))
///     .user_agent("my-app/1.0")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct LazyRefreshCacheBuilder {
    instance: InstanceUri,
    client: Arc<dyn AdminApiClient>,
    logger: Arc<dyn Logger>,
    key: KeyConfig,
    refresh_timeout: Duration,
    dialer_id: String,
    disable_metadata_exchange: bool,
    user_agent: String,
    recorder: Arc<dyn MetricRecorder>,
    refresh_buffer: Option<Duration>,
    stale_policy: StalePolicy,
}

impl Debug for LazyRefreshCacheBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyRefreshCacheBuilder")
            .field("instance", &self.instance)
            .field("client", &"<AdminApiClient>")
            .field("logger", &"<Logger>")
            .field("key", &self.key)
            .field("refresh_timeout", &self.refresh_timeout)
            .field("dialer_id", &self.dialer_id)
            .field("disable_metadata_exchange", &self.disable_metadata_exchange)
            .field("user_agent", &self.user_agent)
            .field("recorder", &"<MetricRecorder>")
            .field("refresh_buffer", &self.refresh_buffer)
            .field("stale_policy", &self.stale_policy)
            .finish()
    }
}

impl LazyRefreshCacheBuilder {
    /// Creates a builder with default settings.
    pub fn new(instance: InstanceUri, client: Arc<dyn AdminApiClient>) -> Self {
        Self {
            instance,
            client,
            logger: Arc::new(FacadeLogger),
            key: KeyConfig::default(),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            dialer_id: String::new(),
            disable_metadata_exchange: false,
            user_agent: String::new(),
            recorder: Arc::new(NullMetricRecorder),
            refresh_buffer: None,
            stale_policy: StalePolicy::default(),
        }
    }

    /// Sets the diagnostic sink.
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Sets how the client key pair is produced.
    #[must_use]
    pub fn signing_key(mut self, key: KeyConfig) -> Self {
        self.key = key;
        self
    }

    /// Bounds how long a single refresh may run before it fails with
    /// [`RefreshError::Timeout`](crate::RefreshError::Timeout).
    #[must_use]
    pub const fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Sets an identifier for the dialer that owns this cache. Used in logs only.
    #[must_use]
    pub fn dialer_id(mut self, dialer_id: impl Into<String>) -> Self {
        self.dialer_id = dialer_id.into();
        self
    }

    /// Stops asking the server to use metadata exchange on new connections.
    #[must_use]
    pub const fn disable_metadata_exchange(mut self, disable: bool) -> Self {
        self.disable_metadata_exchange = disable;
        self
    }

    /// Sets the user agent tag attached to refresh metrics.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the refresh metric sink.
    #[must_use]
    pub fn metric_recorder(mut self, recorder: Arc<dyn MetricRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Treats a cached value as stale once its certificate expires within `buffer`.
    ///
    /// Off by default: cached values are served until invalidated.
    #[must_use]
    pub const fn refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = Some(buffer);
        self
    }

    /// Sets the eviction policy applied after consecutive refresh failures.
    #[must_use]
    pub const fn stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    /// Produces the key pair and builds the cache.
    ///
    /// No admin API call is made until the first
    /// [`connection_info`](LazyRefreshCache::connection_info).
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Key`] if the key pair cannot be generated or loaded.
    pub fn build(self) -> Result<LazyRefreshCache, BuildError> {
        let key = KeyMaterial::from_config(&self.key)?;

        let refresher = Refresher {
            instance: self.instance,
            client: self.client,
            key,
            timeout: self.refresh_timeout,
            dialer_id: self.dialer_id,
            use_metadata_exchange: !self.disable_metadata_exchange,
            logger: Arc::clone(&self.logger),
        };

        Ok(LazyRefreshCache::from_parts(CacheParts {
            refresher,
            recorder: self.recorder,
            logger: self.logger,
            user_agent: self.user_agent,
            stale_policy: self.stale_policy,
            refresh_buffer: self.refresh_buffer,
        }))
    }
}
