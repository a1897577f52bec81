use super::builder::{LazyRefreshCacheBuilder, StalePolicy};
use super::errors::{BuildError, CacheError};
use crate::admin::AdminApiClient;
use crate::connection_info::ConnectionInfo;
use crate::instance::InstanceUri;
use crate::key::KeyConfig;
use crate::logging::Logger;
use crate::metrics::{Attributes, MetricRecorder, RefreshStatus, RefreshType};
use crate::refresh::{RefreshError, Refresher};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Result delivered to every waiter of a refresh attempt.
type Outcome = Result<Arc<ConnectionInfo>, CacheError>;

/// Point-in-time view of the cache, intended for health checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStatus {
    /// A successfully fetched value is held.
    pub cached: bool,
    /// The held value was invalidated by [`LazyRefreshCache::force_refresh`].
    pub invalidated: bool,
    /// A refresh attempt is in flight.
    pub refreshing: bool,
    /// Failed attempts since the last success.
    pub consecutive_failures: u32,
    /// The cache has been closed.
    pub closed: bool,
}

/// Lazily refreshed connection info for a single instance.
///
/// Values are fetched on first use and served from memory until invalidated with
/// [`force_refresh`](Self::force_refresh). Concurrent callers that miss the cache
/// share one refresh: exactly one pair of admin API calls is made and every caller
/// observes the same outcome.
///
/// The refresh runs on its own task. A caller that stops waiting (its token fires
/// or its future is dropped) does not affect other waiters or the refresh itself.
///
/// Cloning is cheap; clones share state. Closing any clone closes them all, and
/// dropping the last clone cancels an in-flight refresh.
///
/// # Example
///
/// ```no_run
/// use alloydb_connector::{AdminApiClient, LazyRefreshCache};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(client: Arc<dyn AdminApiClient>) -> Result<(), Box<dyn std::error::Error>> {
/// let cache = LazyRefreshCache::builder_from_str(
///     "projects/my-project/locations/my-region/clusters/my-cluster/instances/my-instance",
///     client,
/// )?
/// .user_agent("my-app/1.0")
/// .build()?;
///
/// let info = cache.connection_info(&CancellationToken::new()).await?;
/// println!("certificate expires at {}", info.expiration());
///
/// // The server rejected our certificate: fetch a new one on next use.
/// cache.force_refresh();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LazyRefreshCache {
    inner: Arc<Inner>,
}

struct Inner {
    shared: Arc<Shared>,
}

/// State reachable from both the handles and the refresh task.
struct Shared {
    state: Mutex<CacheState>,
    refresher: Refresher,
    recorder: Arc<dyn MetricRecorder>,
    logger: Arc<dyn Logger>,
    user_agent: String,
    stale_policy: StalePolicy,
    refresh_buffer: Option<Duration>,
    closed: AtomicBool,
    cancel: CancellationToken,
}

#[derive(Default)]
struct CacheState {
    last_good: Option<Arc<ConnectionInfo>>,
    invalidated: bool,
    in_flight: Option<RefreshAttempt>,
    consecutive_failures: u32,
    next_attempt_id: u64,
}

struct RefreshAttempt {
    id: u64,
    rx: watch::Receiver<Option<Outcome>>,
}

impl RefreshAttempt {
    /// An attempt whose task died without publishing can never resolve.
    fn is_live(&self) -> bool {
        self.rx.has_changed().is_ok()
    }
}

enum Lookup {
    Ready(Arc<ConnectionInfo>),
    Wait(watch::Receiver<Option<Outcome>>),
}

/// Settings collected by the builder.
pub(super) struct CacheParts {
    pub(super) refresher: Refresher,
    pub(super) recorder: Arc<dyn MetricRecorder>,
    pub(super) logger: Arc<dyn Logger>,
    pub(super) user_agent: String,
    pub(super) stale_policy: StalePolicy,
    pub(super) refresh_buffer: Option<Duration>,
}

impl LazyRefreshCache {
    /// Creates a cache with every setting given explicitly.
    ///
    /// Equivalent to the builder with all options set. The key pair is generated
    /// (or loaded) before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Key`] if the key pair cannot be produced.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instance: InstanceUri,
        logger: Arc<dyn Logger>,
        client: Arc<dyn AdminApiClient>,
        key: KeyConfig,
        refresh_timeout: Duration,
        dialer_id: impl Into<String>,
        disable_metadata_exchange: bool,
        user_agent: impl Into<String>,
        recorder: Arc<dyn MetricRecorder>,
    ) -> Result<Self, BuildError> {
        Self::builder(instance, client)
            .logger(logger)
            .signing_key(key)
            .refresh_timeout(refresh_timeout)
            .dialer_id(dialer_id)
            .disable_metadata_exchange(disable_metadata_exchange)
            .user_agent(user_agent)
            .metric_recorder(recorder)
            .build()
    }

    /// Returns a builder for a cache serving `instance`.
    pub fn builder(
        instance: InstanceUri,
        client: Arc<dyn AdminApiClient>,
    ) -> LazyRefreshCacheBuilder {
        LazyRefreshCacheBuilder::new(instance, client)
    }

    /// Parses `instance` and returns a builder for it.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidInstanceUri`] if `instance` is malformed.
    pub fn builder_from_str(
        instance: &str,
        client: Arc<dyn AdminApiClient>,
    ) -> Result<LazyRefreshCacheBuilder, BuildError> {
        let instance = InstanceUri::new(instance)?;
        Ok(Self::builder(instance, client))
    }

    pub(super) fn from_parts(parts: CacheParts) -> Self {
        let shared = Shared {
            state: Mutex::new(CacheState::default()),
            refresher: parts.refresher,
            recorder: parts.recorder,
            logger: parts.logger,
            user_agent: parts.user_agent,
            stale_policy: parts.stale_policy,
            refresh_buffer: parts.refresh_buffer,
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        };
        Self {
            inner: Arc::new(Inner {
                shared: Arc::new(shared),
            }),
        }
    }

    /// Returns connection info for the instance, refreshing if needed.
    ///
    /// A cached value that has not been invalidated is returned immediately. Otherwise
    /// the call joins the in-flight refresh or starts one, then waits for its outcome
    /// or for `cancel` to fire, whichever comes first.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Refresh`] if the refresh this call waited on failed. Every
    ///   waiter of that refresh receives an equal error.
    /// - [`CacheError::Cancelled`] if `cancel` fired first. The refresh continues.
    /// - [`CacheError::Closed`] if the cache is closed.
    pub async fn connection_info(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<ConnectionInfo>, CacheError> {
        let rx = match self.inner.shared.lookup()? {
            Lookup::Ready(info) => return Ok(info),
            Lookup::Wait(rx) => rx,
        };

        tokio::select! {
            biased;
            outcome = wait_for_outcome(rx) => outcome,
            () = cancel.cancelled() => Err(CacheError::Cancelled),
        }
    }

    /// Marks the cached value unusable so the next
    /// [`connection_info`](Self::connection_info) call refreshes.
    ///
    /// Never blocks on I/O and never cancels a refresh already in flight; the next
    /// caller joins that refresh instead of starting another. Has no effect when
    /// nothing is cached.
    pub fn force_refresh(&self) {
        let shared = &self.inner.shared;
        let invalidated = {
            let mut state = shared.lock_state();
            let invalidate = state.last_good.is_some() && !state.invalidated;
            state.invalidated |= invalidate;
            invalidate
        };
        if invalidated {
            shared.logger.debug(&format!(
                "[{}] cached connection info invalidated",
                shared.refresher.instance
            ));
        }
    }

    /// Closes the cache.
    ///
    /// Any in-flight refresh is cancelled and its waiters receive
    /// [`CacheError::Closed`], as does every later call. Idempotent.
    pub fn close(&self) {
        let shared = &self.inner.shared;
        if shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        shared.cancel.cancel();
        shared.logger.debug(&format!(
            "[{}] connection info cache closed",
            shared.refresher.instance
        ));
    }

    /// Returns a snapshot of the cache state. Never blocks on I/O.
    pub fn status(&self) -> CacheStatus {
        let shared = &self.inner.shared;
        let closed = shared.is_closed();
        let state = shared.lock_state();
        CacheStatus {
            cached: state.last_good.is_some(),
            invalidated: state.invalidated,
            refreshing: state.in_flight.as_ref().is_some_and(RefreshAttempt::is_live),
            consecutive_failures: state.consecutive_failures,
            closed,
        }
    }

    /// Returns the instance this cache serves.
    pub fn instance(&self) -> &InstanceUri {
        &self.inner.shared.refresher.instance
    }
}

async fn wait_for_outcome(mut rx: watch::Receiver<Option<Outcome>>) -> Outcome {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => match &*outcome {
            Some(outcome) => outcome.clone(),
            None => Err(RefreshError::Abandoned.into()),
        },
        // The refresh task ended without publishing (runtime shutdown or panic).
        Err(_) => Err(RefreshError::Abandoned.into()),
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.cancel.is_cancelled()
    }

    fn is_fresh(&self, info: &ConnectionInfo) -> bool {
        match self.refresh_buffer {
            None => true,
            Some(buffer) => info.expiration() - OffsetDateTime::now_utc() > buffer,
        }
    }

    fn lookup(self: &Arc<Self>) -> Result<Lookup, CacheError> {
        if self.is_closed() {
            return Err(CacheError::Closed);
        }

        let mut state = self.lock_state();

        if let Some(info) = &state.last_good {
            if !state.invalidated && self.is_fresh(info) {
                return Ok(Lookup::Ready(Arc::clone(info)));
            }
        }

        let mut replaced_dead_attempt = false;
        if let Some(attempt) = &state.in_flight {
            if attempt.is_live() {
                return Ok(Lookup::Wait(attempt.rx.clone()));
            }
            replaced_dead_attempt = true;
        }

        let id = state.next_attempt_id;
        state.next_attempt_id = state.next_attempt_id.wrapping_add(1);
        let (tx, rx) = watch::channel(None);
        state.in_flight = Some(RefreshAttempt { id, rx: rx.clone() });
        drop(state);

        if replaced_dead_attempt {
            self.logger.warn(&format!(
                "[{}] previous refresh ended without a result, starting a new one",
                self.refresher.instance
            ));
        }

        let shared = Arc::clone(self);
        tokio::spawn(async move { shared.run_refresh(id, tx).await });

        Ok(Lookup::Wait(rx))
    }

    async fn run_refresh(self: Arc<Self>, id: u64, tx: watch::Sender<Option<Outcome>>) {
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = self.refresher.refresh() => Some(result),
        };

        let Some(result) = result else {
            self.clear_in_flight(id);
            self.logger.debug(&format!(
                "[{}] refresh cancelled because the cache was closed",
                self.refresher.instance
            ));
            tx.send_replace(Some(Err(CacheError::Closed)));
            return;
        };

        let status = if result.is_ok() {
            RefreshStatus::Success
        } else {
            RefreshStatus::Failure
        };

        let outcome = self.install(id, result);

        // Waiters are released only after the state above is visible.
        tx.send_replace(Some(outcome));

        self.record_refresh(status);
    }

    fn clear_in_flight(&self, id: u64) {
        let mut state = self.lock_state();
        if state.in_flight.as_ref().is_some_and(|a| a.id == id) {
            state.in_flight = None;
        }
    }

    fn install(&self, id: u64, result: Result<ConnectionInfo, RefreshError>) -> Outcome {
        let mut state = self.lock_state();
        if state.in_flight.as_ref().is_some_and(|a| a.id == id) {
            state.in_flight = None;
        }

        match result {
            Ok(info) => {
                let info = Arc::new(info);
                state.last_good = Some(Arc::clone(&info));
                state.invalidated = false;
                state.consecutive_failures = 0;
                Ok(info)
            }
            Err(e) => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                let failures = state.consecutive_failures;
                let evicted = self.stale_policy.should_evict(failures)
                    && state.last_good.take().is_some();
                if evicted {
                    state.invalidated = false;
                }
                drop(state);

                if evicted {
                    self.logger.warn(&format!(
                        "[{}] evicted cached connection info after {} consecutive refresh failures",
                        self.refresher.instance, failures
                    ));
                }
                Err(CacheError::Refresh(e))
            }
        }
    }

    fn record_refresh(&self, status: RefreshStatus) {
        let attributes = Attributes {
            user_agent: self.user_agent.clone(),
            refresh_type: RefreshType::Lazy,
            refresh_status: status,
        };
        if let Err(e) = self.recorder.record_refresh_count(&attributes) {
            self.logger.warn(&format!(
                "[{}] failed to record refresh metric: {}",
                self.refresher.instance, e
            ));
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Best-effort cancellation of an in-flight refresh. Do not block in Drop.
        self.shared.cancel.cancel();
    }
}

impl Debug for LazyRefreshCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = &self.inner.shared;
        f.debug_struct("LazyRefreshCache")
            .field("refresher", &shared.refresher)
            .field("recorder", &"<MetricRecorder>")
            .field("logger", &"<Logger>")
            .field("user_agent", &shared.user_agent)
            .field("stale_policy", &shared.stale_policy)
            .field("refresh_buffer", &shared.refresh_buffer)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{
        AdminApiError, CertificateRequest, ClientCertificateResponse, InstanceMetadata,
    };
    use crate::key::KeyMaterial;
    use crate::logging::NullLogger;
    use crate::metrics::NullMetricRecorder;
    use futures::future::BoxFuture;
    use rcgen::{CertificateParams, KeyPair};
    use std::collections::HashMap;
    use std::num::NonZeroU32;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{OnceLock, TryLockError, Weak};

    /// Admin API that always fails, counting calls.
    #[derive(Default)]
    struct FailingApi {
        calls: AtomicUsize,
    }

    impl AdminApiClient for FailingApi {
        fn instance_metadata<'a>(
            &'a self,
            _instance: &'a InstanceUri,
        ) -> BoxFuture<'a, Result<InstanceMetadata, AdminApiError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(AdminApiError::Network("connection refused".to_string())) })
        }

        fn generate_client_certificate<'a>(
            &'a self,
            _instance: &'a InstanceUri,
            _request: &'a CertificateRequest,
        ) -> BoxFuture<'a, Result<ClientCertificateResponse, AdminApiError>> {
            Box::pin(async { Err(AdminApiError::Network("connection refused".to_string())) })
        }
    }

    fn instance() -> InstanceUri {
        InstanceUri::new("projects/p/locations/r/clusters/c/instances/i").unwrap()
    }

    fn cache_with(api: Arc<FailingApi>, stale_policy: StalePolicy) -> LazyRefreshCache {
        cache_with_logger(api, stale_policy, Arc::new(NullLogger))
    }

    fn cache_with_logger(
        api: Arc<dyn AdminApiClient>,
        stale_policy: StalePolicy,
        logger: Arc<dyn Logger>,
    ) -> LazyRefreshCache {
        LazyRefreshCache::from_parts(CacheParts {
            refresher: Refresher {
                instance: instance(),
                client: api,
                key: KeyMaterial::generate(Default::default()).unwrap(),
                timeout: Duration::from_secs(5),
                dialer_id: String::new(),
                use_metadata_exchange: false,
                logger: Arc::clone(&logger),
            },
            recorder: Arc::new(NullMetricRecorder),
            logger,
            user_agent: "test".to_string(),
            stale_policy,
            refresh_buffer: None,
        })
    }

    /// Admin API whose first metadata call panics, killing the refresh task.
    #[derive(Default)]
    struct PanicOnceApi {
        calls: AtomicUsize,
    }

    impl AdminApiClient for PanicOnceApi {
        fn instance_metadata<'a>(
            &'a self,
            _instance: &'a InstanceUri,
        ) -> BoxFuture<'a, Result<InstanceMetadata, AdminApiError>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("admin client crashed");
            }
            Box::pin(async { Err(AdminApiError::Network("connection refused".to_string())) })
        }

        fn generate_client_certificate<'a>(
            &'a self,
            _instance: &'a InstanceUri,
            _request: &'a CertificateRequest,
        ) -> BoxFuture<'a, Result<ClientCertificateResponse, AdminApiError>> {
            Box::pin(async { Err(AdminApiError::Network("connection refused".to_string())) })
        }
    }

    /// Logger that notes whether the cache state is locked while it runs.
    #[derive(Default)]
    struct LockCheckingLogger {
        shared: OnceLock<Weak<Shared>>,
        messages: Mutex<Vec<String>>,
        while_locked: AtomicUsize,
    }

    impl LockCheckingLogger {
        fn attach(&self, cache: &LazyRefreshCache) {
            let _ = self.shared.set(Arc::downgrade(&cache.inner.shared));
        }

        fn check(&self, msg: &str) {
            if let Some(shared) = self.shared.get().and_then(Weak::upgrade) {
                if matches!(shared.state.try_lock(), Err(TryLockError::WouldBlock)) {
                    self.while_locked.fetch_add(1, Ordering::SeqCst);
                }
            }
            self.messages.lock().unwrap().push(msg.to_string());
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Logger for LockCheckingLogger {
        fn debug(&self, msg: &str) {
            self.check(msg);
        }

        fn warn(&self, msg: &str) {
            self.check(msg);
        }
    }

    fn test_info() -> Arc<ConnectionInfo> {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["i".to_string()]).unwrap();
        params.not_after = OffsetDateTime::now_utc() + time::Duration::hours(1);
        let pem = params.self_signed(&key).unwrap().pem();
        let material = KeyMaterial::generate(Default::default()).unwrap();
        let info =
            ConnectionInfo::from_pem(instance(), HashMap::new(), &[&pem], &pem, &material).unwrap();
        Arc::new(info)
    }

    fn seed(cache: &LazyRefreshCache) {
        cache.inner.shared.lock_state().last_good = Some(test_info());
    }

    #[tokio::test]
    async fn test_status_of_new_cache() {
        let cache = cache_with(Arc::default(), StalePolicy::default());
        assert_eq!(
            cache.status(),
            CacheStatus {
                cached: false,
                invalidated: false,
                refreshing: false,
                consecutive_failures: 0,
                closed: false,
            }
        );
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_not_cached() {
        let api = Arc::new(FailingApi::default());
        let cache = cache_with(Arc::clone(&api), StalePolicy::default());
        let token = CancellationToken::new();

        for expected in 1..=3 {
            let err = cache.connection_info(&token).await.unwrap_err();
            assert!(matches!(
                err,
                CacheError::Refresh(RefreshError::AdminApi(AdminApiError::Network(_)))
            ));
            assert_eq!(cache.status().consecutive_failures, expected);
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
        assert!(!cache.status().refreshing);
    }

    #[tokio::test]
    async fn test_force_refresh_on_empty_cache_is_noop() {
        let cache = cache_with(Arc::default(), StalePolicy::default());
        cache.force_refresh();
        assert!(!cache.status().invalidated);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let cache = cache_with(Arc::default(), StalePolicy::default());
        cache.close();
        cache.close();

        assert!(cache.status().closed);
        let err = cache
            .connection_info(&CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, CacheError::Closed);
    }

    #[tokio::test]
    async fn test_cancelled_token_before_wait() {
        let cache = cache_with(Arc::default(), StalePolicy::default());
        let token = CancellationToken::new();
        token.cancel();

        let err = cache.connection_info(&token).await.unwrap_err();
        assert_eq!(err, CacheError::Cancelled);
    }

    #[test]
    fn test_stale_policy_threshold() {
        let policy = StalePolicy::evict_after(NonZeroU32::new(2).unwrap());
        assert!(!policy.should_evict(1));
        assert!(policy.should_evict(2));
        assert!(policy.should_evict(3));
        assert!(!StalePolicy::default().should_evict(u32::MAX));
    }

    #[tokio::test]
    async fn test_debug_does_not_leak_key() {
        let cache = cache_with(Arc::default(), StalePolicy::default());
        let debug = format!("{cache:?}");
        assert!(debug.contains("LazyRefreshCache"));
        assert!(!debug.contains("PRIVATE KEY"));
    }

    #[tokio::test]
    async fn test_force_refresh_logs_outside_state_lock() {
        let logger = Arc::new(LockCheckingLogger::default());
        let cache = cache_with_logger(
            Arc::new(FailingApi::default()),
            StalePolicy::default(),
            Arc::clone(&logger) as _,
        );
        logger.attach(&cache);
        seed(&cache);

        cache.force_refresh();

        assert!(cache.status().invalidated);
        assert!(logger.messages().iter().any(|m| m.contains("invalidated")));
        assert_eq!(logger.while_locked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_eviction_logs_outside_state_lock() {
        let logger = Arc::new(LockCheckingLogger::default());
        let cache = cache_with_logger(
            Arc::new(FailingApi::default()),
            StalePolicy::evict_after(NonZeroU32::new(1).unwrap()),
            Arc::clone(&logger) as _,
        );
        logger.attach(&cache);
        seed(&cache);
        cache.force_refresh();

        assert!(cache
            .connection_info(&CancellationToken::new())
            .await
            .is_err());

        assert!(!cache.status().cached);
        assert!(logger.messages().iter().any(|m| m.contains("evicted")));
        assert_eq!(logger.while_locked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dead_refresh_is_abandoned_and_replaced() {
        let api = Arc::new(PanicOnceApi::default());
        let logger = Arc::new(LockCheckingLogger::default());
        let cache = cache_with_logger(
            Arc::clone(&api) as _,
            StalePolicy::default(),
            Arc::clone(&logger) as _,
        );
        logger.attach(&cache);
        let token = CancellationToken::new();

        let first = cache.connection_info(&token).await.unwrap_err();
        assert_eq!(first, CacheError::Refresh(RefreshError::Abandoned));

        let status = cache.status();
        assert!(!status.refreshing);
        assert_eq!(status.consecutive_failures, 0);

        let second = cache.connection_info(&token).await.unwrap_err();
        assert!(matches!(
            second,
            CacheError::Refresh(RefreshError::AdminApi(AdminApiError::Network(_)))
        ));
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        assert!(logger
            .messages()
            .iter()
            .any(|m| m.contains("ended without a result")));
        assert_eq!(logger.while_locked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_published_outcome_wins_over_cancelled_token() {
        let cache = cache_with(Arc::default(), StalePolicy::default());
        let info = test_info();
        let (tx, rx) = watch::channel(Some(Ok(Arc::clone(&info))));
        cache.inner.shared.lock_state().in_flight = Some(RefreshAttempt { id: 0, rx });

        let token = CancellationToken::new();
        token.cancel();

        let got = cache.connection_info(&token).await.unwrap();
        assert!(Arc::ptr_eq(&got, &info));
        drop(tx);
    }
}
