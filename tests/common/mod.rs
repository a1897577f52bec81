#![allow(dead_code)]

use alloydb_connector::{
    AdminApiClient, AdminApiError, Attributes, CertificateRequest, ClientCertificateResponse,
    InstanceMetadata, InstanceUri, IpType, Logger, MetricRecorder, MetricsError,
};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;

pub static INSTANCE: Lazy<InstanceUri> = Lazy::new(|| {
    InstanceUri::new(
        "projects/my-project/locations/my-region/clusters/my-cluster/instances/my-instance",
    )
    .unwrap()
});

pub const PUBLIC_IP: &str = "34.1.2.3";
pub const PRIVATE_IP: &str = "10.0.0.2";

/// In-memory admin API with per-RPC call budgets.
///
/// Calls beyond a budget fail with status 500. Every call is counted, including
/// rejected ones.
pub struct FakeAdminApi {
    metadata_budget: AtomicUsize,
    cert_budget: AtomicUsize,
    metadata_calls: AtomicUsize,
    cert_calls: AtomicUsize,
    dropped_calls: AtomicUsize,
    delay: Option<Duration>,
    gate: watch::Sender<bool>,
    cert_validity: Duration,
    malformed_certificates: bool,
    ca_pem: String,
    last_request: Mutex<Option<CertificateRequest>>,
}

impl FakeAdminApi {
    pub fn new(metadata_budget: usize, cert_budget: usize) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            metadata_budget: AtomicUsize::new(metadata_budget),
            cert_budget: AtomicUsize::new(cert_budget),
            metadata_calls: AtomicUsize::new(0),
            cert_calls: AtomicUsize::new(0),
            dropped_calls: AtomicUsize::new(0),
            delay: None,
            gate,
            cert_validity: Duration::from_secs(3600),
            malformed_certificates: false,
            ca_pem: mint_ca(),
            last_request: Mutex::new(None),
        }
    }

    /// Makes every call sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes every call wait until [`open_gate`](Self::open_gate).
    pub fn gated(self) -> Self {
        self.close_gate();
        self
    }

    pub fn with_cert_validity(mut self, validity: Duration) -> Self {
        self.cert_validity = validity;
        self
    }

    /// Answers certificate requests with a chain that is not PEM.
    pub fn with_malformed_certificates(mut self) -> Self {
        self.malformed_certificates = true;
        self
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn add_budget(&self, metadata: usize, cert: usize) {
        self.metadata_budget.fetch_add(metadata, Ordering::SeqCst);
        self.cert_budget.fetch_add(cert, Ordering::SeqCst);
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn cert_calls(&self) -> usize {
        self.cert_calls.load(Ordering::SeqCst)
    }

    /// Calls whose futures were dropped before answering.
    pub fn dropped_calls(&self) -> usize {
        self.dropped_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CertificateRequest> {
        self.last_request.lock().unwrap().clone()
    }

    async fn pace(&self) {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn take_budget(budget: &AtomicUsize, rpc: &str) -> Result<(), AdminApiError> {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| AdminApiError::Status {
                code: 500,
                message: format!("{rpc}: no requests remaining"),
            })
    }

    fn mint_response(&self) -> ClientCertificateResponse {
        if self.malformed_certificates {
            return ClientCertificateResponse {
                pem_certificate_chain: vec!["not a certificate".to_string()],
                ca_cert: self.ca_pem.clone(),
            };
        }
        ClientCertificateResponse {
            pem_certificate_chain: vec![mint_client_cert(self.cert_validity), self.ca_pem.clone()],
            ca_cert: self.ca_pem.clone(),
        }
    }
}

impl AdminApiClient for FakeAdminApi {
    fn instance_metadata<'a>(
        &'a self,
        _instance: &'a InstanceUri,
    ) -> BoxFuture<'a, Result<InstanceMetadata, AdminApiError>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let mut guard = DropGuard::new(&self.dropped_calls);
            self.pace().await;
            guard.complete();

            Self::take_budget(&self.metadata_budget, "instance metadata")?;
            Ok(InstanceMetadata {
                ip_addrs: HashMap::from([
                    (IpType::Public, PUBLIC_IP.to_string()),
                    (IpType::Private, PRIVATE_IP.to_string()),
                ]),
            })
        })
    }

    fn generate_client_certificate<'a>(
        &'a self,
        _instance: &'a InstanceUri,
        request: &'a CertificateRequest,
    ) -> BoxFuture<'a, Result<ClientCertificateResponse, AdminApiError>> {
        self.cert_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        Box::pin(async move {
            let mut guard = DropGuard::new(&self.dropped_calls);
            self.pace().await;
            guard.complete();

            Self::take_budget(&self.cert_budget, "generate client certificate")?;
            Ok(self.mint_response())
        })
    }
}

/// Counts a call as dropped unless it completed.
struct DropGuard<'a> {
    counter: &'a AtomicUsize,
    completed: bool,
}

impl<'a> DropGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        Self {
            counter,
            completed: false,
        }
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for DropGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn mint_ca() -> String {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.not_before = OffsetDateTime::now_utc() - time::Duration::minutes(5);
    params.not_after = OffsetDateTime::now_utc() + time::Duration::days(365);
    params.self_signed(&key).unwrap().pem()
}

fn mint_client_cert(validity: Duration) -> String {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(vec!["my-instance".to_string()]).unwrap();
    params.not_before = OffsetDateTime::now_utc() - time::Duration::minutes(5);
    params.not_after = OffsetDateTime::now_utc() + validity;
    params.self_signed(&key).unwrap().pem()
}

/// Recorder that keeps every event.
#[derive(Default)]
pub struct MockMetricRecorder {
    events: Mutex<Vec<Attributes>>,
}

impl MockMetricRecorder {
    pub fn events(&self) -> Vec<Attributes> {
        self.events.lock().unwrap().clone()
    }

    /// Polls for an event equal to `want`: ten tries, 100ms apart.
    pub async fn verify(&self, want: &Attributes) -> bool {
        for _ in 0..10 {
            if self.events.lock().unwrap().iter().any(|got| got == want) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }
}

impl MetricRecorder for MockMetricRecorder {
    fn record_refresh_count(&self, attributes: &Attributes) -> Result<(), MetricsError> {
        self.events.lock().unwrap().push(attributes.clone());
        Ok(())
    }
}

/// Recorder whose backend is always down.
pub struct FailingMetricRecorder;

impl MetricRecorder for FailingMetricRecorder {
    fn record_refresh_count(&self, _attributes: &Attributes) -> Result<(), MetricsError> {
        Err(MetricsError("exporter unavailable".to_string()))
    }
}

/// Logger that keeps every message.
#[derive(Default)]
pub struct RecordingLogger {
    debug: Mutex<Vec<String>>,
    warn: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn warnings(&self) -> Vec<String> {
        self.warn.lock().unwrap().clone()
    }

    pub fn debugs(&self) -> Vec<String> {
        self.debug.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, msg: &str) {
        self.debug.lock().unwrap().push(msg.to_string());
    }

    fn warn(&self, msg: &str) {
        self.warn.lock().unwrap().push(msg.to_string());
    }
}

/// Polls `condition` every 10ms for up to two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
