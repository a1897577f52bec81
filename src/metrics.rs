//! Refresh metrics.
//!
//! The cache records exactly one event per completed refresh through a
//! [`MetricRecorder`]. Recording happens on the refresh task after waiters are
//! released, so a slow recorder never delays a caller. Recorder errors are
//! logged and discarded.

use prometheus::{IntCounterVec, Opts, Registry};
use std::fmt;
use thiserror::Error;

/// Refresh strategy label.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RefreshType {
    /// Refresh on demand when the cached value is missing or invalidated.
    Lazy,
}

impl RefreshType {
    /// Returns the label value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lazy => "lazy",
        }
    }
}

impl fmt::Display for RefreshType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refresh outcome label.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RefreshStatus {
    /// The refresh produced new connection info.
    Success,
    /// The refresh failed.
    Failure,
}

impl RefreshStatus {
    /// Returns the label value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes attached to a refresh count event.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Attributes {
    /// Caller-supplied user agent tag.
    pub user_agent: String,
    /// Strategy that performed the refresh.
    pub refresh_type: RefreshType,
    /// Outcome of the refresh.
    pub refresh_status: RefreshStatus,
}

/// Error returned by a [`MetricRecorder`].
#[derive(Debug, Error)]
#[error("failed to record metric: {0}")]
pub struct MetricsError(pub String);

impl From<prometheus::Error> for MetricsError {
    fn from(e: prometheus::Error) -> Self {
        Self(e.to_string())
    }
}

/// Sink for refresh metrics.
///
/// Implement this trait to integrate with your metrics system. Labels are
/// low-cardinality by construction.
pub trait MetricRecorder: Send + Sync {
    /// Records one completed refresh.
    ///
    /// # Errors
    ///
    /// Returns a [`MetricsError`] if the backend rejects the event. The cache logs
    /// and discards it.
    fn record_refresh_count(&self, attributes: &Attributes) -> Result<(), MetricsError>;
}

/// Recorder that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricRecorder;

impl MetricRecorder for NullMetricRecorder {
    fn record_refresh_count(&self, _attributes: &Attributes) -> Result<(), MetricsError> {
        Ok(())
    }
}

const REFRESH_COUNT_NAME: &str = "alloydb_connector_refresh_count";
const REFRESH_COUNT_HELP: &str = "Number of completed connection info refreshes";
const LABELS: [&str; 3] = ["user_agent", "refresh_type", "refresh_status"];

/// Recorder backed by a Prometheus counter.
#[derive(Clone)]
pub struct PrometheusMetricRecorder {
    refresh_count: IntCounterVec,
}

impl fmt::Debug for PrometheusMetricRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusMetricRecorder")
            .field("name", &REFRESH_COUNT_NAME)
            .finish()
    }
}

impl PrometheusMetricRecorder {
    /// Creates the refresh counter and registers it with `registry`.
    ///
    /// # Errors
    ///
    /// Returns a [`MetricsError`] if the counter cannot be created or is already
    /// registered.
    pub fn new(registry: &Registry) -> Result<Self, MetricsError> {
        let refresh_count =
            IntCounterVec::new(Opts::new(REFRESH_COUNT_NAME, REFRESH_COUNT_HELP), &LABELS)?;
        registry.register(Box::new(refresh_count.clone()))?;
        Ok(Self { refresh_count })
    }

    /// Returns the current count for the given attributes.
    ///
    /// # Errors
    ///
    /// Returns a [`MetricsError`] if the label values are rejected.
    pub fn count(&self, attributes: &Attributes) -> Result<u64, MetricsError> {
        Ok(self
            .refresh_count
            .get_metric_with_label_values(&label_values(attributes))?
            .get())
    }
}

impl MetricRecorder for PrometheusMetricRecorder {
    fn record_refresh_count(&self, attributes: &Attributes) -> Result<(), MetricsError> {
        self.refresh_count
            .get_metric_with_label_values(&label_values(attributes))?
            .inc();
        Ok(())
    }
}

fn label_values(attributes: &Attributes) -> [&str; 3] {
    [
        attributes.user_agent.as_str(),
        attributes.refresh_type.as_str(),
        attributes.refresh_status.as_str(),
    ]
}
