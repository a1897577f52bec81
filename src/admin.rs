//! Administrative API client contract.
//!
//! The cache does not talk to the control plane directly. Callers supply an
//! [`AdminApiClient`] implementation that performs the two remote calls a refresh
//! needs: reading instance metadata and issuing an ephemeral client certificate.

use crate::connection_info::IpType;
use crate::instance::InstanceUri;
use futures::future::BoxFuture;
use std::collections::HashMap;
use thiserror::Error;

/// Errors returned by an [`AdminApiClient`].
///
/// Refresh outcomes are delivered to every waiter, so this type is cheap to clone
/// and comparable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AdminApiError {
    /// The request could not reach the API or the connection failed mid-flight.
    #[error("network error: {0}")]
    Network(String),

    /// The caller is not authorized to perform the request.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The instance does not exist.
    #[error("instance not found: {0}")]
    NotFound(String),

    /// The API answered with a body that could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The API answered with an unexpected status.
    #[error("admin API returned status {code}: {message}")]
    Status {
        /// Status code.
        code: u16,
        /// Server-provided message.
        message: String,
    },
}

/// Instance metadata relevant to connecting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceMetadata {
    /// Addresses keyed by network path. Absent entries are not configured.
    pub ip_addrs: HashMap<IpType, String>,
}

/// Request for an ephemeral client certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    /// PEM-encoded SubjectPublicKeyInfo the certificate is issued for.
    pub public_key_pem: String,
    /// Whether the server should expect the metadata exchange after the handshake.
    pub use_metadata_exchange: bool,
}

/// Response carrying an ephemeral client certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCertificateResponse {
    /// PEM certificates, client certificate first.
    pub pem_certificate_chain: Vec<String>,
    /// PEM CA certificate for verifying the server.
    pub ca_cert: String,
}

/// Transport-agnostic client for the administrative API.
///
/// Implementations must be safe to share between threads. The cache never issues
/// overlapping refreshes for a single instance, but different caches may share one
/// client.
pub trait AdminApiClient: Send + Sync + 'static {
    /// Reads connection metadata for `instance`.
    fn instance_metadata<'a>(
        &'a self,
        instance: &'a InstanceUri,
    ) -> BoxFuture<'a, Result<InstanceMetadata, AdminApiError>>;

    /// Issues an ephemeral client certificate for `instance`.
    fn generate_client_certificate<'a>(
        &'a self,
        instance: &'a InstanceUri,
        request: &'a CertificateRequest,
    ) -> BoxFuture<'a, Result<ClientCertificateResponse, AdminApiError>>;
}
