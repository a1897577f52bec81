//! A single refresh attempt against the administrative API.

use crate::admin::{AdminApiClient, AdminApiError, CertificateRequest};
use crate::connection_info::{ConnectionInfo, ConnectionInfoError};
use crate::instance::InstanceUri;
use crate::key::KeyMaterial;
use crate::logging::Logger;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a refresh attempt failed.
///
/// Every waiter on an attempt receives a clone of the same value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RefreshError {
    /// The admin API returned an error.
    #[error("admin API request failed: {0}")]
    AdminApi(#[from] AdminApiError),

    /// The admin API answered but the certificates could not be used.
    #[error("invalid connection info: {0}")]
    InvalidConnectionInfo(#[from] ConnectionInfoError),

    /// The attempt did not finish within the configured refresh timeout.
    ///
    /// The outstanding admin API calls are cancelled.
    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),

    /// The refresh task ended without publishing an outcome.
    #[error("refresh operation was abandoned before completing")]
    Abandoned,
}

/// Fetches instance metadata and an ephemeral certificate, then assembles
/// [`ConnectionInfo`].
///
/// Both admin API calls run concurrently; the first failure wins and the other
/// call is dropped.
///
/// # Errors
///
/// Returns a [`RefreshError`] if either call fails or the response is malformed.
pub async fn fetch_connection_info(
    client: &dyn AdminApiClient,
    instance: &InstanceUri,
    key: &KeyMaterial,
    use_metadata_exchange: bool,
) -> Result<ConnectionInfo, RefreshError> {
    let request = CertificateRequest {
        public_key_pem: key.public_key_pem().to_string(),
        use_metadata_exchange,
    };

    let (metadata, certs) = tokio::try_join!(
        client.instance_metadata(instance),
        client.generate_client_certificate(instance, &request),
    )?;

    let info = ConnectionInfo::from_pem(
        instance.clone(),
        metadata.ip_addrs,
        &certs.pem_certificate_chain,
        &certs.ca_cert,
        key,
    )?;
    Ok(info)
}

/// Performs refresh attempts for one instance with fixed settings.
pub(crate) struct Refresher {
    pub(crate) instance: InstanceUri,
    pub(crate) client: Arc<dyn AdminApiClient>,
    pub(crate) key: KeyMaterial,
    pub(crate) timeout: Duration,
    pub(crate) dialer_id: String,
    pub(crate) use_metadata_exchange: bool,
    pub(crate) logger: Arc<dyn Logger>,
}

impl Refresher {
    pub(crate) async fn refresh(&self) -> Result<ConnectionInfo, RefreshError> {
        self.logger.debug(&format!(
            "[{}] connection info refresh operation started (dialer_id={})",
            self.instance, self.dialer_id
        ));

        let fetch = fetch_connection_info(
            self.client.as_ref(),
            &self.instance,
            &self.key,
            self.use_metadata_exchange,
        );

        let result = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result,
            Err(_elapsed) => Err(RefreshError::Timeout(self.timeout)),
        };

        match &result {
            Ok(info) => self.logger.debug(&format!(
                "[{}] connection info refresh operation complete, current certificate expiration = {}",
                self.instance,
                info.expiration()
            )),
            Err(e) => self.logger.warn(&format!(
                "[{}] connection info refresh operation failed: {}",
                self.instance, e
            )),
        }

        result
    }
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("instance", &self.instance)
            .field("client", &"<AdminApiClient>")
            .field("timeout", &self.timeout)
            .field("dialer_id", &self.dialer_id)
            .field("use_metadata_exchange", &self.use_metadata_exchange)
            .field("logger", &"<Logger>")
            .finish()
    }
}
