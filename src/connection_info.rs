//! Connection material produced by a successful refresh.

use crate::cert::{parse_pem_chain, Certificate, CertificateError};
use crate::instance::InstanceUri;
use crate::key::{KeyMaterial, PrivateKey};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;

/// Network path over which an instance can be reached.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum IpType {
    /// Public IP address.
    Public,
    /// Private (VPC) IP address.
    Private,
    /// Private Service Connect DNS name.
    Psc,
}

impl IpType {
    /// Returns a stable string representation of the IP type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
            Self::Psc => "PSC",
        }
    }
}

impl fmt::Display for IpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors building or querying a [`ConnectionInfo`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionInfoError {
    /// The client certificate chain could not be parsed.
    #[error("invalid client certificate chain: {0}")]
    ClientCertificate(#[source] CertificateError),

    /// The CA certificate could not be parsed.
    #[error("invalid CA certificate: {0}")]
    CaCertificate(#[source] CertificateError),

    /// The instance has no address for the requested IP type.
    #[error("instance {instance} does not have an IP of type {ip_type}")]
    NoIpForType {
        /// Instance that was queried.
        instance: String,
        /// IP type that was requested.
        ip_type: IpType,
    },
}

/// Everything a dialer needs to open a mutually-authenticated connection.
///
/// Values are immutable once built and shared as `Arc<ConnectionInfo>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionInfo {
    instance: InstanceUri,
    certificate_chain: Vec<Certificate>,
    ca_certificate: Certificate,
    ip_addrs: HashMap<IpType, String>,
    expiration: OffsetDateTime,
    client_key: PrivateKey,
}

impl ConnectionInfo {
    /// Builds connection info from the admin API responses.
    ///
    /// `certificate_chain` holds PEM certificates with the client certificate first.
    /// The expiration is taken from the client certificate's `notAfter`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionInfoError`] if any certificate is malformed or the
    /// chain is empty.
    pub fn from_pem<S: AsRef<str>>(
        instance: InstanceUri,
        ip_addrs: HashMap<IpType, String>,
        certificate_chain: &[S],
        ca_certificate: &str,
        key: &KeyMaterial,
    ) -> Result<Self, ConnectionInfoError> {
        let mut chain = Vec::with_capacity(certificate_chain.len());
        for pem in certificate_chain {
            chain.extend(
                parse_pem_chain(pem.as_ref()).map_err(ConnectionInfoError::ClientCertificate)?,
            );
        }

        let Some(leaf) = chain.first() else {
            return Err(ConnectionInfoError::ClientCertificate(CertificateError::Empty));
        };
        let expiration = leaf
            .not_after()
            .map_err(ConnectionInfoError::ClientCertificate)?;

        let ca_certificate = parse_pem_chain(ca_certificate)
            .map_err(ConnectionInfoError::CaCertificate)?
            .swap_remove(0);

        Ok(Self {
            instance,
            certificate_chain: chain,
            ca_certificate,
            ip_addrs,
            expiration,
            client_key: key.private_key().clone(),
        })
    }

    /// Returns the instance this material belongs to.
    pub fn instance(&self) -> &InstanceUri {
        &self.instance
    }

    /// Returns the ephemeral client certificate (the first element of the chain).
    pub fn client_certificate(&self) -> &Certificate {
        // The chain is never empty, see `from_pem`.
        &self.certificate_chain[0]
    }

    /// Returns the full client certificate chain, leaf first.
    pub fn certificate_chain(&self) -> &[Certificate] {
        &self.certificate_chain
    }

    /// Returns the CA certificate used to verify the server.
    pub fn ca_certificate(&self) -> &Certificate {
        &self.ca_certificate
    }

    /// Returns the private key matching the client certificate.
    pub fn client_key(&self) -> &PrivateKey {
        &self.client_key
    }

    /// Returns all known addresses keyed by IP type.
    pub fn ip_addrs(&self) -> &HashMap<IpType, String> {
        &self.ip_addrs
    }

    /// Returns the address for the given IP type.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionInfoError::NoIpForType`] if the instance has no such address.
    pub fn addr(&self, ip_type: IpType) -> Result<&str, ConnectionInfoError> {
        self.ip_addrs
            .get(&ip_type)
            .map(String::as_str)
            .ok_or_else(|| ConnectionInfoError::NoIpForType {
                instance: self.instance.to_string(),
                ip_type,
            })
    }

    /// Returns when the client certificate expires.
    pub fn expiration(&self) -> OffsetDateTime {
        self.expiration
    }
}
