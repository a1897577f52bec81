//! `Certificate` type and helpers.
//!
//! Certificates wrap DER-encoded bytes and are validated at construction time.

use crate::cert::parsing::parse_der_encoded_bytes_as_x509_certificate;
use std::convert::TryFrom;
use time::OffsetDateTime;

pub mod error;
pub(crate) mod parsing;

pub use error::CertificateError;
pub use parsing::parse_pem_chain;

/// A single DER-encoded X.509 certificate.
///
/// Invariant: instances are always validated as parseable DER-encoded X.509.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Certificate(Vec<u8>);

impl Certificate {
    /// Returns the certificate bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the `notAfter` timestamp of the certificate.
    ///
    /// # Errors
    ///
    /// Returns a [`CertificateError`] if the timestamp cannot be represented.
    pub fn not_after(&self) -> Result<OffsetDateTime, CertificateError> {
        let x509 = parse_der_encoded_bytes_as_x509_certificate(self.as_bytes())?;
        OffsetDateTime::from_unix_timestamp(x509.validity().not_after.timestamp())
            .map_err(|_| CertificateError::InvalidValidity)
    }
}

impl AsRef<[u8]> for Certificate {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Certificate {
    type Error = CertificateError;

    fn try_from(der_bytes: &[u8]) -> Result<Self, Self::Error> {
        parse_der_encoded_bytes_as_x509_certificate(der_bytes)?;
        Ok(Self(Vec::from(der_bytes)))
    }
}

impl TryFrom<Vec<u8>> for Certificate {
    type Error = CertificateError;

    fn try_from(der_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        parse_der_encoded_bytes_as_x509_certificate(&der_bytes)?;
        Ok(Self(der_bytes))
    }
}
