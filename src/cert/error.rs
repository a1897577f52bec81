//! Error type for certificate parsing.

/// An error that may arise parsing X.509 certificates.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CertificateError {
    /// Error returned by the X.509 parsing library.
    #[error("failed parsing X.509 certificate: {0}")]
    ParseX509Certificate(String),

    /// The input is not valid PEM.
    #[error("failed decoding PEM block: {0}")]
    ParsePem(String),

    /// A PEM block holds something other than a certificate.
    #[error("unexpected PEM block label {0:?}, expected CERTIFICATE")]
    UnexpectedPemLabel(String),

    /// No certificate was found in the input.
    #[error("no certificates found")]
    Empty,

    /// The validity timestamp cannot be represented.
    #[error("certificate validity timestamp out of range")]
    InvalidValidity,
}
