//! Internal parsing helpers.

use crate::cert::{Certificate, CertificateError};
use x509_parser::certificate::X509Certificate;
use x509_parser::error::X509Error;
use x509_parser::nom::Err;
use x509_parser::pem::Pem;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Maximum number of certificates accepted in a single PEM input.
///
/// Issued client chains hold a leaf and one or two intermediates.
const MAX_CERT_CHAIN_LENGTH: usize = 16;

/// Parses one or more concatenated PEM `CERTIFICATE` blocks.
///
/// # Errors
///
/// Returns a [`CertificateError`] if the input holds no certificate, a block is
/// not a certificate, or a certificate cannot be parsed.
pub fn parse_pem_chain(pem: &str) -> Result<Vec<Certificate>, CertificateError> {
    let mut certs = Vec::new();

    for block in Pem::iter_from_buffer(pem.as_bytes()) {
        let block = block.map_err(|e| CertificateError::ParsePem(e.to_string()))?;
        if block.label != CERTIFICATE_LABEL {
            return Err(CertificateError::UnexpectedPemLabel(block.label));
        }
        if certs.len() >= MAX_CERT_CHAIN_LENGTH {
            return Err(CertificateError::ParsePem(format!(
                "more than {MAX_CERT_CHAIN_LENGTH} certificates"
            )));
        }
        certs.push(Certificate::try_from(block.contents)?);
    }

    if certs.is_empty() {
        return Err(CertificateError::Empty);
    }

    Ok(certs)
}

/// Try to parse the given DER-encoded slice of bytes as a X.509 certificate.
pub(crate) fn parse_der_encoded_bytes_as_x509_certificate(
    der_bytes: &[u8],
) -> Result<X509Certificate<'_>, CertificateError> {
    let (_, cert) = x509_parser::parse_x509_certificate(der_bytes).map_err(|e| match e {
        Err::Incomplete(_) => {
            CertificateError::ParseX509Certificate(X509Error::InvalidCertificate.to_string())
        }
        Err::Error(err) | Err::Failure(err) => {
            CertificateError::ParseX509Certificate(err.to_string())
        }
    })?;
    Ok(cert)
}
