//! Client key material used to request ephemeral certificates.
//!
//! A [`KeyMaterial`] is created once per cache. Its public half is sent with every
//! certificate request; the private half is handed to the dialer together with the
//! issued certificate. Key generation is comparatively expensive, so it never
//! happens on the refresh path.

use std::fmt;

use rcgen::{KeyPair, SignatureAlgorithm};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// Asymmetric algorithms supported for generated client keys.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum KeyAlgorithm {
    /// ECDSA over P-256 with SHA-256.
    #[default]
    EcdsaP256,
    /// ECDSA over P-384 with SHA-384.
    EcdsaP384,
    /// Ed25519.
    Ed25519,
}

impl KeyAlgorithm {
    /// Returns a stable string representation of the algorithm.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EcdsaP256 => "ecdsa_p256",
            Self::EcdsaP384 => "ecdsa_p384",
            Self::Ed25519 => "ed25519",
        }
    }

    fn signature_algorithm(self) -> &'static SignatureAlgorithm {
        match self {
            Self::EcdsaP256 => &rcgen::PKCS_ECDSA_P256_SHA256,
            Self::EcdsaP384 => &rcgen::PKCS_ECDSA_P384_SHA384,
            Self::Ed25519 => &rcgen::PKCS_ED25519,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the cache obtains its client key pair.
#[derive(Clone)]
pub enum KeyConfig {
    /// Generate a fresh key pair with the given algorithm.
    Generate(KeyAlgorithm),
    /// Load an existing PKCS#8 PEM-encoded private key.
    Pem(Zeroizing<String>),
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self::Generate(KeyAlgorithm::default())
    }
}

impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate(alg) => f.debug_tuple("Generate").field(alg).finish(),
            Self::Pem(_) => f.debug_tuple("Pem").field(&"<redacted>").finish(),
        }
    }
}

/// An error that may arise producing the client key pair.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyError {
    /// The key pair could not be generated.
    #[error("failed to generate {algorithm} key pair: {reason}")]
    Generation {
        /// Requested algorithm.
        algorithm: KeyAlgorithm,
        /// Underlying failure.
        reason: String,
    },

    /// The provided PEM could not be loaded as a private key.
    #[error("failed to load private key from PEM: {0}")]
    InvalidPem(String),
}

/// A DER-encoded private key in PKCS#8 format.
///
/// This type is zeroized on drop.
#[derive(Clone, Eq, PartialEq, Zeroize)]
#[zeroize(drop)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    /// Returns the private key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for PrivateKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("len", &self.0.len())
            .finish()
    }
}

/// The client key pair owned by a cache for its whole lifetime.
#[derive(Clone, Debug)]
pub struct KeyMaterial {
    public_key_pem: String,
    public_key_der: Vec<u8>,
    private_key: PrivateKey,
}

impl KeyMaterial {
    /// Produces key material according to `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if generation fails or the PEM cannot be parsed.
    pub fn from_config(config: &KeyConfig) -> Result<Self, KeyError> {
        match config {
            KeyConfig::Generate(algorithm) => Self::generate(*algorithm),
            KeyConfig::Pem(pem) => Self::from_pem(pem),
        }
    }

    /// Generates a new key pair.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Generation`] if the underlying crypto provider fails.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self, KeyError> {
        let key_pair = KeyPair::generate_for(algorithm.signature_algorithm()).map_err(|e| {
            KeyError::Generation {
                algorithm,
                reason: e.to_string(),
            }
        })?;
        Ok(Self::from_key_pair(&key_pair))
    }

    /// Loads a PKCS#8 PEM-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidPem`] if the PEM is not a supported private key.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let key_pair = KeyPair::from_pem(pem).map_err(|e| KeyError::InvalidPem(e.to_string()))?;
        Ok(Self::from_key_pair(&key_pair))
    }

    fn from_key_pair(key_pair: &KeyPair) -> Self {
        Self {
            public_key_pem: key_pair.public_key_pem(),
            public_key_der: key_pair.public_key_der(),
            private_key: PrivateKey(key_pair.serialize_der()),
        }
    }

    /// Returns the public key as a PEM-encoded SubjectPublicKeyInfo.
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// Returns the public key as a DER-encoded SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Returns the private key as PKCS#8 DER.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}
