//! Value types shared by the key cache, fetcher and resolver.

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey};

use super::error::KeyResolutionError;

// =============================================================================
// Signing Algorithm
// =============================================================================

/// The signature schemes a tenant token may use.
///
/// Anything that does not parse into one of these variants is rejected as
/// [`KeyResolutionError::UnsupportedAlgorithm`] before key resolution starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// Shared tenant secret (`HS256`).
    Symmetric,
    /// Public key published in the issuer's key set (`RS256`).
    Asymmetric,
}

impl SigningAlgorithm {
    /// The `jsonwebtoken` algorithm used to check the signature.
    #[must_use]
    pub fn jwt_algorithm(self) -> Algorithm {
        match self {
            Self::Symmetric => Algorithm::HS256,
            Self::Asymmetric => Algorithm::RS256,
        }
    }

    /// The `alg` header value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Symmetric => "HS256",
            Self::Asymmetric => "RS256",
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = KeyResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::Symmetric),
            "RS256" => Ok(Self::Asymmetric),
            other => Err(KeyResolutionError::unsupported_algorithm(other)),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Token Header / Payload
// =============================================================================

/// The parts of the (unverified) token header used for key resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Signature scheme from `alg`.
    pub algorithm: SigningAlgorithm,
    /// Key identifier from `kid`.
    pub key_id: Option<String>,
}

/// The parts of the (unverified) token payload used for key resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    /// The `iss` claim.
    pub issuer: String,
    /// The `aud` claim, multiple audiences joined with `,`.
    pub audience: String,
}

impl TokenPayload {
    /// Creates a payload view from issuer and audience.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Cache slot for this payload.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.issuer, &self.audience)
    }
}

// =============================================================================
// Cache Key
// =============================================================================

/// Cache slot identifier: `issuer|audience`.
///
/// The algorithm is deliberately not part of the key; the resolver checks
/// that a cached value matches the requested algorithm instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for an issuer/audience pair.
    #[must_use]
    pub fn new(issuer: &str, audience: &str) -> Self {
        Self(format!("{issuer}|{audience}"))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Key Material
// =============================================================================

/// A resolved verification key.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Raw bytes of a tenant's shared secret.
    Secret(Vec<u8>),
    /// PEM-wrapped certificate taken from the issuer's key set.
    PublicKeyPem {
        /// The `kid` the certificate was selected by.
        kid: Option<String>,
        /// The PEM text.
        pem: String,
    },
}

impl KeyMaterial {
    /// Size charged against the cache capacity.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Secret(bytes) => bytes.len(),
            Self::PublicKeyPem { pem, .. } => pem.len(),
        }
    }

    /// The algorithm this material can verify.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            Self::Secret(_) => SigningAlgorithm::Symmetric,
            Self::PublicKeyPem { .. } => SigningAlgorithm::Asymmetric,
        }
    }

    /// Returns `true` if this material can serve the given header.
    #[must_use]
    pub fn serves(&self, header: &TokenHeader) -> bool {
        match self {
            Self::Secret(_) => header.algorithm == SigningAlgorithm::Symmetric,
            Self::PublicKeyPem { kid, .. } => {
                header.algorithm == SigningAlgorithm::Asymmetric && *kid == header.key_id
            }
        }
    }

    /// Converts the material into a `jsonwebtoken` decoding key.
    ///
    /// # Errors
    ///
    /// Returns `MalformedKey` if the PEM text is not an RSA public key or
    /// certificate.
    pub fn to_decoding_key(&self) -> Result<DecodingKey, KeyResolutionError> {
        match self {
            Self::Secret(bytes) => Ok(DecodingKey::from_secret(bytes)),
            Self::PublicKeyPem { pem, .. } => DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| KeyResolutionError::malformed_key(e.to_string())),
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret(bytes) => f
                .debug_struct("Secret")
                .field("len", &bytes.len())
                .finish_non_exhaustive(),
            Self::PublicKeyPem { kid, pem } => f
                .debug_struct("PublicKeyPem")
                .field("kid", kid)
                .field("len", &pem.len())
                .finish_non_exhaustive(),
        }
    }
}
