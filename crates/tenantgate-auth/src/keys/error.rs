//! Key resolution error types.

use crate::error::ErrorCategory;

/// Errors that can occur while resolving a token's verification key.
///
/// The enum is `Clone` because a single remote key-set fetch can be shared by
/// several concurrent resolutions of the same issuer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyResolutionError {
    /// No tenant matches the token issuer, or the issuer is not a URL.
    #[error("Invalid issuer {issuer}")]
    InvalidIssuer {
        /// The issuer claim from the token.
        issuer: String,
    },

    /// The token algorithm is not accepted, or the tenant cannot serve it.
    #[error("Unsupported JWT algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// The algorithm named in the token header.
        algorithm: String,
    },

    /// The issuer's key set does not publish the requested key.
    #[error("Failed to obtain signing key {} used by {issuer}", kid.as_deref().unwrap_or("<none>"))]
    KeyNotFound {
        /// The token issuer.
        issuer: String,
        /// The key identifier from the token header.
        kid: Option<String>,
    },

    /// Key material was found but cannot be used.
    #[error("Malformed key: {message}")]
    MalformedKey {
        /// Why the key is unusable.
        message: String,
    },

    /// Transport failure or timeout talking to the key-set endpoint.
    #[error("Network error: {message}")]
    Network {
        /// Transport error description.
        message: String,
    },

    /// The key-set endpoint answered, but not with a usable key set.
    #[error("Protocol error: {message}")]
    Protocol {
        /// What was wrong with the response.
        message: String,
    },
}

impl KeyResolutionError {
    /// Creates a new `InvalidIssuer` error.
    #[must_use]
    pub fn invalid_issuer(issuer: impl Into<String>) -> Self {
        Self::InvalidIssuer {
            issuer: issuer.into(),
        }
    }

    /// Creates a new `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Creates a new `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(issuer: impl Into<String>, kid: Option<&str>) -> Self {
        Self::KeyNotFound {
            issuer: issuer.into(),
            kid: kid.map(ToString::to_string),
        }
    }

    /// Creates a new `MalformedKey` error.
    #[must_use]
    pub fn malformed_key(message: impl Into<String>) -> Self {
        Self::MalformedKey {
            message: message.into(),
        }
    }

    /// Creates a new `Network` error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a new `Protocol` error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns `true` for failures of the remote key-set dependency.
    ///
    /// These still reject the request, but they are logged as
    /// infrastructure faults rather than as bad credentials.
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Protocol { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidIssuer { .. } => ErrorCategory::Authentication,
            Self::UnsupportedAlgorithm { .. } => ErrorCategory::Validation,
            Self::KeyNotFound { .. } | Self::MalformedKey { .. } => ErrorCategory::Token,
            Self::Network { .. } | Self::Protocol { .. } => ErrorCategory::Infrastructure,
        }
    }

    /// Stable machine-readable code exposed in rejection bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIssuer { .. } => "invalid_issuer",
            Self::UnsupportedAlgorithm { .. } => "unsupported_algorithm",
            Self::KeyNotFound { .. } => "key_not_found",
            Self::MalformedKey { .. } => "malformed_key",
            Self::Network { .. } => "key_set_unavailable",
            Self::Protocol { .. } => "key_set_invalid",
        }
    }
}
