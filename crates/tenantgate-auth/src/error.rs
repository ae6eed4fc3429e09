//! Authentication error types.
//!
//! This module defines all error types that can occur while authenticating a
//! request to the tenant API.

use std::fmt;

use crate::keys::KeyResolutionError;

/// Errors that can occur during request authentication.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request carries no usable bearer credentials.
    #[error("Missing credentials: {message}")]
    MissingCredentials {
        /// Description of what is missing.
        message: String,
    },

    /// The token is malformed, or its signature or claims did not verify.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// No verification key could be resolved for the token.
    #[error(transparent)]
    KeyResolution(#[from] KeyResolutionError),

    /// A verified token's issuer no longer resolves to a tenant.
    #[error("Tenant context unavailable for issuer {issuer}")]
    TenantContext {
        /// The verified issuer.
        issuer: String,
    },

    /// An error occurred while retrieving tenant data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `MissingCredentials` error.
    #[must_use]
    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::MissingCredentials {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `TenantContext` error.
    #[must_use]
    pub fn tenant_context(issuer: impl Into<String>) -> Self {
        Self::TenantContext {
            issuer: issuer.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the request was rejected for its credentials (401).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials { .. }
                | Self::InvalidToken { .. }
                | Self::TokenExpired
                | Self::KeyResolution(_)
        )
    }

    /// Returns `true` if this is a server fault (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingCredentials { .. } => ErrorCategory::Authentication,
            Self::InvalidToken { .. } | Self::TokenExpired => ErrorCategory::Token,
            Self::KeyResolution(e) => e.category(),
            Self::TenantContext { .. } => ErrorCategory::Consistency,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Stable error name exposed in rejection bodies.
    #[must_use]
    pub fn name(&self) -> &'static str {
        if self.is_client_error() {
            "UnauthorizedError"
        } else {
            "ServerError"
        }
    }

    /// Stable error code exposed in rejection bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials { .. } => "credentials_required",
            Self::InvalidToken { .. } => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::KeyResolution(e) => e.code(),
            Self::TenantContext { .. } => "tenant_context_unavailable",
            Self::Storage { .. } | Self::Configuration { .. } => "server_error",
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing credentials or unknown issuer.
    Authentication,
    /// Token-related errors (validation, expiration, unusable key).
    Token,
    /// Request validation errors (unsupported algorithm).
    Validation,
    /// Key-set endpoint or storage failures.
    Infrastructure,
    /// Tenant lookups disagreeing within one request.
    Consistency,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Consistency => write!(f, "consistency"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
