//! Remote key-set fetching.
//!
//! Asymmetric tenant tokens are verified with a certificate published at the
//! issuer's well-known key-set endpoint:
//!
//! ```text
//! GET <issuer>.well-known/jwks.json
//!
//! { "keys": [ { "kid": "...", "x5c": ["<base64 DER>", ...] }, ... ] }
//! ```
//!
//! Only `kid` and the first `x5c` certificate are used; everything else in
//! the response is ignored.
//!
//! # Security Considerations
//!
//! - TLS certificates are verified unless `danger_accept_invalid_certs` is set
//! - Only HTTPS issuers are fetched unless `allow_http` is set
//! - Requests are bounded by a timeout and responses by a maximum size

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::KeyResolutionError;

/// Path appended verbatim to the issuer to locate its key set.
pub const WELL_KNOWN_JWKS_PATH: &str = ".well-known/jwks.json";

const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_FOOTER: &str = "-----END CERTIFICATE-----";
const PEM_LINE_WIDTH: usize = 64;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the remote key-set fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct KeySetFetcherConfig {
    /// HTTP request timeout (default: 5 seconds).
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum response size in bytes (default: 1 MB).
    pub max_response_size: usize,

    /// Whether to allow HTTP (non-HTTPS) issuers.
    /// This should only be enabled for testing.
    pub allow_http: bool,

    /// Skip TLS certificate verification of the key-set endpoint.
    /// Only for test environments with self-signed certificates.
    pub danger_accept_invalid_certs: bool,
}

impl Default for KeySetFetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            max_response_size: 1024 * 1024,
            allow_http: false,
            danger_accept_invalid_certs: false,
        }
    }
}

impl KeySetFetcherConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum response size.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Allows HTTP (non-HTTPS) issuers.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Disables TLS certificate verification.
    ///
    /// # Warning
    ///
    /// Anyone able to intercept traffic to the issuer can then substitute
    /// their own signing keys. Never enable this in production.
    #[must_use]
    pub fn with_danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }
}

// =============================================================================
// Key Set
// =============================================================================

/// One published key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteKey {
    /// Key identifier. Keys without one can never be selected.
    #[serde(default)]
    pub kid: Option<String>,

    /// Certificate chain, base64 DER, leaf first.
    #[serde(default)]
    pub x5c: Vec<String>,
}

/// Parsed key-set response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteKeySet {
    /// Published keys, in response order.
    pub keys: Vec<RemoteKey>,
}

impl RemoteKeySet {
    /// Returns the first key whose `kid` equals `kid`.
    #[must_use]
    pub fn find(&self, kid: Option<&str>) -> Option<&RemoteKey> {
        let kid = kid?;
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

/// Builds the key-set URL for an issuer by plain concatenation.
#[must_use]
pub fn key_set_url(issuer: &str) -> String {
    format!("{issuer}{WELL_KNOWN_JWKS_PATH}")
}

/// Wraps a base64 DER certificate into PEM.
///
/// The body is split into lines of 64 characters, the last one possibly
/// shorter, between the certificate banners. Every line ends with `\n`.
#[must_use]
pub fn certificate_to_pem(certificate: &str) -> String {
    let chars: Vec<char> = certificate.chars().collect();
    let mut pem = String::with_capacity(certificate.len() + certificate.len() / 64 + 64);

    pem.push_str(PEM_HEADER);
    pem.push('\n');
    for line in chars.chunks(PEM_LINE_WIDTH) {
        pem.extend(line);
        pem.push('\n');
    }
    pem.push_str(PEM_FOOTER);
    pem.push('\n');
    pem
}

// =============================================================================
// Fetcher
// =============================================================================

/// Retrieves an issuer's published key set.
///
/// Implemented over HTTP by [`HttpKeySetFetcher`]; the trait is the seam the
/// resolver is tested through.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    /// Fetches and parses the key set of `issuer`.
    ///
    /// # Errors
    ///
    /// - `Network` on transport failure or timeout
    /// - `Protocol` on a non-200 status or a body that is not a key set
    async fn fetch_key_set(&self, issuer: &str) -> Result<RemoteKeySet, KeyResolutionError>;
}

/// `reqwest`-backed key-set fetcher.
pub struct HttpKeySetFetcher {
    http_client: reqwest::Client,
    config: KeySetFetcherConfig,
}

impl HttpKeySetFetcher {
    /// Creates a fetcher with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (for example when
    /// the TLS backend fails to initialize).
    pub fn new(config: KeySetFetcherConfig) -> Result<Self, reqwest::Error> {
        if config.danger_accept_invalid_certs {
            tracing::warn!("TLS certificate verification disabled for key-set endpoints");
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Returns the fetcher configuration.
    #[must_use]
    pub fn config(&self) -> &KeySetFetcherConfig {
        &self.config
    }

    fn validate_scheme(&self, url: &Url) -> Result<(), KeyResolutionError> {
        match url.scheme() {
            "https" => Ok(()),
            "http" if self.config.allow_http => Ok(()),
            _ => Err(KeyResolutionError::protocol("insecure key set url")),
        }
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch_key_set(&self, issuer: &str) -> Result<RemoteKeySet, KeyResolutionError> {
        let url = Url::parse(&key_set_url(issuer))
            .map_err(|e| KeyResolutionError::protocol(format!("invalid key set url: {e}")))?;
        self.validate_scheme(&url)?;

        tracing::debug!(url = %url, "Fetching key set");

        let response = self
            .http_client
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Failed to fetch key set");
                KeyResolutionError::network(describe_transport_error(&e))
            })?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::warn!(url = %url, status = %response.status(), "Key set endpoint returned unexpected status");
            return Err(KeyResolutionError::protocol("unexpected status"));
        }

        let too_large = || KeyResolutionError::protocol("response too large");
        if let Some(len) = response.content_length()
            && len > self.config.max_response_size as u64
        {
            return Err(too_large());
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to read key set body");
            KeyResolutionError::network(describe_transport_error(&e))
        })?;
        if body.len() > self.config.max_response_size {
            return Err(too_large());
        }

        let key_set: RemoteKeySet = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to parse key set");
            KeyResolutionError::protocol("malformed key set")
        })?;

        tracing::debug!(url = %url, keys = key_set.keys.len(), "Fetched key set");
        Ok(key_set)
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "timed out".to_string()
    } else {
        error.to_string()
    }
}
