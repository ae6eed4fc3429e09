//! Bearer token verification.
//!
//! [`TokenVerifier`] is the entry point the HTTP layer calls for each
//! request. It reads the unverified header and payload, asks the
//! [`KeyResolver`] for the tenant's key and then checks the signature and
//! time claims with `jsonwebtoken`.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Validation, decode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::keys::{KeyResolutionError, KeyResolver, SigningAlgorithm, TokenHeader, TokenPayload};

// =============================================================================
// Configuration
// =============================================================================

/// Claim validation settings applied after the signature check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Required `aud` value for tenants without their own audience.
    /// Audience is not checked when neither is set.
    pub audience: Option<String>,

    /// Clock skew tolerated on `exp` and `nbf`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
}

impl VerificationConfig {
    /// Creates a configuration without audience check and zero leeway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the given audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the clock skew leeway.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }
}

// =============================================================================
// Claims
// =============================================================================

/// The `aud` claim, which may be a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience.
    One(String),
    /// Several audiences.
    Many(Vec<String>),
}

impl Audience {
    /// Renders the audience as one string, joining arrays with `,`.
    #[must_use]
    pub fn joined(&self) -> String {
        match self {
            Self::One(aud) => aud.clone(),
            Self::Many(auds) => auds.join(","),
        }
    }
}

/// Claims of a token whose signature has been verified.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VerifiedClaims {
    /// Issuer (`iss`).
    pub iss: String,

    /// Subject (`sub`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience (`aud`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiration time (`exp`), seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// All other claims.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A verified token together with the header it was verified under.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// Algorithm and key id of the token.
    pub header: TokenHeader,
    /// Verified claims.
    pub claims: VerifiedClaims,
}

impl VerifiedToken {
    /// The verified issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
}

// =============================================================================
// Unverified Parsing
// =============================================================================

/// Splits a compact JWT and decodes one of its JSON segments.
fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::invalid_token(format!("token {what} is not base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::invalid_token(format!("token {what} is not valid JSON")))
}

/// Reads the unverified header and payload of a compact JWT.
///
/// # Errors
///
/// - `InvalidToken` if the token is not three base64url JSON segments
/// - `UnsupportedAlgorithm` if `alg` is neither `HS256` nor `RS256`
pub fn parse_unverified(token: &str) -> Result<(TokenHeader, TokenPayload), AuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::invalid_token("jwt malformed"));
    };

    let raw_header: RawHeader = decode_segment(header, "header")?;
    let raw_payload: RawPayload = decode_segment(payload, "payload")?;

    let algorithm: SigningAlgorithm = raw_header.alg.parse()?;

    Ok((
        TokenHeader {
            algorithm,
            key_id: raw_header.kid,
        },
        TokenPayload::new(
            raw_payload.iss.unwrap_or_default(),
            raw_payload.aud.map(|aud| aud.joined()).unwrap_or_default(),
        ),
    ))
}

// =============================================================================
// Token Verifier
// =============================================================================

/// Verifies tenant bearer tokens.
pub struct TokenVerifier {
    resolver: Arc<KeyResolver>,
    config: VerificationConfig,
}

impl TokenVerifier {
    /// Creates a verifier that resolves keys through `resolver`.
    pub fn new(resolver: Arc<KeyResolver>, config: VerificationConfig) -> Self {
        Self { resolver, config }
    }

    /// Returns the key resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<KeyResolver> {
        &self.resolver
    }

    /// Verifies a compact JWT.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for malformed tokens, bad signatures or failed claims
    /// - `TokenExpired` if `exp` has passed
    /// - `KeyResolution` if no key could be resolved for the token
    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let (header, payload) = parse_unverified(token)?;

        let material = self.resolver.resolve(&header, &payload).await?;
        let decoding_key = material.to_decoding_key()?;

        let mut validation = Validation::new(header.algorithm.jwt_algorithm());
        validation.leeway = self.config.leeway.as_secs();
        validation.required_spec_claims.clear();
        // A tenant's own audience takes precedence over the global one.
        let audience = self
            .resolver
            .directory()
            .find_by_issuer(&payload.issuer)
            .and_then(|tenant| tenant.audience)
            .or_else(|| self.config.audience.clone());
        match &audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<VerifiedClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(issuer = %payload.issuer, error = %e, "Token verification failed");
            map_jwt_error(e)
        })?;

        tracing::trace!(issuer = %data.claims.iss, algorithm = %header.algorithm, "Token verified");

        Ok(VerifiedToken {
            header,
            claims: data.claims,
        })
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            KeyResolutionError::malformed_key(err.to_string()).into()
        }
        _ => AuthError::invalid_token(err.to_string()),
    }
}
