//! Bearer token authentication middleware.
//!
//! [`require_tenant_auth`] guards a router: it extracts the bearer token,
//! verifies it against the issuing tenant's key and stores the
//! [`TenantContext`] in request extensions for downstream handlers.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use tenantgate_auth::middleware::{AuthState, TenantContext, require_tenant_auth};
//!
//! async fn whoami(tenant: TenantContext) -> String {
//!     tenant.tenant().to_string()
//! }
//!
//! let api = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn_with_state(auth_state, require_tenant_auth));
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::AuthConfig;
use crate::error::{AuthError, ErrorCategory};
use crate::keys::{HttpKeySetFetcher, KeyCache, KeyResolver};
use crate::storage::TenantDirectory;
use crate::token::TokenVerifier;

use super::context::{TenantContext, TenantContextAttacher};

// =============================================================================
// Auth State
// =============================================================================

/// State required by [`require_tenant_auth`].
#[derive(Clone)]
pub struct AuthState {
    /// Token verifier (key resolution and signature check).
    pub verifier: Arc<TokenVerifier>,

    /// Post-verification tenant lookup.
    pub attacher: TenantContextAttacher,
}

impl AuthState {
    /// Creates a new auth state.
    ///
    /// `directory` must be the directory the verifier's resolver uses.
    pub fn new(verifier: Arc<TokenVerifier>, directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            verifier,
            attacher: TenantContextAttacher::new(directory),
        }
    }

    /// Wires cache, tenant directory, key-set fetcher, resolver and verifier
    /// from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the HTTP client cannot be built.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let cache = Arc::new(KeyCache::new(config.cache.clone()));
        let directory: Arc<dyn TenantDirectory> = Arc::new(config.tenant_directory());
        let fetcher = HttpKeySetFetcher::new(config.key_set.clone())
            .map_err(|e| AuthError::configuration(format!("key set HTTP client: {e}")))?;

        let resolver = KeyResolver::new(cache, Arc::clone(&directory), Arc::new(fetcher));
        let verifier = TokenVerifier::new(Arc::new(resolver), config.verification.clone());

        Ok(Self::new(Arc::new(verifier), directory))
    }

    /// Verifies a bearer token and resolves its tenant context.
    ///
    /// # Errors
    ///
    /// Returns the verification or tenant context error.
    pub async fn authenticate(&self, token: &str) -> Result<TenantContext, AuthError> {
        let verified = self.verifier.verify(token).await?;
        self.attacher.attach(verified)
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Authentication middleware that validates bearer tokens and injects
/// [`TenantContext`].
///
/// Rejections are `AuthError` responses: 401 for credential problems, 500
/// for server-side faults.
pub async fn require_tenant_auth(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(req.headers()) {
        Ok(token) => token,
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "Rejected request without bearer token");
            return e.into_response();
        }
    };

    match state.authenticate(token).await {
        Ok(context) => {
            tracing::debug!(tenant = %context.tenant(), "Token validated successfully");
            req.extensions_mut().insert(context);
            next.run(req).await
        }
        Err(e) => {
            log_rejection(&e);
            e.into_response()
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
///
/// # Errors
///
/// Returns `MissingCredentials` if the header is absent, not ASCII, uses
/// another scheme or carries an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::missing_credentials("No authorization token was found"))?
        .to_str()
        .map_err(|_| AuthError::missing_credentials("Authorization header is not ASCII"))?;

    match value.split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
        {
            Ok(token.trim())
        }
        _ => Err(AuthError::missing_credentials(
            "Format is Authorization: Bearer [token]",
        )),
    }
}

fn log_rejection(error: &AuthError) {
    match error.category() {
        ErrorCategory::Infrastructure => {
            tracing::warn!(error = %error, code = error.code(), "Key set unavailable, rejecting token");
        }
        ErrorCategory::Consistency | ErrorCategory::Configuration => {
            tracing::error!(error = %error, code = error.code(), "Authentication failed on the server side");
        }
        _ => {
            tracing::debug!(error = %error, code = error.code(), "Token rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(&headers("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_bearer_token_missing() {
        let err = bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.code(), "credentials_required");
    }

    #[test]
    fn test_bearer_token_bad_format() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer   ", "abc.def.ghi"] {
            let err = bearer_token(&headers(value)).unwrap_err();
            assert!(
                matches!(err, AuthError::MissingCredentials { .. }),
                "{value}"
            );
        }
    }

    #[test]
    fn test_from_config() {
        let state = AuthState::from_config(&AuthConfig::default()).unwrap();
        assert!(state.verifier.resolver().cache().is_empty());
    }
}
