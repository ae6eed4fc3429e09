//! Request-scoped tenant context.
//!
//! After a token verifies, its issuer is looked up in the tenant directory a
//! second time and the resulting tenant name is attached to the request.
//! Handlers read it with the [`TenantContext`] extractor.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AuthError;
use crate::storage::TenantDirectory;
use crate::token::{VerifiedClaims, VerifiedToken};

// =============================================================================
// Tenant Context
// =============================================================================

/// The authenticated tenant of a request.
///
/// The `claims` field is wrapped in `Arc` so the context stays cheap to
/// clone out of request extensions.
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Name of the tenant that issued the token.
    pub tenant: String,

    /// Verified token claims.
    pub claims: Arc<VerifiedClaims>,
}

impl TenantContext {
    /// Tenant identifier used by downstream storage.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// The verified issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }

    /// The token subject, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<TenantContext>().cloned().ok_or_else(|| {
            tracing::error!(path = %parts.uri.path(), "Tenant context requested on an unauthenticated route");
            AuthError::configuration("tenant authentication is not installed on this route")
        })
    }
}

// =============================================================================
// Attacher
// =============================================================================

/// Resolves the tenant of a verified token.
#[derive(Clone)]
pub struct TenantContextAttacher {
    directory: Arc<dyn TenantDirectory>,
}

impl TenantContextAttacher {
    /// Creates an attacher over the same directory the key resolver uses.
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self { directory }
    }

    /// Builds the tenant context for a verified token.
    ///
    /// # Errors
    ///
    /// Returns `TenantContext` if the issuer no longer resolves to a tenant.
    /// Key resolution found a tenant for the same issuer moments earlier, so
    /// this is a server-side consistency fault.
    pub fn attach(&self, verified: VerifiedToken) -> Result<TenantContext, AuthError> {
        let issuer = verified.issuer();
        let Some(tenant) = self.directory.find_by_issuer(issuer) else {
            tracing::error!(issuer = %issuer, "Verified issuer has no tenant");
            return Err(AuthError::tenant_context(issuer));
        };

        Ok(TenantContext {
            tenant: tenant.name,
            claims: Arc::new(verified.claims),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{SigningAlgorithm, TokenHeader};
    use crate::storage::{StaticTenantDirectory, Tenant};

    fn verified(issuer: &str) -> VerifiedToken {
        VerifiedToken {
            header: TokenHeader {
                algorithm: SigningAlgorithm::Symmetric,
                key_id: None,
            },
            claims: VerifiedClaims {
                iss: issuer.to_string(),
                sub: Some("user-1".to_string()),
                aud: None,
                exp: None,
                extra: serde_json::Map::new(),
            },
        }
    }

    fn attacher() -> TenantContextAttacher {
        TenantContextAttacher::new(Arc::new(StaticTenantDirectory::new(vec![Tenant::new(
            "tenant1",
            "tenant1.auth0.com",
        )])))
    }

    #[test]
    fn test_attach_tenant() {
        let context = attacher()
            .attach(verified("https://tenant1.auth0.com/"))
            .unwrap();
        assert_eq!(context.tenant(), "tenant1");
        assert_eq!(context.issuer(), "https://tenant1.auth0.com/");
        assert_eq!(context.subject(), Some("user-1"));
    }

    #[test]
    fn test_attach_unknown_issuer_is_server_fault() {
        let err = attacher()
            .attach(verified("https://gone.auth0.com/"))
            .unwrap_err();
        assert!(matches!(err, AuthError::TenantContext { .. }));
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn test_extractor_reads_extensions() {
        let context = attacher()
            .attach(verified("https://tenant1.auth0.com/"))
            .unwrap();
        let mut request = axum::http::Request::builder()
            .uri("/api/users")
            .body(())
            .unwrap();
        request.extensions_mut().insert(context);
        let (mut parts, ()) = request.into_parts();

        let extracted = TenantContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted.tenant, "tenant1");
    }

    #[tokio::test]
    async fn test_extractor_without_middleware() {
        let request = axum::http::Request::builder()
            .uri("/api/users")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();

        let err = TenantContext::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(err.is_server_error());
    }
}
