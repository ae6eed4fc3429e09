//! # tenantgate-auth
//!
//! Tenant-aware bearer token authentication for the Tenantgate API.
//!
//! This crate provides:
//! - Tenant lookup by token issuer
//! - Signing key resolution with a bounded TTL/LRU cache
//! - Remote key-set fetching with per-issuer request coalescing
//! - Token verification (`HS256` tenant secrets, `RS256` published certificates)
//! - Axum middleware attaching the tenant context to requests
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`keys`] - Key cache, key-set fetcher and resolver
//! - [`token`] - Token parsing and verification
//! - [`middleware`] - HTTP middleware and rejection responses
//! - [`storage`] - Tenant and user directories

pub mod config;
pub mod error;
pub mod keys;
pub mod middleware;
pub mod storage;
pub mod token;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use keys::{
    CacheKey, HttpKeySetFetcher, KeyCache, KeyCacheConfig, KeyMaterial, KeyResolutionError,
    KeyResolver, KeySetFetcher, KeySetFetcherConfig, RemoteKeySet, SigningAlgorithm,
};
pub use middleware::{AuthState, TenantContext, TenantContextAttacher, require_tenant_auth};
pub use storage::{
    InMemoryUserDirectory, StaticTenantDirectory, Tenant, TenantDirectory, User, UserDirectory,
};
pub use token::{TokenVerifier, VerificationConfig, VerifiedClaims, VerifiedToken};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tenantgate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::keys::{KeyCache, KeyResolutionError, KeyResolver, KeySetFetcher};
    pub use crate::middleware::{AuthState, TenantContext, require_tenant_auth};
    pub use crate::storage::{Tenant, TenantDirectory, User, UserDirectory};
    pub use crate::token::{TokenVerifier, VerifiedToken};
}
