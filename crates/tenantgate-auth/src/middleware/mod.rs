//! HTTP middleware for tenant authentication.
//!
//! This module provides Axum middleware for:
//!
//! - Bearer token extraction and verification
//! - Tenant context injection
//! - Rejection responses

pub mod auth;
pub mod context;
pub mod error;

pub use auth::{AuthState, bearer_token, require_tenant_auth};
pub use context::{TenantContext, TenantContextAttacher};
pub use error::{error_body, status_code};
