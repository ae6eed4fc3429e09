//! Storage interfaces consumed by the auth module.
//!
//! - Tenant records, looked up by token issuer
//! - Users, listed per tenant
//!
//! Both are read-only from this crate's point of view. The in-memory
//! implementations here are loaded from configuration at startup.

pub mod tenant;
pub mod user;

pub use tenant::{StaticTenantDirectory, Tenant, TenantDirectory, issuer_host};
pub use user::{InMemoryUserDirectory, User, UserDirectory};
