//! Tenant directory.
//!
//! Tenants are the isolation unit of the API: each owns an issuer domain,
//! optionally a shared signing secret and an audience. The directory is the
//! read-only lookup the key resolver and the tenant context attacher use to
//! map a token's issuer to its tenant.

use serde::{Deserialize, Serialize};
use url::Url;

// =============================================================================
// Tenant
// =============================================================================

/// A tenant record.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tenant {
    /// Unique tenant name, used as the tenant identifier downstream.
    pub name: String,

    /// Host of the tenant's issuer URL (e.g. `tenant1.auth0.com`).
    #[serde(alias = "domain", alias = "auth0Domain")]
    pub issuer_domain: String,

    /// Base64 shared secret for symmetric (HS256) tokens.
    /// Tenants without one can only use asymmetric tokens.
    #[serde(default, alias = "secret")]
    pub symmetric_secret: Option<String>,

    /// Expected audience of the tenant's tokens. Overrides the global
    /// verification audience when set.
    #[serde(default)]
    pub audience: Option<String>,

    /// Client identifier registered with the tenant's identity provider.
    #[serde(default, alias = "auth0ClientId")]
    pub client_id: Option<String>,
}

impl Tenant {
    /// Creates a tenant without secret, audience or client id.
    pub fn new(name: impl Into<String>, issuer_domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issuer_domain: issuer_domain.into().to_ascii_lowercase(),
            symmetric_secret: None,
            audience: None,
            client_id: None,
        }
    }

    /// Sets the base64 symmetric secret.
    #[must_use]
    pub fn with_symmetric_secret(mut self, secret: impl Into<String>) -> Self {
        self.symmetric_secret = Some(secret.into());
        self
    }

    /// Sets the audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("name", &self.name)
            .field("issuer_domain", &self.issuer_domain)
            .field("has_secret", &self.symmetric_secret.is_some())
            .field("audience", &self.audience)
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Extracts the host of an issuer URL, lowercased.
///
/// Returns `None` if the issuer is not an absolute URL with a host.
#[must_use]
pub fn issuer_host(issuer: &str) -> Option<String> {
    let url = Url::parse(issuer).ok()?;
    url.host_str().map(str::to_ascii_lowercase)
}

// =============================================================================
// Tenant Directory Trait
// =============================================================================

/// Lookup of tenants by token issuer.
///
/// Lookups are synchronous and must be consistent: the same issuer yields
/// the same tenant for the lifetime of the process.
pub trait TenantDirectory: Send + Sync {
    /// Finds the tenant whose issuer domain equals the host of `issuer`.
    ///
    /// Returns `None` if the issuer cannot be parsed or no tenant matches.
    fn find_by_issuer(&self, issuer: &str) -> Option<Tenant>;
}

// =============================================================================
// Static Tenant Directory
// =============================================================================

/// Tenant directory over a fixed list, typically loaded from configuration.
///
/// When several tenants share a domain, the first one in list order wins.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantDirectory {
    tenants: Vec<Tenant>,
}

impl StaticTenantDirectory {
    /// Creates a directory over `tenants`, in the given order.
    #[must_use]
    pub fn new(tenants: Vec<Tenant>) -> Self {
        let tenants = tenants
            .into_iter()
            .map(|mut tenant| {
                tenant.issuer_domain = tenant.issuer_domain.to_ascii_lowercase();
                tenant
            })
            .collect();
        Self { tenants }
    }

    /// Returns all tenants in directory order.
    #[must_use]
    pub fn tenants(&self) -> &[Tenant] {
        &self.tenants
    }
}

impl TenantDirectory for StaticTenantDirectory {
    fn find_by_issuer(&self, issuer: &str) -> Option<Tenant> {
        let host = issuer_host(issuer)?;
        self.tenants
            .iter()
            .find(|t| t.issuer_domain == host)
            .cloned()
    }
}
