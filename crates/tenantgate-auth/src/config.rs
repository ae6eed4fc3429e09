//! Authentication configuration.
//!
//! This module groups the settings of the key cache, the remote key-set
//! fetcher, claim verification and the tenant and user tables loaded at
//! startup.
//!
//! # Example (TOML)
//!
//! ```toml
//! [cache]
//! capacity = 5242880
//! ttl = "5m"
//!
//! [key_set]
//! request_timeout = "5s"
//!
//! [[tenants]]
//! name = "tenant1"
//! issuer_domain = "tenant1.auth0.com"
//!
//! [[tenants]]
//! name = "tenant2"
//! issuer_domain = "tenant2.auth0.com"
//! symmetric_secret = "c2VjcmV0"
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::keys::{KeyCacheConfig, KeySetFetcherConfig, decode_tenant_secret};
use crate::storage::{InMemoryUserDirectory, StaticTenantDirectory, Tenant, User};
use crate::token::VerificationConfig;

/// Root authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Key cache sizing and TTL.
    pub cache: KeyCacheConfig,

    /// Remote key-set fetcher settings.
    pub key_set: KeySetFetcherConfig,

    /// Claim validation settings.
    pub verification: VerificationConfig,

    /// Tenants, in lookup order.
    pub tenants: Vec<Tenant>,

    /// Users per tenant name.
    pub users: HashMap<String, Vec<User>>,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Builds the tenant directory described by `tenants`.
    #[must_use]
    pub fn tenant_directory(&self) -> StaticTenantDirectory {
        StaticTenantDirectory::new(self.tenants.clone())
    }

    /// Builds the user directory described by `users`.
    #[must_use]
    pub fn user_directory(&self) -> InMemoryUserDirectory {
        InMemoryUserDirectory::new(self.users.clone())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if a tenant has no name or domain, and
    /// `ConfigError::InvalidValue` if:
    /// - Two tenants share a name
    /// - A tenant secret is not base64
    /// - The cache capacity or TTL is zero
    /// - The key-set timeout or maximum response size is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for (index, tenant) in self.tenants.iter().enumerate() {
            if tenant.name.trim().is_empty() {
                return Err(ConfigError::Missing(format!("tenants[{index}].name")));
            }
            if tenant.issuer_domain.trim().is_empty() {
                return Err(ConfigError::Missing(format!(
                    "tenants[{index}].issuer_domain"
                )));
            }
            if !names.insert(tenant.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate tenant name '{}'",
                    tenant.name
                )));
            }
            if let Some(secret) = &tenant.symmetric_secret
                && decode_tenant_secret(secret).is_err()
            {
                return Err(ConfigError::InvalidValue(format!(
                    "symmetric_secret of tenant '{}' is not valid base64",
                    tenant.name
                )));
            }
        }

        if self.cache.capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "cache.capacity must be > 0".to_string(),
            ));
        }
        if self.cache.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "cache.ttl must be > 0".to_string(),
            ));
        }
        if self.key_set.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "key_set.request_timeout must be > 0".to_string(),
            ));
        }
        if self.key_set.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "key_set.max_response_size must be > 0".to_string(),
            ));
        }

        if let Some(unknown) = self
            .users
            .keys()
            .find(|name| !self.tenants.iter().any(|t| &t.name == *name))
        {
            tracing::warn!(tenant = %unknown, "Users configured for an unknown tenant");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> AuthConfig {
        AuthConfig {
            tenants: vec![
                Tenant::new("tenant1", "tenant1.auth0.com"),
                Tenant::new("tenant2", "tenant2.auth0.com").with_symmetric_secret("c2VjcmV0"),
            ],
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_default_config_validates() {
        assert!(AuthConfig::default().validate().is_ok());
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_default_sections() {
        let config = AuthConfig::default();
        assert_eq!(config.cache.capacity, 5 * 1024 * 1024);
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.key_set.request_timeout, Duration::from_secs(5));
        assert!(!config.key_set.allow_http);
        assert!(!config.key_set.danger_accept_invalid_certs);
        assert_eq!(config.verification.audience, None);
    }

    #[test]
    fn test_duplicate_tenant_name_fails_validation() {
        let mut config = config();
        config
            .tenants
            .push(Tenant::new("tenant1", "other.auth0.com"));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_empty_tenant_fields_fail_validation() {
        let mut config = config();
        config.tenants.push(Tenant::new("", "x.auth0.com"));
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        let mut config = self::config();
        config.tenants.push(Tenant::new("tenant3", " "));
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_undecodable_secret_fails_validation() {
        let mut config = config();
        config.tenants[0].symmetric_secret = Some("not base64!".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tenant1"));
    }

    #[test]
    fn test_zero_limits_fail_validation() {
        let mut config = config();
        config.cache.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.cache.ttl = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.key_set.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.key_set.max_response_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: AuthConfig = serde_json::from_value(serde_json::json!({
            "cache": { "ttl": "10m" },
            "key_set": { "request_timeout": "2s", "allow_http": true },
            "verification": { "audience": "api", "leeway": "30s" },
            "tenants": [
                { "name": "tenant2", "domain": "tenant2.auth0.com", "secret": "c2VjcmV0" }
            ],
            "users": {
                "tenant2": [ { "id": "1", "name": "Ada" } ]
            }
        }))
        .unwrap();

        assert_eq!(config.cache.ttl, Duration::from_secs(600));
        assert_eq!(config.cache.capacity, 5 * 1024 * 1024);
        assert_eq!(config.key_set.request_timeout, Duration::from_secs(2));
        assert!(config.key_set.allow_http);
        assert_eq!(config.verification.leeway, Duration::from_secs(30));
        assert_eq!(config.tenant_directory().tenants().len(), 1);
        assert_eq!(config.users["tenant2"][0].name, "Ada");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("test error".to_string());
        assert_eq!(err.to_string(), "Invalid configuration value: test error");

        let err = ConfigError::Missing("tenants[0].name".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required configuration: tenants[0].name"
        );
    }
}
