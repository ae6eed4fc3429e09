//! User directory.
//!
//! Downstream handlers list the users of the authenticated tenant through
//! [`UserDirectory`], keyed by the tenant name attached to the request.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// A user belonging to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    /// User identifier, unique within the tenant.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Lookup of users by tenant identifier.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the users of a tenant. Unknown tenants have no users.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn users_by_tenant(&self, tenant: &str) -> AuthResult<Vec<User>>;
}

/// User directory held in memory, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: HashMap<String, Vec<User>>,
}

impl InMemoryUserDirectory {
    /// Creates a directory from a tenant name → users map.
    #[must_use]
    pub fn new(users: HashMap<String, Vec<User>>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn users_by_tenant(&self, tenant: &str) -> AuthResult<Vec<User>> {
        Ok(self.users.get(tenant).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: format!("User {id}"),
            email: None,
        }
    }

    #[tokio::test]
    async fn test_users_by_tenant() {
        let directory = InMemoryUserDirectory::new(HashMap::from([
            ("tenant1".to_string(), vec![user("1"), user("2")]),
            ("tenant2".to_string(), vec![user("3")]),
        ]));

        let users = directory.users_by_tenant("tenant1").await.unwrap();
        assert_eq!(users, vec![user("1"), user("2")]);

        let users = directory.users_by_tenant("tenant2").await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_unknown_tenant_has_no_users() {
        let directory = InMemoryUserDirectory::default();
        let users = tokio_test::block_on(directory.users_by_tenant("nobody")).unwrap();
        assert!(users.is_empty());
    }

    #[test]
    fn test_user_serialization_skips_missing_email() {
        let json = serde_json::to_value(user("1")).unwrap();
        assert_eq!(json, serde_json::json!({"id": "1", "name": "User 1"}));
    }
}
