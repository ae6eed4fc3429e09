use axum::{Json, extract::State};
use tenantgate_auth::{AuthError, TenantContext, User};

use crate::server::AppState;

/// `GET /api/users`: the users of the caller's tenant.
pub async fn list_users(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<User>>, AuthError> {
    let users = state.users.users_by_tenant(tenant.tenant()).await?;
    tracing::debug!(tenant = %tenant.tenant(), count = users.len(), "Listed users");
    Ok(Json(users))
}
