//! Error response handling for authentication middleware.
//!
//! This module implements `IntoResponse` for `AuthError`. Rejection bodies
//! only carry a stable name and code, never key material or upstream error
//! text:
//!
//! ```json
//! { "name": "UnauthorizedError", "code": "invalid_token" }
//! ```

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

/// Realm announced in `WWW-Authenticate`.
const REALM: &str = "tenantgate";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let body = error_body(&self);

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(&self);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}

/// HTTP status for an error: 401 for credential problems, 500 otherwise.
#[must_use]
pub fn status_code(error: &AuthError) -> StatusCode {
    if error.is_client_error() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// The JSON body sent for an error.
#[must_use]
pub fn error_body(error: &AuthError) -> serde_json::Value {
    json!({
        "name": error.name(),
        "code": error.code(),
    })
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="tenantgate", error="invalid_token"`. Requests
/// without credentials get the bare challenge.
fn build_www_authenticate_header(error: &AuthError) -> String {
    match error {
        AuthError::MissingCredentials { .. } => format!("Bearer realm=\"{REALM}\""),
        _ => format!("Bearer realm=\"{REALM}\", error=\"invalid_token\""),
    }
}
