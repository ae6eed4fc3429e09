use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tenantgate_auth::{Tenant, User};
use tenantgate_server::{AppConfig, build_app};
use tower::ServiceExt;

const TENANT1_SECRET: &[u8] = b"tenant-one-secret";
const TENANT2_SECRET: &[u8] = b"tenant-two-secret";

fn user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: None,
    }
}

fn app() -> Router {
    let mut cfg = AppConfig::default();
    cfg.auth.tenants = vec![
        Tenant::new("tenant1", "tenant1.auth0.com").with_symmetric_secret(STANDARD.encode(TENANT1_SECRET)),
        Tenant::new("tenant2", "tenant2.auth0.com").with_symmetric_secret(STANDARD.encode(TENANT2_SECRET)),
        Tenant::new("tenant3", "tenant3.auth0.com"),
    ];
    cfg.auth.users = HashMap::from([
        ("tenant1".to_string(), vec![user("1", "Ada"), user("2", "Alan")]),
        ("tenant2".to_string(), vec![user("3", "Grace")]),
    ]);
    build_app(&cfg).expect("app")
}

fn token(issuer: &str, secret: &[u8]) -> String {
    let exp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() + 600;
    encode(
        &Header::default(),
        &json!({"iss": issuer, "aud": "spa", "sub": "someone", "exp": exp}),
        &EncodingKey::from_secret(secret),
    )
    .unwrap()
}

async fn get_users(app: Router, bearer: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri("/api/users");
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn users_are_scoped_to_token_tenant() {
    let (status, body) = get_users(
        app(),
        Some(&token("https://tenant1.auth0.com/", TENANT1_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"id": "1", "name": "Ada"}, {"id": "2", "name": "Alan"}])
    );

    let (status, body) = get_users(
        app(),
        Some(&token("https://tenant2.auth0.com/", TENANT2_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": "3", "name": "Grace"}]));
}

#[tokio::test]
async fn tenant_secret_cannot_sign_for_another_tenant() {
    let (status, body) = get_users(
        app(),
        Some(&token("https://tenant1.auth0.com/", TENANT2_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"name": "UnauthorizedError", "code": "invalid_token"}));
}

#[tokio::test]
async fn tenant_without_users_gets_empty_list() {
    let mut cfg = AppConfig::default();
    cfg.auth.tenants =
        vec![Tenant::new("tenant9", "tenant9.auth0.com").with_symmetric_secret(STANDARD.encode(TENANT1_SECRET))];
    let app = build_app(&cfg).unwrap();

    let (status, body) = get_users(app, Some(&token("https://tenant9.auth0.com/", TENANT1_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let (status, body) = get_users(app(), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "credentials_required");
}

#[tokio::test]
async fn symmetric_token_for_tenant_without_secret_is_rejected() {
    let (status, body) = get_users(
        app(),
        Some(&token("https://tenant3.auth0.com/", TENANT1_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unsupported_algorithm");
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/users")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}
