//! RS256 tokens verified against a certificate served from the issuer's key set.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware,
    routing::get,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use tenantgate_auth::keys::{HttpKeySetFetcher, KeyCache, KeyResolver, KeySetFetcherConfig};
use tenantgate_auth::storage::{StaticTenantDirectory, Tenant};
use tenantgate_auth::{
    AuthConfig, AuthError, AuthState, TenantContext, TokenVerifier, VerificationConfig,
    require_tenant_auth,
};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIGNING_KEY: &str = include_str!("fixtures/tenant1_signing_key.pem");
const OTHER_SIGNING_KEY: &str = include_str!("fixtures/other_signing_key.pem");
const CERTIFICATE: &str = include_str!("fixtures/tenant1_certificate.pem");
const KID: &str = "tenant1-signing";

/// Base64 DER body of the fixture certificate, as published in `x5c`.
fn x5c() -> String {
    CERTIFICATE
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect()
}

async fn key_set_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [{ "kid": KID, "kty": "RSA", "use": "sig", "x5c": [x5c()] }]
        })))
        .mount(&server)
        .await;
    server
}

fn issuer(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

fn fetcher_config() -> KeySetFetcherConfig {
    KeySetFetcherConfig::default().with_allow_http(true)
}

fn rs256_token(issuer: &str, signing_key: &str) -> String {
    let exp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() + 600;
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    encode(
        &header,
        &json!({"iss": issuer, "aud": "api", "sub": "user-1", "exp": exp}),
        &EncodingKey::from_rsa_pem(signing_key.as_bytes()).unwrap(),
    )
    .unwrap()
}

fn verifier() -> TokenVerifier {
    let directory = StaticTenantDirectory::new(vec![Tenant::new("tenant1", "127.0.0.1")]);
    let resolver = KeyResolver::new(
        Arc::new(KeyCache::with_defaults()),
        Arc::new(directory),
        Arc::new(HttpKeySetFetcher::new(fetcher_config()).unwrap()),
    );
    TokenVerifier::new(Arc::new(resolver), VerificationConfig::default())
}

#[tokio::test]
async fn token_signed_by_certificate_key_is_verified() {
    let server = key_set_server().await;
    let token = rs256_token(&issuer(&server), SIGNING_KEY);

    let verified = verifier().verify(&token).await.unwrap();
    assert_eq!(verified.issuer(), issuer(&server));
    assert_eq!(verified.claims.sub.as_deref(), Some("user-1"));
    assert_eq!(verified.header.key_id.as_deref(), Some(KID));
}

#[tokio::test]
async fn token_signed_by_other_key_is_rejected() {
    let server = key_set_server().await;
    let token = rs256_token(&issuer(&server), OTHER_SIGNING_KEY);

    let err = verifier().verify(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken { .. }), "got {err:?}");
}

async fn whoami(tenant: TenantContext) -> String {
    tenant.tenant().to_string()
}

async fn call(token: &str) -> (StatusCode, Vec<u8>) {
    let config = AuthConfig {
        key_set: fetcher_config(),
        tenants: vec![Tenant::new("tenant1", "127.0.0.1")],
        ..AuthConfig::default()
    };
    let app = Router::new()
        .route("/whoami", get(whoami))
        .layer(middleware::from_fn_with_state(
            AuthState::from_config(&config).unwrap(),
            require_tenant_auth,
        ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    (status, body)
}

#[tokio::test]
async fn middleware_accepts_rs256_token() {
    let server = key_set_server().await;
    let token = rs256_token(&issuer(&server), SIGNING_KEY);

    let (status, body) = call(&token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"tenant1");
}

#[tokio::test]
async fn middleware_rejects_rs256_token_from_other_key() {
    let server = key_set_server().await;
    let token = rs256_token(&issuer(&server), OTHER_SIGNING_KEY);

    let (status, body) = call(&token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"name": "UnauthorizedError", "code": "invalid_token"}));
}
