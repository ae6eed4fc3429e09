use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tenantgate_auth::{AuthError, AuthState, UserDirectory, require_tenant_auth};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers};

/// Shared state of the API handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserDirectory>,
}

pub struct TenantgateServer {
    addr: SocketAddr,
    app: Router,
}

/// Builds the router: every `/api` route requires a verified tenant token.
pub fn build_router(auth: AuthState, state: AppState) -> Router {
    let api = Router::new()
        .route("/users", get(handlers::list_users))
        .layer(middleware::from_fn_with_state(auth, require_tenant_auth))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

/// Builds the router from configuration.
pub fn build_app(cfg: &AppConfig) -> Result<Router, AuthError> {
    let auth = AuthState::from_config(&cfg.auth)?;
    let state = AppState {
        users: Arc::new(cfg.auth.user_directory()),
    };
    Ok(build_router(auth, state))
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn build(self) -> Result<TenantgateServer, AuthError> {
        let app = build_app(&self.config)?;
        tracing::info!(tenants = self.config.auth.tenants.len(), "Tenant directory loaded");

        Ok(TenantgateServer {
            addr: self.config.addr(),
            app,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantgateServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
