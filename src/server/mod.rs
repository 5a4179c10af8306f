//! Server initialization and routing

pub mod handler;

use crate::api;
use crate::config::Config;
use crate::gateway::GatewayForwarder;
use crate::jwt::JwtManager;
use crate::middleware::{
    api_gate, gateway_gate, normalize_error_response, ObservabilityLayer, SanitizedMakeSpan,
};
use crate::repository::{
    application::ApplicationRepositoryImpl, client::ClientRepositoryImpl, user::UserRepositoryImpl,
    DbPool,
};
use crate::service::{ApplicationService, IdentityService};
use crate::state::HasServices;
use anyhow::{Context, Result};
use axum::{
    routing::{any, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: DbPool,
    pub identity_service: Arc<IdentityService<UserRepositoryImpl>>,
    pub application_service:
        Arc<ApplicationService<ApplicationRepositoryImpl, ClientRepositoryImpl>>,
    pub jwt_manager: JwtManager,
    pub gateway: Arc<GatewayForwarder>,
}

impl AppState {
    /// Connect to the store and wire every service from one configuration.
    pub async fn connect(config: Config) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
            .connect(&config.database.url)
            .await
            .context("Failed to connect to database")?;
        info!("Connected to database");

        let db_pool = DbPool::new(
            pool,
            Duration::from_secs(config.database.query_timeout_secs),
        );

        let user_repo = Arc::new(UserRepositoryImpl::new(db_pool.clone()));
        let application_repo = Arc::new(ApplicationRepositoryImpl::new(db_pool.clone()));
        let client_repo = Arc::new(ClientRepositoryImpl::new(db_pool.clone()));

        let jwt_manager = JwtManager::new(config.jwt.clone())?;
        let gateway = Arc::new(GatewayForwarder::new(&config.gateway)?);

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            identity_service: Arc::new(IdentityService::new(user_repo)),
            application_service: Arc::new(ApplicationService::new(application_repo, client_repo)),
            jwt_manager,
            gateway,
        })
    }
}

/// Implement HasServices trait for production AppState
impl HasServices for AppState {
    type UserRepo = UserRepositoryImpl;
    type ApplicationRepo = ApplicationRepositoryImpl;
    type ClientRepo = ClientRepositoryImpl;

    fn config(&self) -> &Config {
        &self.config
    }

    fn identity_service(&self) -> &IdentityService<Self::UserRepo> {
        &self.identity_service
    }

    fn application_service(
        &self,
    ) -> &ApplicationService<Self::ApplicationRepo, Self::ClientRepo> {
        &self.application_service
    }

    fn jwt_manager(&self) -> &JwtManager {
        &self.jwt_manager
    }

    fn gateway(&self) -> &GatewayForwarder {
        &self.gateway
    }

    async fn check_ready(&self) -> bool {
        self.db_pool.ping().await
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn metrics_router(metrics: Option<PrometheusHandle>) -> Router {
    Router::new()
        .route("/metrics", get(api::metrics::metrics_handler))
        .with_state(Arc::new(metrics))
}

/// Build the REST API router with generic state type
///
/// Generic over the state so tests drive the same routes with in-memory
/// repositories.
pub fn build_router<S: HasServices>(state: S, metrics: Option<PrometheusHandle>) -> Router {
    let protected = Router::new()
        .route(
            "/api/app",
            get(api::app::list::<S>).put(api::app::create::<S>),
        )
        .route("/api/app/{app_key}", get(api::app::get::<S>))
        .route(
            "/api/app/{app_key}/client",
            put(api::app::create_client::<S>),
        )
        .route(
            "/api/app/{app_key}/client/{client_id}",
            get(api::app::get_client::<S>),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api_gate::<S>,
        ));

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        // Auth endpoints
        .route("/auth/signup", post(api::auth::signup::<S>))
        .route("/auth/login", post(api::auth::login::<S>))
        .route("/auth/client/token", post(api::auth::client_token::<S>))
        .merge(protected)
        .with_state(state)
        .merge(metrics_router(metrics))
        .layer(axum::middleware::from_fn(normalize_error_response))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(ObservabilityLayer::api())
        .layer(cors())
}

/// Build the gateway router: every path under an application key is gated and
/// forwarded upstream.
pub fn build_gateway_router<S: HasServices>(
    state: S,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let forwarded = Router::new()
        .route("/{app_key}", any(api::gateway::forward::<S>))
        .route("/{app_key}/{*path}", any(api::gateway::forward::<S>))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            gateway_gate::<S>,
        ));

    Router::new()
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .merge(forwarded)
        .with_state(state)
        .merge(metrics_router(metrics))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(ObservabilityLayer::gateway())
}

/// Bind the configured address and serve until ctrl-c.
pub(crate) async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
