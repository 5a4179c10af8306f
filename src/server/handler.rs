//! Process mode dispatch
//!
//! The mode is chosen once at startup; each variant owns exactly what it needs
//! to run.

use super::{build_gateway_router, build_router, serve, AppState};
use crate::config::{Config, DatabaseConfig, ServerMode};
use crate::migration;
use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

/// Serves the REST API
pub struct ApiHandler {
    state: AppState,
    metrics: Option<PrometheusHandle>,
}

/// Serves the authorizing gateway
pub struct GatewayHandler {
    state: AppState,
    metrics: Option<PrometheusHandle>,
}

/// Applies migrations and exits
pub struct MigrateHandler {
    database: DatabaseConfig,
}

pub enum Handler {
    Api(ApiHandler),
    Gateway(GatewayHandler),
    Migrate(MigrateHandler),
}

impl Handler {
    /// Build the handler for the configured mode. Server modes connect to the
    /// store here, so a bad configuration fails before anything is bound.
    pub async fn load(config: Config, metrics: Option<PrometheusHandle>) -> Result<Self> {
        info!(mode = %config.mode, "Loading handler");
        let handler = match config.mode {
            ServerMode::Api => Handler::Api(ApiHandler {
                state: AppState::connect(config).await?,
                metrics,
            }),
            ServerMode::Gateway => Handler::Gateway(GatewayHandler {
                state: AppState::connect(config).await?,
                metrics,
            }),
            ServerMode::Migrate => Handler::Migrate(MigrateHandler {
                database: config.database,
            }),
        };
        Ok(handler)
    }

    pub fn mode(&self) -> ServerMode {
        match self {
            Handler::Api(_) => ServerMode::Api,
            Handler::Gateway(_) => ServerMode::Gateway,
            Handler::Migrate(_) => ServerMode::Migrate,
        }
    }

    pub async fn run(self) -> Result<()> {
        match self {
            Handler::Api(h) => {
                let addr = h.state.config.http_addr();
                info!(
                    auth_enabled = h.state.config.auth.enabled,
                    "Starting API server"
                );
                serve(&addr, build_router(h.state, h.metrics)).await
            }
            Handler::Gateway(h) => {
                let addr = h.state.config.http_addr();
                info!(
                    routes = h.state.config.gateway.routes.len(),
                    default_upstream = h.state.config.gateway.default_upstream.is_some(),
                    "Starting gateway"
                );
                serve(&addr, build_gateway_router(h.state, h.metrics)).await
            }
            Handler::Migrate(h) => migration::run_migrations(&h.database).await,
        }
    }
}
