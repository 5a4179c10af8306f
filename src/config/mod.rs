//! Configuration management for Authx Core

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Process mode selected at startup
    pub mode: ServerMode,
    /// Database configuration
    pub database: DatabaseConfig,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Request gate configuration
    pub auth: AuthConfig,
    /// Gateway upstream configuration
    pub gateway: GatewayConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

/// Closed set of process modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ServerMode {
    /// Serve the identity REST API
    Api,
    /// Forward authorized traffic to upstream services
    Gateway,
    /// Apply database migrations and exit
    Migrate,
}

impl FromStr for ServerMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(ServerMode::Api),
            "gateway" | "gw" => Ok(ServerMode::Gateway),
            "migrate" | "migration" => Ok(ServerMode::Migrate),
            other => bail!("Unknown mode '{}', expected api, gateway or migrate", other),
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerMode::Api => "api",
            ServerMode::Gateway => "gateway",
            ServerMode::Migrate => "migrate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
    /// Upper bound for a single store call
    pub query_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub user_token_ttl_secs: i64,
    pub client_token_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// When false, requests without a token pass the gate anonymously
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Application key -> upstream base URL
    pub routes: HashMap<String, String>,
    pub default_upstream: Option<String>,
    pub timeout_secs: u64,
    /// Header carrying the resolved identity to upstreams
    pub identity_header: String,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" or "pretty"
    pub log_format: String,
    pub metrics_enabled: bool,
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// The signing secret is required by the server modes; `migrate` signs nothing.
fn signing_secret(mode: ServerMode, raw: Option<String>) -> Result<String> {
    let secret = raw.unwrap_or_default();
    if mode != ServerMode::Migrate && secret.trim().is_empty() {
        bail!("JWT_SECRET is required in {} mode", mode);
    }
    Ok(secret)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_mode(None)
    }

    /// Load configuration, with a mode chosen on the command line taking
    /// precedence over `APP_MODE`.
    pub fn from_env_with_mode(mode: Option<ServerMode>) -> Result<Self> {
        let mode = match mode {
            Some(mode) => mode,
            None => env::var("APP_MODE")
                .unwrap_or_else(|_| "api".to_string())
                .parse()
                .context("Invalid APP_MODE")?,
        };
        let secret = signing_secret(mode, env::var("JWT_SECRET").ok())?;

        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            mode,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
                acquire_timeout_secs: env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .context("Invalid DATABASE_ACQUIRE_TIMEOUT_SECS")?,
                query_timeout_secs: env::var("DATABASE_QUERY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid DATABASE_QUERY_TIMEOUT_SECS")?,
            },
            jwt: JwtConfig {
                secret,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "authx".to_string()),
                audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authx-api".to_string()),
                user_token_ttl_secs: env::var("JWT_USER_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .context("Invalid JWT_USER_TOKEN_TTL_SECS")?,
                client_token_ttl_secs: env::var("JWT_CLIENT_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "900".to_string())
                    .parse()
                    .context("Invalid JWT_CLIENT_TOKEN_TTL_SECS")?,
            },
            auth: AuthConfig {
                enabled: env_flag("AUTH_ENABLED", true),
            },
            gateway: GatewayConfig {
                routes: match env::var("GATEWAY_ROUTES") {
                    Ok(raw) if !raw.trim().is_empty() => {
                        serde_json::from_str(&raw).context("Invalid GATEWAY_ROUTES")?
                    }
                    _ => HashMap::new(),
                },
                default_upstream: env::var("GATEWAY_DEFAULT_UPSTREAM")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid GATEWAY_TIMEOUT_SECS")?,
                identity_header: env::var("GATEWAY_IDENTITY_HEADER")
                    .unwrap_or_else(|_| "x-authx-identity".to_string())
                    .to_ascii_lowercase(),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                metrics_enabled: env_flag("METRICS_ENABLED", true),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
