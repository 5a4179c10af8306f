use anyhow::Result;
use authx_core::{
    config::{Config, ServerMode},
    server::handler::Handler,
    telemetry,
};
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "authx-core", version, about = "Authx identity service")]
struct Cli {
    /// Process mode; overrides APP_MODE
    #[arg(long, value_enum)]
    mode: Option<ServerMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env_with_mode(cli.mode)?;

    let metrics = telemetry::init(&config.telemetry)?;
    info!(mode = %config.mode, "Starting Authx Core");

    Handler::load(config, metrics).await?.run().await
}
