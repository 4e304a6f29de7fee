use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;

use bddboard_common::DashboardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = PathBuf::from(
        std::env::var("BDDBOARD_CONFIG").unwrap_or_else(|_| "bddboard.toml".to_string()),
    );
    let mut config = DashboardConfig::load(&config_path)?;
    config.apply_env_overrides();

    let web_addr: SocketAddr = config.web_addr.parse()?;

    info!(
        "Starting BDD Board on http://{} (config: {:?})",
        web_addr, config_path
    );

    bddboard_web::serve(web_addr, config).await
}
