//! Run the dashboard HTTP server in the foreground

use std::net::SocketAddr;

use anyhow::{Context, Result};
use bddboard_common::DashboardConfig;
use clap::Args;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address (defaults to the configured address)
    #[arg(long)]
    pub addr: Option<String>,
}

pub async fn execute(args: ServeArgs, config: DashboardConfig) -> Result<()> {
    let addr: SocketAddr = args
        .addr
        .as_deref()
        .unwrap_or(&config.web_addr)
        .parse()
        .context("Invalid listen address")?;

    println!("Serving dashboard on http://{}", addr);
    bddboard_web::serve(addr, config).await
}
