use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use libcsi::transport::server::CsiServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wlapi_csi::config::{Args, LogFormat};
use wlapi_csi::plugin::{PLUGIN_NAME, WorkloadApiPlugin};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.into_config(|var| std::env::var(var).ok());
    config.validate()?;

    info!(
        plugin = PLUGIN_NAME,
        version = env!("CARGO_PKG_VERSION"),
        node_id = %config.node_id,
        workload_api_dir = %config.workload_api_dir.display(),
        "starting CSI node plugin",
    );

    let plugin = Arc::new(WorkloadApiPlugin::new(&config));
    let server = CsiServer::bind(&config.csi_socket_path, plugin)
        .context("unable to start CSI server")?;
    server.serve().await.context("CSI server stopped")?;
    Ok(())
}
