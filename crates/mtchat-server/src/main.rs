//! mtchat-server: cookie-session BFF for the remote entity API.
//!
//! Configuration comes from config.toml plus `MTCHAT_*` environment
//! variables; the flags below override both.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mtchat_infrastructure::config_service::{load_config, write_config};
use mtchat_infrastructure::telemetry::{DEFAULT_SERVER_FILTER, init_tracing};
use mtchat_server::{AppState, build_router};
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(name = "mtchat-server", version, about = "mtchat backend-for-frontend")]
struct Args {
    /// Listen address.
    #[arg(long, env = "MTCHAT_BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind: String,

    /// Remote API base URL, overriding config and environment.
    #[arg(long)]
    api_url: Option<String>,

    /// Path to config.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to config.toml and exit.
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_SERVER_FILTER);
    let args = Args::parse();

    let mut config = load_config(args.config.clone()).context("failed to load configuration")?;
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }

    if args.write_config {
        let path = write_config(args.config, &config).context("failed to write configuration")?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let state = AppState::new(config).context("failed to build API gateway")?;
    let app = build_router(state);

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!("[Server] Listening on {}", args.bind);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
