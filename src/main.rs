//! shipwright server binary.
//!
//! Loads configuration from the environment (with CLI overrides), wires the
//! production pipeline, and serves the submission API.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use shipwright::util::{init_logging, parse_level, LoggingConfig};
use shipwright::{api, BuilderConfig, JobPipeline};

#[derive(Parser, Debug)]
#[command(name = "shipwright", version, about = "Static-site build and publish service")]
struct Cli {
    /// Bind address for the HTTP API (overrides SHIPWRIGHT_BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,

    /// Parent directory for per-job workspaces
    #[arg(long)]
    workspace_root: Option<PathBuf>,

    /// Root directory of the local object store
    #[arg(long)]
    storage_root: Option<PathBuf>,

    /// Base URL published artifact links are composed from
    #[arg(long)]
    public_base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = BuilderConfig::from_env().context("failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(root) = cli.workspace_root {
        config.workspace_root = root;
    }
    if let Some(root) = cli.storage_root {
        config.storage_root = root;
    }
    if let Some(url) = cli.public_base_url {
        config.public_base_url = url;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.log_json |= cli.log_json;
    config.validate().context("invalid configuration")?;

    init_logging(LoggingConfig {
        level: parse_level(&config.log_level),
        use_json: config.log_json,
        ..Default::default()
    });

    info!(version = shipwright::VERSION, "starting shipwright");
    info!(
        bind = %config.bind_addr,
        workspace_root = %config.workspace_root.display(),
        storage_root = %config.storage_root.display(),
        "configuration loaded"
    );

    let bind_addr = config.bind_addr.clone();
    let pipeline = Arc::new(JobPipeline::new(config));
    let app = api::router(pipeline);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("listening on {}", bind_addr);
    axum::serve(listener, app)
        .await
        .context("server terminated unexpectedly")?;

    Ok(())
}
