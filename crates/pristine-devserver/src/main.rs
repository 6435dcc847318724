//! Pristine dev server - static files for local widget testing.

use anyhow::{Context, Result};
use clap::Parser;
use pristine_devserver::config::DevServerConfig;
use pristine_devserver::logging::{self, LogArgs, LogConfig};
use pristine_devserver::routes::{self, files::FileRoot};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Pristine dev server - serves demo pages and the widget frontend.
#[derive(Parser, Debug)]
#[command(name = "pristine-devserver")]
#[command(about = "Static file server for local chat widget development")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the served directory
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogConfig::from(&cli.log));

    let mut config = match &cli.config {
        Some(path) => DevServerConfig::load_from(path)?,
        None => DevServerConfig::load()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = cli.dir {
        config.serve_dir = dir;
    }

    let root = FileRoot::new(&config.serve_dir)
        .with_context(|| format!("serve directory {}", config.serve_dir.display()))?;
    tracing::info!(target: "pristine::startup", "Serving files from: {}", root.serve_dir().display());
    tracing::info!(
        target: "pristine::startup",
        "Mapping /frontend/ -> {}",
        root.frontend_dir().display()
    );

    let app = routes::router(Arc::new(root));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(target: "pristine::startup", "Server running at http://{}/", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
