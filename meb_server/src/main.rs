use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use clap::Parser;
use meb_core::output::DEFAULT_OUTPUT;
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod route;

#[derive(Debug, Parser)]
#[command(about = "Serve the events file and the display page")]
pub struct Arguments {
    /// the address to listen on
    #[arg(long, env = "MEB_ADDR", default_value = "0.0.0.0:8008")]
    pub addr: SocketAddr,
    /// the events file written by meb_cli
    #[arg(long, env = "MEB_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub events: PathBuf,
    /// the built display page
    #[arg(long, env = "MEB_DIST", default_value = "meb_server/frontend/dist")]
    pub dist: PathBuf,
}

/// What the handlers share.
#[derive(Debug, Clone)]
pub struct AppState {
    pub events_path: PathBuf,
}

fn init_logging() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set up logging")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let args = Arguments::parse();
    let state = Arc::new(AppState {
        events_path: args.events.clone(),
    });
    let app = Router::new()
        .route("/events.json", get(route::events::handler))
        .fallback_service(ServeDir::new(&args.dist))
        .with_state(state);
    info!(addr = %args.addr, events = %args.events.display(), dist = %args.dist.display(), "listening");
    axum::Server::bind(&args.addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
