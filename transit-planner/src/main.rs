use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use transit_planner::cache::CacheConfig;
use transit_planner::engine::{DatasetSource, EngineConfig, EngineError, EngineHandle};
use transit_planner::planner::Planner;
use transit_planner::web::{AppState, create_router};

const DEFAULT_FEED_DIR: &str = "data/gtfs";
const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("invalid TRANSIT_LISTEN address {addr}: {source}")]
    Listen {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("could not build the engine: {0}")]
    Engine(#[from] EngineError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let feed_dir = std::env::var("TRANSIT_FEED_DIR").unwrap_or_else(|_| DEFAULT_FEED_DIR.into());
    let listen = std::env::var("TRANSIT_LISTEN").unwrap_or_else(|_| DEFAULT_LISTEN.into());
    let addr: SocketAddr = listen.parse().map_err(|source| StartupError::Listen {
        addr: listen.clone(),
        source,
    })?;

    let mut handle = EngineHandle::new(
        DatasetSource::FeedDir(PathBuf::from(&feed_dir)),
        EngineConfig::default(),
    );
    if let Ok(snapshot) = std::env::var("TRANSIT_SNAPSHOT") {
        handle = handle.with_snapshot(snapshot);
    }

    // Built before binding
    info!(feed_dir = %feed_dir, "building engine");
    let engine = handle.get().await?;
    info!(stats = ?engine.stats(), "engine ready");

    let planner = Planner::new(Arc::new(handle), &CacheConfig::default());
    let app = create_router(AppState::new(planner));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "transit planner listening");
    info!("endpoints: GET /health, GET /plan, POST /plan");

    axum::serve(listener, app).await?;
    Ok(())
}
