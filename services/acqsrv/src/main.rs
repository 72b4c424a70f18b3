//! Acquisition service entry point: configuration, logging, store, engine,
//! control API, graceful shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use acqsrv::api::{api_router, AppState};
use acqsrv::config::ServiceConfig;
use acqsrv::core::Engine;
use acqsrv::transport::SerialTransportFactory;
use gridlink_store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "acqsrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Modbus RTU acquisition server"
)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/acqsrv.yaml")]
    config: String,

    /// Override the log directory
    #[arg(long)]
    log_dir: Option<String>,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ServiceConfig::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;
    if let Some(dir) = args.log_dir {
        config.logging.dir = dir;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    common::logging::init_with_config(common::logging::LogConfig {
        service_name: config.service.name.clone(),
        log_dir: PathBuf::from(&config.logging.dir),
        default_level: config.logging.level.clone(),
    })
    .map_err(|e| anyhow::anyhow!("logging init: {e}"))?;

    info!("starting {} v{}", config.service.name, env!("CARGO_PKG_VERSION"));

    let store = SqliteStore::connect(&config.database.path)
        .await
        .with_context(|| format!("opening database {}", config.database.path))?;

    let engine = Arc::new(Engine::new(
        Arc::new(store),
        Arc::new(SerialTransportFactory),
    ));

    if config.engine.autostart {
        if let Err(e) = engine.start().await {
            // a dead bus must not keep the control surface down
            error!("engine autostart failed: {e}");
        }
    }

    let addr: SocketAddr = config
        .api
        .bind_address
        .parse()
        .with_context(|| format!("invalid api bind address {}", config.api.bind_address))?;
    let app = api_router(AppState {
        engine: Arc::clone(&engine),
    });
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding control api to {addr}"))?;
    info!("control api listening on http://{addr}");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("control api terminated: {e}");
        }
    });

    common::shutdown::wait_for_shutdown().await;
    info!("shutdown signal received");

    if let Err(e) = engine.stop().await {
        error!("engine stop: {e}");
    }
    server.abort();
    info!("acquisition service stopped");
    Ok(())
}
