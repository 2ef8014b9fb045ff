// The map configuration literal nests deeper than the default macro limit.
#![recursion_limit = "512"]

mod api;
mod app_state;
mod core;
mod domain;
mod errors;
mod routes;
mod scheduler;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app_state::build_app_state;
use crate::core::client::bigquery_client::build_warehouse_client;
use crate::core::config::app_config::AppConfig;

fn init_logging(config: &AppConfig) -> WorkerGuard {
    // Daily rotated file, no ANSI colors
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "jobmap.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(?e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _log_guard = init_logging(&config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        cache_ttl_secs = config.cache_ttl.as_secs(),
        dataset = %config.warehouse.dataset,
        "Starting jobmap"
    );

    let client = build_warehouse_client(&config.warehouse)?;
    let state = build_app_state(&config, client)?;
    let sweep = scheduler::spawn_cache_sweep(state.clone());
    let app = routes::app_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    sweep.abort();
    info!("Server stopped");
    Ok(())
}
