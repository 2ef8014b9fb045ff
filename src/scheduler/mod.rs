//! Background jobs started next to the HTTP server

pub mod tasks;

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::error;

use crate::app_state::AppState;

/// Sweep expired query cache entries once per TTL period.
pub fn spawn_cache_sweep(state: AppState) -> JoinHandle<()> {
    let period = state.query_executor.cache_ttl().max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = tasks::cache_sweep::run(state.clone()).await {
                error!(?e, "Cache sweep failed");
            }
        }
    })
}
