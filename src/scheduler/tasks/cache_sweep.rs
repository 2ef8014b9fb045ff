use anyhow::Result;
use tracing::debug;

use crate::app_state::AppState;

pub async fn run(state: AppState) -> Result<usize> {
    let removed = state.query_executor.purge_expired().await;
    if removed > 0 {
        debug!(removed, "Purged expired query results");
    }
    Ok(removed)
}
