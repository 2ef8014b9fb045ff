use std::sync::Arc;

use anyhow::Result;

use crate::core::client::warehouse_client::WarehouseClient;
use crate::core::config::app_config::{AppConfig, DashboardConfig};
use crate::domain::jobs_map::service::jobs_map_service::JobsMapService;
use crate::domain::map::map_renderer::MapRenderer;
use crate::domain::query::service::query_executor::QueryExecutor;

#[derive(Clone)]
pub struct AppState {
    pub jobs_map_service: Arc<JobsMapService>,
    pub query_executor: Arc<QueryExecutor>,
    pub map_renderer: Arc<MapRenderer>,
    pub dashboard: Arc<DashboardConfig>,
}

/// Wire the services around an already constructed warehouse client.
pub fn build_app_state(config: &AppConfig, client: Arc<dyn WarehouseClient>) -> Result<AppState> {
    let query_executor = Arc::new(QueryExecutor::new(client, config.cache_ttl));
    let jobs_map_service = Arc::new(JobsMapService::new(
        query_executor.clone(),
        config.warehouse.dataset.clone(),
    ));
    let map_renderer = Arc::new(MapRenderer::new(
        config.dashboard.map_height,
        config.dashboard.mapbox_token.clone(),
    )?);

    Ok(AppState {
        jobs_map_service,
        query_executor,
        map_renderer,
        dashboard: Arc::new(config.dashboard.clone()),
    })
}
