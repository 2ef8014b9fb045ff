use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::domain::jobs_map::dto::jobs_map_request::JobsMapParams;
use crate::domain::jobs_map::jobs_map_error::JobsMapError;
use crate::domain::jobs_map::model::hex_job_table::HexJobTable;
use crate::domain::jobs_map::model::jobs_map_view::JobsMapView;
use crate::domain::jobs_map::model::records::{HexJobCount, ServerNameRecord};
use crate::domain::jobs_map::service::statements::{jobs_by_cell_statement, server_name_statement};
use crate::domain::query::service::query_executor::QueryExecutor;

pub struct JobsMapService {
    executor: Arc<QueryExecutor>,
    dataset: String,
}

impl JobsMapService {
    pub fn new(executor: Arc<QueryExecutor>, dataset: impl Into<String>) -> Self {
        Self {
            executor,
            dataset: dataset.into(),
        }
    }

    pub async fn load(&self, params: JobsMapParams) -> Result<JobsMapView> {
        let server_name = self.server_name(params.server_id).await?;

        let sql = jobs_by_cell_statement(&self.dataset, params.server_id, params.lookback_days);
        let counts: Vec<HexJobCount> = self
            .executor
            .fetch_records(&sql)
            .await
            .context("Failed to load job counts per cell")?;
        let table = HexJobTable::from_records(counts);
        if table.is_empty() {
            warn!(server_id = params.server_id, "No jobs in the lookback window");
        }

        info!(
            server_id = params.server_id,
            lookback_days = params.lookback_days,
            cells = table.len(),
            unlocated = table.unlocated_cells(),
            "Loaded jobs map"
        );

        Ok(JobsMapView::new(
            params.server_id,
            params.lookback_days,
            server_name,
            table,
        ))
    }

    async fn server_name(&self, server_id: i64) -> Result<String> {
        let sql = server_name_statement(&self.dataset, server_id);
        let records: Vec<ServerNameRecord> = self
            .executor
            .fetch_records(&sql)
            .await
            .context("Failed to look up server name")?;

        records
            .into_iter()
            .next()
            .map(|r| r.name)
            .ok_or_else(|| JobsMapError::ServerNotFound(server_id).into())
    }
}
