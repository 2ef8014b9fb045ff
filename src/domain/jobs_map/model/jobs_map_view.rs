use serde::Serialize;

use super::hex_job_table::HexJobTable;

/// Everything one dashboard render needs.
#[derive(Debug, Clone, Serialize)]
pub struct JobsMapView {
    pub server_id: i64,
    pub lookback_days: i64,
    pub server_name: String,
    pub caption: String,
    pub cell_count: usize,
    pub total_jobs: i64,
    pub dataset: HexJobTable,
}

impl JobsMapView {
    pub fn new(server_id: i64, lookback_days: i64, server_name: String, dataset: HexJobTable) -> Self {
        Self {
            server_id,
            lookback_days,
            caption: caption(lookback_days, &server_name),
            cell_count: dataset.len(),
            total_jobs: dataset.total_jobs(),
            server_name,
            dataset,
        }
    }
}

pub fn caption(lookback_days: i64, server_name: &str) -> String {
    format!(
        "Showing jobs over last {} days for server {}",
        lookback_days, server_name
    )
}
