use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One result record: column name to typed JSON value.
pub type Row = Map<String, Value>;

/// Narrow interface to the analytics warehouse: run a statement, get rows back.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;
}
