use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::cache::ttl_cache::{CacheStats, TtlCache};
use crate::core::client::warehouse_client::{Row, WarehouseClient};

/// Runs warehouse statements and memoizes their rows by statement text.
pub struct QueryExecutor {
    client: Arc<dyn WarehouseClient>,
    cache: TtlCache<Arc<Vec<Row>>>,
}

impl QueryExecutor {
    pub fn new(client: Arc<dyn WarehouseClient>, ttl: Duration) -> Self {
        Self {
            client,
            cache: TtlCache::new(ttl),
        }
    }

    /// Rows for `sql`, served from cache while the entry is younger than the TTL.
    pub async fn run_query(&self, sql: &str) -> Result<Arc<Vec<Row>>> {
        let client = &self.client;
        self.cache
            .get_or_try_insert_with(sql, move || async move {
                debug!(statement_len = sql.len(), "Query cache miss, executing");
                let rows = client.query(sql).await?;
                Ok(Arc::new(rows))
            })
            .await
    }

    /// Like [`run_query`](Self::run_query) but decodes each row into `T`.
    pub async fn fetch_records<T: DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>> {
        let rows = self.run_query(sql).await?;
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                serde_json::from_value(serde_json::Value::Object(row.clone()))
                    .with_context(|| format!("Failed to decode result row {}", i))
            })
            .collect()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) -> usize {
        self.cache.invalidate_all().await
    }

    pub async fn purge_expired(&self) -> usize {
        self.cache.purge_expired().await
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }
}
