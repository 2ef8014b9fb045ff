use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8501";
pub const DEFAULT_BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_DATASET: &str = "proof";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SERVER_ID: i64 = 5041;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;
pub const DEFAULT_MAP_HEIGHT: u32 = 1000;

/// Where the warehouse bearer token comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    ServiceAccountFile(PathBuf),
    ServiceAccountJson(String),
    StaticToken(String),
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Falls back to the service account's `project_id` when unset.
    pub project_id: Option<String>,
    pub base_url: String,
    pub location: Option<String>,
    pub timeout: Duration,
    pub dataset: String,
    pub credentials: CredentialSource,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub default_server_id: i64,
    pub default_lookback_days: i64,
    pub map_height: u32,
    pub mapbox_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_dir: PathBuf,
    pub cache_ttl: Duration,
    pub warehouse: WarehouseConfig,
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("JOBMAP_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("JOBMAP_BIND_ADDR is not a valid socket address")?;

        let credentials = match (
            get("JOBMAP_GCP_SERVICE_ACCOUNT_FILE"),
            get("JOBMAP_GCP_SERVICE_ACCOUNT_JSON"),
            get("JOBMAP_GCP_ACCESS_TOKEN"),
        ) {
            (Some(path), None, None) => CredentialSource::ServiceAccountFile(PathBuf::from(path)),
            (None, Some(json), None) => CredentialSource::ServiceAccountJson(json),
            (None, None, Some(token)) => CredentialSource::StaticToken(token),
            (None, None, None) => {
                return Err(anyhow!(
                    "no warehouse credentials: set one of JOBMAP_GCP_SERVICE_ACCOUNT_FILE, \
                     JOBMAP_GCP_SERVICE_ACCOUNT_JSON or JOBMAP_GCP_ACCESS_TOKEN"
                ))
            }
            _ => {
                return Err(anyhow!(
                    "more than one warehouse credential source is set; keep exactly one"
                ))
            }
        };

        let warehouse = WarehouseConfig {
            project_id: get("JOBMAP_GCP_PROJECT"),
            base_url: get("JOBMAP_BIGQUERY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BIGQUERY_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            location: get("JOBMAP_BIGQUERY_LOCATION"),
            timeout: Duration::from_millis(parse_or(
                get("JOBMAP_QUERY_TIMEOUT_MS"),
                "JOBMAP_QUERY_TIMEOUT_MS",
                DEFAULT_QUERY_TIMEOUT_MS,
            )?),
            dataset: get("JOBMAP_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string()),
            credentials,
        };

        if !is_identifier(&warehouse.dataset) {
            return Err(anyhow!(
                "JOBMAP_DATASET must contain only letters, digits, '_' or '-': {}",
                warehouse.dataset
            ));
        }

        let dashboard = DashboardConfig {
            default_server_id: parse_or(
                get("JOBMAP_DEFAULT_SERVER_ID"),
                "JOBMAP_DEFAULT_SERVER_ID",
                DEFAULT_SERVER_ID,
            )?,
            default_lookback_days: parse_or(
                get("JOBMAP_DEFAULT_LOOKBACK_DAYS"),
                "JOBMAP_DEFAULT_LOOKBACK_DAYS",
                DEFAULT_LOOKBACK_DAYS,
            )?,
            map_height: parse_or(get("JOBMAP_MAP_HEIGHT"), "JOBMAP_MAP_HEIGHT", DEFAULT_MAP_HEIGHT)?,
            mapbox_token: get("JOBMAP_MAPBOX_TOKEN"),
        };

        Ok(Self {
            bind_addr,
            log_dir: PathBuf::from(get("JOBMAP_LOG_DIR").unwrap_or_else(|| "logs".to_string())),
            cache_ttl: Duration::from_secs(parse_or(
                get("JOBMAP_CACHE_TTL_SECS"),
                "JOBMAP_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            warehouse,
            dashboard,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .parse::<T>()
            .map_err(|e| anyhow!("{} has invalid value {:?}: {}", key, v, e)),
        None => Ok(default),
    }
}

// Spliced into SQL text; identifier characters only.
fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
