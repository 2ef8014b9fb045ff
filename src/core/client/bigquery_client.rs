use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::client::bigquery_dto::{
    rows_from_response, ErrorEnvelope, JobReference, QueryRequest, QueryResponse,
};
use crate::core::client::credentials::{load_token_provider, TokenProvider};
use crate::core::client::warehouse_client::{Row, WarehouseClient};
use crate::core::client::warehouse_error::WarehouseError;
use crate::core::config::app_config::WarehouseConfig;

/// Connection settings for [`BigQueryClient`].
#[derive(Debug, Clone)]
pub struct BigQuerySettings {
    pub base_url: String,
    pub project_id: String,
    pub location: Option<String>,
    /// Upper bound for a whole `query` call, including polling and paging.
    pub timeout: Duration,
}

/// BigQuery over its v2 REST API.
pub struct BigQueryClient {
    http: Client,
    tokens: Arc<dyn TokenProvider>,
    settings: BigQuerySettings,
}

impl BigQueryClient {
    pub fn new(http: Client, tokens: Arc<dyn TokenProvider>, settings: BigQuerySettings) -> Self {
        Self {
            http,
            tokens,
            settings,
        }
    }

    fn queries_url(&self, project_id: &str) -> String {
        format!(
            "{}/projects/{}/queries",
            self.settings.base_url,
            urlencoding::encode(project_id)
        )
    }

    fn job_results_url(&self, job: &JobReference) -> String {
        let project = job
            .project_id
            .as_deref()
            .unwrap_or(&self.settings.project_id);
        format!(
            "{}/{}",
            self.queries_url(project),
            urlencoding::encode(&job.job_id)
        )
    }

    fn long_poll_ms(&self, deadline: Instant) -> u64 {
        deadline
            .saturating_duration_since(Instant::now())
            .as_millis()
            .min(u64::MAX as u128) as u64
    }

    async fn start_query(&self, sql: &str, deadline: Instant) -> Result<QueryResponse> {
        let body = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            timeout_ms: self.long_poll_ms(deadline),
            request_id: uuid::Uuid::new_v4().to_string(),
            location: self.settings.location.as_deref(),
        };

        let req = self
            .http
            .post(self.queries_url(&self.settings.project_id))
            .json(&body);
        self.send(req, deadline).await
    }

    async fn get_query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
        deadline: Instant,
    ) -> Result<QueryResponse> {
        let mut params: Vec<(&str, String)> = vec![("timeoutMs", self.long_poll_ms(deadline).to_string())];
        if let Some(location) = job.location.as_ref().or(self.settings.location.as_ref()) {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let req = self.http.get(self.job_results_url(job)).query(&params);
        self.send(req, deadline).await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, deadline: Instant) -> Result<T> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(WarehouseError::Timeout(self.settings.timeout.as_millis()).into());
        }

        let token = self.tokens.access_token().await?;
        let resp = req
            .bearer_auth(token)
            .timeout(remaining)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(env) => match env.error.status {
                    Some(s) => format!("{} ({})", env.error.message, s),
                    None => env.error.message,
                },
                Err(_) => text,
            };
            return Err(WarehouseError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body = resp.json::<T>().await.map_err(|e| self.transport_error(e))?;
        Ok(body)
    }

    /// A request cut off by the deadline reports the overall budget.
    fn transport_error(&self, e: reqwest::Error) -> WarehouseError {
        if e.is_timeout() {
            WarehouseError::Timeout(self.settings.timeout.as_millis())
        } else {
            WarehouseError::from(e)
        }
    }
}

/// Construct the BigQuery client and its credential source from configuration.
pub fn build_warehouse_client(config: &WarehouseConfig) -> Result<Arc<dyn WarehouseClient>> {
    let http = Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let (tokens, key_project) = load_token_provider(&config.credentials, http.clone())?;
    let project_id = config.project_id.clone().or(key_project).ok_or_else(|| {
        anyhow!("JOBMAP_GCP_PROJECT must be set when the credentials carry no project_id")
    })?;

    info!(
        project_id = %project_id,
        base_url = %config.base_url,
        location = config.location.as_deref().unwrap_or("-"),
        "BigQuery client initialized"
    );

    Ok(Arc::new(BigQueryClient::new(
        http,
        tokens,
        BigQuerySettings {
            base_url: config.base_url.clone(),
            project_id,
            location: config.location.clone(),
            timeout: config.timeout,
        },
    )))
}

#[async_trait]
impl WarehouseClient for BigQueryClient {
    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let started = Instant::now();
        let deadline = started + self.settings.timeout;

        let mut resp = self.start_query(sql, deadline).await?;
        if let Some(msg) = resp.first_error() {
            return Err(WarehouseError::Query(msg).into());
        }

        let job = resp.job_reference.clone();

        while !resp.is_complete() {
            let job = job
                .as_ref()
                .ok_or_else(|| WarehouseError::Decode("incomplete job without jobReference".into()))?;
            debug!(job_id = %job.job_id, "Query still running, polling results");
            resp = self.get_query_results(job, None, deadline).await?;
            if let Some(msg) = resp.first_error() {
                return Err(WarehouseError::Query(msg).into());
            }
        }

        let schema = resp.schema.clone().unwrap_or_default();
        let total_rows = resp.total_rows;
        let mut rows = Vec::with_capacity(total_rows.unwrap_or(0).min(100_000) as usize);
        rows.extend(rows_from_response(&schema, &resp.rows)?);
        let mut page_token = resp.page_token.take();

        while let Some(token) = page_token {
            let job = job
                .as_ref()
                .ok_or_else(|| WarehouseError::Decode("paged result without jobReference".into()))?;
            let page = self.get_query_results(job, Some(&token), deadline).await?;
            let page_schema = page.schema.as_ref().unwrap_or(&schema);
            rows.extend(rows_from_response(page_schema, &page.rows)?);
            page_token = page.page_token;
        }

        if let Some(total) = total_rows {
            if total != rows.len() as u64 {
                warn!(total_rows = total, rows = rows.len(), "Row count differs from totalRows");
            }
        }

        info!(
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            job_id = job.as_ref().map(|j| j.job_id.as_str()).unwrap_or("-"),
            "Warehouse query finished"
        );

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::credentials::StaticTokenProvider;
    use axum::extract::{Request, State};
    use axum::http::StatusCode;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Loopback stand-in for the REST API: replays canned replies in order
    /// and records `METHOD uri` plus the bearer token of every request.
    #[derive(Clone, Default)]
    struct Replay {
        replies: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
        seen: Arc<Mutex<Vec<String>>>,
        tokens: Arc<Mutex<Vec<String>>>,
    }

    impl Replay {
        fn new(replies: Vec<(StatusCode, Value)>) -> Self {
            let r = Self::default();
            *r.replies.lock().unwrap() = replies.into();
            r
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    async fn replay(State(r): State<Replay>, req: Request) -> (StatusCode, Json<Value>) {
        r.seen
            .lock()
            .unwrap()
            .push(format!("{} {}", req.method(), req.uri()));
        if let Some(auth) = req.headers().get("authorization") {
            r.tokens
                .lock()
                .unwrap()
                .push(auth.to_str().unwrap_or_default().to_string());
        }
        let next = r.replies.lock().unwrap().pop_front();
        match next {
            Some((status, body)) => (status, Json(body)),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"message": "no reply scripted"}})),
            ),
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn replay_client(replay: Replay, timeout: Duration) -> BigQueryClient {
        let base_url = serve(Router::new().fallback(self::replay).with_state(replay)).await;
        BigQueryClient::new(
            Client::new(),
            Arc::new(StaticTokenProvider::new("ya29.test")),
            BigQuerySettings {
                base_url,
                project_id: "p".into(),
                location: None,
                timeout,
            },
        )
    }

    fn schema() -> Value {
        json!({"fields": [
            {"name": "cell", "type": "STRING", "mode": "NULLABLE"},
            {"name": "jobs", "type": "INTEGER", "mode": "NULLABLE"}
        ]})
    }

    fn client() -> BigQueryClient {
        BigQueryClient::new(
            Client::new(),
            Arc::new(StaticTokenProvider::new("t")),
            BigQuerySettings {
                base_url: "https://bigquery.googleapis.com/bigquery/v2".into(),
                project_id: "analytics prod".into(),
                location: Some("US".into()),
                timeout: Duration::from_secs(30),
            },
        )
    }

    #[test]
    fn urls_are_built_from_project_and_job() {
        let c = client();
        assert_eq!(
            c.queries_url("analytics-prod"),
            "https://bigquery.googleapis.com/bigquery/v2/projects/analytics-prod/queries"
        );

        let job = JobReference {
            project_id: None,
            job_id: "job_abc/1".into(),
            location: None,
        };
        assert_eq!(
            c.job_results_url(&job),
            "https://bigquery.googleapis.com/bigquery/v2/projects/analytics%20prod/queries/job_abc%2F1"
        );
    }

    #[test]
    fn query_request_serializes_camel_case() {
        let body = QueryRequest {
            query: "select 1",
            use_legacy_sql: false,
            timeout_ms: 1000,
            request_id: "r".into(),
            location: None,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["useLegacySql"], serde_json::json!(false));
        assert_eq!(v["timeoutMs"], serde_json::json!(1000));
        assert!(v.get("location").is_none());
    }

    #[test]
    fn build_requires_a_project() {
        use crate::core::config::app_config::CredentialSource;

        let mut cfg = WarehouseConfig {
            project_id: None,
            base_url: "https://bigquery.googleapis.com/bigquery/v2".into(),
            location: None,
            timeout: Duration::from_secs(5),
            dataset: "proof".into(),
            credentials: CredentialSource::StaticToken("t".into()),
        };
        let err = build_warehouse_client(&cfg).err().unwrap();
        assert!(err.to_string().contains("JOBMAP_GCP_PROJECT"));

        cfg.project_id = Some("analytics-prod".into());
        assert!(build_warehouse_client(&cfg).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_fails_without_a_request() {
        let c = client();
        let deadline = Instant::now();
        tokio::time::advance(Duration::from_millis(1)).await;

        let err = c
            .send::<QueryResponse>(c.http.get("http://127.0.0.1:9/unused"), deadline)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WarehouseError>(),
            Some(WarehouseError::Timeout(30_000))
        ));
    }

    #[tokio::test]
    async fn polls_until_complete_then_follows_pages() {
        let replay = Replay::new(vec![
            (
                StatusCode::OK,
                json!({
                    "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
                    "jobComplete": false
                }),
            ),
            (
                StatusCode::OK,
                json!({
                    "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
                    "jobComplete": true,
                    "schema": schema(),
                    "totalRows": "3",
                    "rows": [
                        {"f": [{"v": "8844c0a305fffff"}, {"v": "12"}]},
                        {"f": [{"v": "8844c0a307fffff"}, {"v": "5"}]}
                    ],
                    "pageToken": "page-2"
                }),
            ),
            (
                StatusCode::OK,
                json!({
                    "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
                    "jobComplete": true,
                    "totalRows": "3",
                    "rows": [{"f": [{"v": null}, {"v": "2"}]}]
                }),
            ),
        ]);
        let c = replay_client(replay.clone(), Duration::from_secs(10)).await;

        let rows = c.query("SELECT cell, jobs FROM proof.jobs").await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["cell"], json!("8844c0a305fffff"));
        assert_eq!(rows[0]["jobs"], json!(12));
        assert_eq!(rows[2]["cell"], Value::Null);
        assert_eq!(rows[2]["jobs"], json!(2));

        let seen = replay.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], "POST /projects/p/queries");
        assert!(seen[1].starts_with("GET /projects/p/queries/job_1?"));
        assert!(seen[1].contains("location=US"));
        assert!(!seen[1].contains("pageToken"));
        assert!(seen[2].contains("pageToken=page-2"));
        assert!(replay
            .tokens
            .lock()
            .unwrap()
            .iter()
            .all(|t| t == "Bearer ya29.test"));
    }

    #[tokio::test]
    async fn error_envelope_becomes_api_error() {
        let replay = Replay::new(vec![(
            StatusCode::BAD_REQUEST,
            json!({"error": {
                "code": 400,
                "message": "Syntax error: Unexpected keyword FROM",
                "status": "INVALID_ARGUMENT"
            }}),
        )]);
        let c = replay_client(replay, Duration::from_secs(10)).await;

        let err = c.query("SELECT FROM").await.unwrap_err();
        match err.downcast_ref::<WarehouseError>() {
            Some(WarehouseError::Api { status, message }) => {
                assert_eq!(*status, 400);
                assert_eq!(
                    message,
                    "Syntax error: Unexpected keyword FROM (INVALID_ARGUMENT)"
                );
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn inline_errors_become_query_error() {
        let replay = Replay::new(vec![(
            StatusCode::OK,
            json!({
                "jobReference": {"projectId": "p", "jobId": "job_9"},
                "jobComplete": true,
                "errors": [{"reason": "invalidQuery", "message": "Unrecognized name: cel"}]
            }),
        )]);
        let c = replay_client(replay, Duration::from_secs(10)).await;

        let err = c.query("SELECT cel FROM proof.jobs").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WarehouseError>(),
            Some(WarehouseError::Query(m)) if m == "Unrecognized name: cel"
        ));
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let slow = Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"jobComplete": true}))
        });
        let c = BigQueryClient::new(
            Client::new(),
            Arc::new(StaticTokenProvider::new("t")),
            BigQuerySettings {
                base_url: serve(slow).await,
                project_id: "p".into(),
                location: None,
                timeout: Duration::from_millis(200),
            },
        );

        let err = c.query("SELECT 1").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WarehouseError>(),
            Some(WarehouseError::Timeout(200))
        ));
    }
}
