use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::client::warehouse_error::WarehouseError;
use crate::core::config::app_config::CredentialSource;

pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Service account key document as downloaded from the cloud console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(json)
            .map_err(|e| WarehouseError::Credentials(format!("invalid service account JSON: {}", e)))?;
        if let Some(t) = key.key_type.as_deref() {
            if t != "service_account" {
                return Err(WarehouseError::Credentials(format!(
                    "expected a service_account key, got {:?}",
                    t
                ))
                .into());
            }
        }
        Ok(key)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account file {}", path.display()))?;
        Self::from_json(&raw)
    }
}

/// Source of bearer tokens for warehouse calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token, e.g. from `gcloud auth print-access-token`.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Exchanges a signed JWT assertion for an OAuth access token and caches it
/// until shortly before expiry.
pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
    http: reqwest::Client,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Self {
        Self {
            key,
            http,
            scope: BIGQUERY_SCOPE.to_string(),
            cached: Mutex::new(None),
        }
    }

    fn build_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| WarehouseError::Credentials(format!("invalid private key: {}", e)))?;

        let jwt = encode(&header, &claims, &signing_key)
            .map_err(|e| WarehouseError::Credentials(format!("failed to sign assertion: {}", e)))?;
        Ok(jwt)
    }

    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let assertion = self.build_assertion(now)?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(WarehouseError::from)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(e) => match e.error_description {
                    Some(d) => format!("{}: {}", e.error, d),
                    None => e.error,
                },
                Err(_) => text,
            };
            return Err(WarehouseError::Credentials(format!(
                "token endpoint returned {}: {}",
                status, detail
            ))
            .into());
        }

        let body: TokenResponse = resp.json().await.map_err(WarehouseError::from)?;
        info!(
            client_email = %self.key.client_email,
            expires_in = body.expires_in,
            "Obtained warehouse access token"
        );

        Ok(CachedToken {
            token: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.cached.lock().await;
        let now = Utc::now();

        if let Some(cached) = guard.as_ref() {
            if cached.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now {
                return Ok(cached.token.clone());
            }
            debug!("Warehouse access token near expiry, refreshing");
        }

        let fresh = self.fetch_token(now).await?;
        let token = fresh.token.clone();
        *guard = Some(fresh);
        Ok(token)
    }
}

/// Build the token provider for the configured credential source.
///
/// Also returns the project id embedded in a service account key, if any.
pub fn load_token_provider(
    source: &CredentialSource,
    http: reqwest::Client,
) -> Result<(Arc<dyn TokenProvider>, Option<String>)> {
    let (provider, project): (Arc<dyn TokenProvider>, Option<String>) = match source {
        CredentialSource::StaticToken(token) => {
            (Arc::new(StaticTokenProvider::new(token.clone())), None)
        }
        CredentialSource::ServiceAccountFile(path) => {
            let key = ServiceAccountKey::from_file(path)?;
            let project = key.project_id.clone();
            (Arc::new(ServiceAccountTokenProvider::new(key, http)), project)
        }
        CredentialSource::ServiceAccountJson(json) => {
            let key = ServiceAccountKey::from_json(json)?;
            let project = key.project_id.clone();
            (Arc::new(ServiceAccountTokenProvider::new(key, http)), project)
        }
    };
    Ok((provider, project))
}
