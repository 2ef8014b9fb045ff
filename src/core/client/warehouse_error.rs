use thiserror::Error;

/// Failures talking to the warehouse or its token endpoint.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("HTTP transport failed: {0}")]
    Transport(String),

    #[error("warehouse returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("query failed: {0}")]
    Query(String),

    #[error("query did not complete within {0} ms")]
    Timeout(u128),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("credential error: {0}")]
    Credentials(String),
}

impl From<reqwest::Error> for WarehouseError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            WarehouseError::Decode(e.to_string())
        } else {
            WarehouseError::Transport(e.to_string())
        }
    }
}
