use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobsMapError {
    /// The name lookup returned no rows for this server id.
    #[error("no server with id {0}")]
    ServerNotFound(i64),
}
