use serde::{Deserialize, Serialize};

/// Row of the server name lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerNameRecord {
    pub name: String,
}

/// Row of the per-cell aggregate. `cell` is null for jobs with no primary address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexJobCount {
    pub cell: Option<String>,
    pub jobs: i64,
}
