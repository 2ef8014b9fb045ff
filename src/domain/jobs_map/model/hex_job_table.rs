use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use super::records::HexJobCount;

pub const CELL_COLUMN: &str = "cell";
pub const JOBS_COLUMN: &str = "jobs";

/// Column-oriented job counts per hex cell.
///
/// Serializes to the map widget's dataset shape:
/// `{"fields": [{"name", "type"}...], "rows": [[cell, jobs]...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexJobTable {
    cell: Vec<Option<String>>,
    jobs: Vec<i64>,
}

#[derive(Serialize)]
struct Field {
    name: &'static str,
    #[serde(rename = "type")]
    field_type: &'static str,
}

#[derive(Serialize)]
struct Dataset {
    fields: [Field; 2],
    rows: Vec<[Value; 2]>,
}

impl HexJobTable {
    pub fn from_records(records: Vec<HexJobCount>) -> Self {
        let mut table = Self {
            cell: Vec::with_capacity(records.len()),
            jobs: Vec::with_capacity(records.len()),
        };
        for r in records {
            table.cell.push(r.cell);
            table.jobs.push(r.jobs);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Rows whose job had no primary address, so no hex cell.
    pub fn unlocated_cells(&self) -> usize {
        self.cell.iter().filter(|c| c.is_none()).count()
    }

    pub fn total_jobs(&self) -> i64 {
        self.jobs.iter().sum()
    }
}

impl Serialize for HexJobTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows = self
            .cell
            .iter()
            .zip(&self.jobs)
            .map(|(c, j)| [json!(c), json!(j)])
            .collect();

        Dataset {
            fields: [
                Field {
                    name: CELL_COLUMN,
                    field_type: "string",
                },
                Field {
                    name: JOBS_COLUMN,
                    field_type: "integer",
                },
            ],
            rows,
        }
        .serialize(serializer)
    }
}
