//! Wire types for the BigQuery v2 REST `jobs.query` / `jobs.getQueryResults` calls.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DisplayFromStr};

use super::warehouse_client::Row;
use super::warehouse_error::WarehouseError;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub use_legacy_sql: bool,
    pub timeout_ms: u64,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<&'a str>,
}

#[serde_as]
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub schema: Option<TableSchema>,
    pub job_reference: Option<JobReference>,
    /// Sent as a decimal string.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub total_rows: Option<u64>,
    pub page_token: Option<String>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    pub job_complete: Option<bool>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

impl QueryResponse {
    pub fn is_complete(&self) -> bool {
        self.job_complete.unwrap_or(true)
    }

    /// First error message reported inside an otherwise successful response.
    pub fn first_error(&self) -> Option<String> {
        self.errors.first().map(|e| {
            e.message
                .clone()
                .or_else(|| e.reason.clone())
                .unwrap_or_else(|| "unknown error".to_string())
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: Option<String>,
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: Option<String>,
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

impl TableFieldSchema {
    fn is_repeated(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("REPEATED"))
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorProto {
    pub reason: Option<String>,
    pub message: Option<String>,
}

/// `{"error": {...}}` body returned with non-2xx statuses.
#[derive(Deserialize, Debug)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub message: String,
    pub status: Option<String>,
}

/// Convert raw `f`/`v` rows into named, typed rows using the result schema.
pub fn rows_from_response(schema: &TableSchema, rows: &[TableRow]) -> Result<Vec<Row>, WarehouseError> {
    rows.iter()
        .map(|row| record_from_cells(&schema.fields, &row.f))
        .collect()
}

fn record_from_cells(fields: &[TableFieldSchema], cells: &[TableCell]) -> Result<Row, WarehouseError> {
    if fields.len() != cells.len() {
        return Err(WarehouseError::Decode(format!(
            "row has {} cells but schema has {} fields",
            cells.len(),
            fields.len()
        )));
    }

    let mut out = Map::with_capacity(fields.len());
    for (field, cell) in fields.iter().zip(cells) {
        out.insert(field.name.clone(), convert_value(field, &cell.v)?);
    }
    Ok(out)
}

fn convert_value(field: &TableFieldSchema, raw: &Value) -> Result<Value, WarehouseError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    if field.is_repeated() {
        let items = raw.as_array().ok_or_else(|| {
            WarehouseError::Decode(format!("repeated field {} is not an array", field.name))
        })?;
        return items
            .iter()
            .map(|item| convert_scalar(field, item.get("v").unwrap_or(&Value::Null)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    convert_scalar(field, raw)
}

fn convert_scalar(field: &TableFieldSchema, raw: &Value) -> Result<Value, WarehouseError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let bad = |what: &str| {
        WarehouseError::Decode(format!("field {} ({}) has invalid value {}", field.name, what, raw))
    };

    match field.field_type.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" => {
            let s = raw.as_str().ok_or_else(|| bad("INTEGER"))?;
            s.parse::<i64>().map(Value::from).map_err(|_| bad("INTEGER"))
        }
        "FLOAT" | "FLOAT64" => {
            let s = raw.as_str().ok_or_else(|| bad("FLOAT"))?;
            let f = s.parse::<f64>().map_err(|_| bad("FLOAT"))?;
            // NaN and infinities have no JSON number form
            Ok(serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(s.to_string())))
        }
        "BOOLEAN" | "BOOL" => match raw.as_str() {
            Some("true") => Ok(Value::Bool(true)),
            Some("false") => Ok(Value::Bool(false)),
            _ => Err(bad("BOOLEAN")),
        },
        "RECORD" | "STRUCT" => {
            let cells: Vec<TableCell> = raw
                .get("f")
                .cloned()
                .map(serde_json::from_value)
                .transpose()
                .map_err(|_| bad("RECORD"))?
                .unwrap_or_default();
            record_from_cells(&field.fields, &cells).map(Value::Object)
        }
        _ => Ok(raw.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aggregate_response_is_typed_by_schema() {
        let resp: QueryResponse = serde_json::from_value(json!({
            "kind": "bigquery#queryResponse",
            "schema": {"fields": [
                {"name": "cell", "type": "STRING", "mode": "NULLABLE"},
                {"name": "jobs", "type": "INTEGER", "mode": "NULLABLE"}
            ]},
            "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
            "totalRows": "2",
            "rows": [
                {"f": [{"v": "8844c0a305fffff"}, {"v": "12"}]},
                {"f": [{"v": null}, {"v": "3"}]}
            ],
            "jobComplete": true
        }))
        .unwrap();

        assert_eq!(resp.total_rows, Some(2));
        assert!(resp.is_complete());

        let rows = rows_from_response(resp.schema.as_ref().unwrap(), &resp.rows).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["cell"], json!("8844c0a305fffff"));
        assert_eq!(rows[0]["jobs"], json!(12));
        assert_eq!(rows[1]["cell"], Value::Null);
        assert_eq!(rows[1]["jobs"], json!(3));
    }

    #[test]
    fn incomplete_job_has_no_rows_or_total() {
        let resp: QueryResponse = serde_json::from_value(json!({
            "jobReference": {"projectId": "p", "jobId": "job_2"},
            "jobComplete": false
        }))
        .unwrap();

        assert!(!resp.is_complete());
        assert!(resp.rows.is_empty());
        assert_eq!(resp.total_rows, None);
        assert_eq!(resp.job_reference.unwrap().job_id, "job_2");
    }

    #[test]
    fn scalar_types_and_nested_records() {
        let schema: TableSchema = serde_json::from_value(json!({"fields": [
            {"name": "ratio", "type": "FLOAT64"},
            {"name": "active", "type": "BOOL"},
            {"name": "tags", "type": "STRING", "mode": "REPEATED"},
            {"name": "addr", "type": "RECORD", "fields": [
                {"name": "zip", "type": "STRING"},
                {"name": "primary", "type": "BOOLEAN"}
            ]}
        ]}))
        .unwrap();
        let rows: Vec<TableRow> = serde_json::from_value(json!([
            {"f": [
                {"v": "0.5"},
                {"v": "true"},
                {"v": [{"v": "a"}, {"v": "b"}]},
                {"v": {"f": [{"v": "33101"}, {"v": "false"}]}}
            ]}
        ]))
        .unwrap();

        let out = rows_from_response(&schema, &rows).unwrap();
        assert_eq!(out[0]["ratio"], json!(0.5));
        assert_eq!(out[0]["active"], json!(true));
        assert_eq!(out[0]["tags"], json!(["a", "b"]));
        assert_eq!(out[0]["addr"], json!({"zip": "33101", "primary": false}));
    }

    #[test]
    fn malformed_integer_is_a_decode_error() {
        let schema: TableSchema =
            serde_json::from_value(json!({"fields": [{"name": "jobs", "type": "INTEGER"}]})).unwrap();
        let rows: Vec<TableRow> = serde_json::from_value(json!([{"f": [{"v": "many"}]}])).unwrap();

        let err = rows_from_response(&schema, &rows).unwrap_err();
        assert!(matches!(err, WarehouseError::Decode(ref m) if m.contains("jobs")));
    }

    #[test]
    fn cell_count_mismatch_is_rejected() {
        let schema: TableSchema =
            serde_json::from_value(json!({"fields": [{"name": "a", "type": "STRING"}]})).unwrap();
        let rows: Vec<TableRow> =
            serde_json::from_value(json!([{"f": [{"v": "x"}, {"v": "y"}]}])).unwrap();

        assert!(rows_from_response(&schema, &rows).is_err());
    }

    #[test]
    fn error_envelope_and_inline_errors() {
        let env: ErrorEnvelope = serde_json::from_value(json!({
            "error": {"code": 400, "message": "Syntax error: Unexpected keyword", "status": "INVALID_ARGUMENT"}
        }))
        .unwrap();
        assert_eq!(env.error.status.as_deref(), Some("INVALID_ARGUMENT"));
        assert!(env.error.message.starts_with("Syntax error"));

        let resp: QueryResponse = serde_json::from_value(json!({
            "jobComplete": true,
            "errors": [{"reason": "invalidQuery", "message": "Table not found"}]
        }))
        .unwrap();
        assert_eq!(resp.first_error().as_deref(), Some("Table not found"));
    }
}
