//! Purpose: Shared JSON serializers for CLI stdout payloads.
//! Exports: `table_info_json`, `row_json`, `outcome_json`, `table_failed_json`.
//! Role: Keep `tables`, `rows`, and `extract` envelopes consistent, including
//! the `table_failed` notice written to stderr.
//! Invariants: Stable key names; NULL maps to JSON null, never to a string.
//! Invariants: Error details in outcomes reuse the stderr error keys.

use bcp2pg::api::{ColumnValue, DecodedRow, Error, TableDescriptor};
use serde_json::{Map, Value, json};

use crate::extract::TableOutcome;

pub(crate) fn table_info_json(table: &TableDescriptor) -> Value {
    let columns = table
        .columns
        .iter()
        .map(|column| {
            json!({
                "name": column.name,
                "type": column.type_name,
                "nullable": column.nullable,
            })
        })
        .collect::<Vec<_>>();
    let mut map = Map::new();
    map.insert("name".to_string(), json!(table.qualified_name()));
    map.insert(
        "data_dir".to_string(),
        json!(table.data_dir.display().to_string()),
    );
    map.insert("columns".to_string(), Value::Array(columns));
    Value::Object(map)
}

pub(crate) fn row_json(row: &DecodedRow) -> Value {
    let mut values = Map::new();
    for column in &row.columns {
        let value = match &column.value {
            ColumnValue::Null => Value::Null,
            ColumnValue::Text(text) => json!(text),
            ColumnValue::Binary { len } => json!({ "binary_len": len }),
        };
        values.insert(column.name().to_string(), value);
    }
    let mut map = Map::new();
    map.insert("row".to_string(), json!(row.number));
    map.insert("values".to_string(), Value::Object(values));
    Value::Object(map)
}

pub(crate) fn outcome_json(outcome: &TableOutcome) -> Value {
    let mut map = Map::new();
    map.insert("table".to_string(), json!(outcome.table));
    map.insert(
        "path".to_string(),
        json!(outcome.path.display().to_string()),
    );
    map.insert("rows".to_string(), json!(outcome.rows));
    map.insert("status".to_string(), json!(outcome.status()));
    if let Some(err) = &outcome.error {
        map.insert("error".to_string(), crate::error_details_json(err));
    }
    Value::Object(map)
}

/// `{"notice": {...}}` for a table that failed during extract; `details`
/// reuses the stderr error keys.
pub(crate) fn table_failed_json(table: &str, err: &Error, time: &str) -> Value {
    json!({
        "notice": {
            "kind": "table_failed",
            "time": time,
            "cmd": "extract",
            "table": table,
            "message": crate::error_message(err),
            "details": crate::error_details_json(err),
        }
    })
}
