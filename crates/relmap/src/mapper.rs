//! Row reconstruction into declared selection shapes.
//!
//! Fetched rows arrive as `column name -> value` maps. The mapper checks
//! each row against the selection (a missing or extra field is a
//! [`OrmError::Mapping`]), decodes nested one/many fields from their
//! JSON-encoded aggregate values, and hands the result to serde for typed
//! deserialization.
//!
//! The embedded engine returns aggregates and timestamps as plain text, so
//! under [`Dialect::Sqlite`] every string value goes through an ordered
//! fallback: JSON decode first, then timestamp parse, else keep the raw
//! string. This is a type-sniffing heuristic, not error suppression, and the
//! order is load-bearing.

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{OrmError, OrmResult};
use crate::executor::{AsyncExecutor, Executor, Row};
use crate::qb::SelectBuilder;
use crate::selection::{Dialect, Selection, SelectionField};

const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decode one row into a JSON object matching `selection`'s shape.
pub fn decode_row(row: &Row, selection: &Selection, dialect: Dialect) -> OrmResult<Value> {
    for key in row.keys() {
        if !selection.fields().any(|(field, _)| field == key) {
            return Err(OrmError::mapping(format!(
                "row has extra field '{key}' not present in the selection"
            )));
        }
    }

    let mut out = Map::new();
    for (field, source) in selection.fields() {
        let value = row
            .get(field)
            .ok_or_else(|| OrmError::mapping(format!("row is missing field '{field}'")))?;
        let decoded = match source {
            SelectionField::OneTableObject(_) => {
                let nested = decode_nested(field, value)?;
                match &nested {
                    Value::Object(_) | Value::Null => nested,
                    other => {
                        return Err(OrmError::mapping(format!(
                            "field '{field}': expected a nested object, got {other}"
                        )));
                    }
                }
            }
            SelectionField::ManyTableAgg(_) => {
                let nested = decode_nested(field, value)?;
                match &nested {
                    Value::Array(_) | Value::Null => nested,
                    other => {
                        return Err(OrmError::mapping(format!(
                            "field '{field}': expected a nested array, got {other}"
                        )));
                    }
                }
            }
            SelectionField::ManyColumnAgg(_) => match value {
                // The embedded engine hands the aggregate back as JSON text.
                Value::String(s) => serde_json::from_str(s).map_err(|e| {
                    OrmError::mapping(format!("field '{field}': invalid aggregate JSON: {e}"))
                })?,
                other => other.clone(),
            },
            SelectionField::ColumnRef(_) | SelectionField::Raw(_) => match dialect {
                Dialect::Sqlite => coerce_sqlite(value),
                Dialect::Postgres => value.clone(),
            },
        };
        out.insert(field.to_string(), decoded);
    }
    Ok(Value::Object(out))
}

fn decode_nested(field: &str, value: &Value) -> OrmResult<Value> {
    match value {
        Value::String(s) => serde_json::from_str(s).map_err(|e| {
            OrmError::mapping(format!("field '{field}': invalid nested JSON: {e}"))
        }),
        Value::Object(_) | Value::Array(_) | Value::Null => Ok(value.clone()),
        other => Err(OrmError::mapping(format!(
            "field '{field}': expected nested JSON, got {other}"
        ))),
    }
}

/// Ordered fallback for embedded-engine string values: JSON, then timestamp,
/// then the raw string.
fn coerce_sqlite(value: &Value) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };
    if let Ok(decoded) = serde_json::from_str::<Value>(s) {
        // Bare words are not valid JSON, so ordinary text falls through.
        return decoded;
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, SQLITE_TIMESTAMP_FORMAT) {
        return Value::String(ts.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    value.clone()
}

/// Map raw rows into typed values via the declared selection shape.
pub fn map_rows<T: DeserializeOwned>(
    rows: &[Row],
    selection: &Selection,
    dialect: Dialect,
) -> OrmResult<Vec<T>> {
    debug!(rows = rows.len(), "mapping fetched rows");
    rows.iter()
        .map(|row| {
            let object = decode_row(row, selection, dialect)?;
            serde_json::from_value(object)
                .map_err(|e| OrmError::mapping(format!("row does not fit target type: {e}")))
        })
        .collect()
}

impl SelectBuilder {
    /// Render, fetch through a blocking executor, and map the rows.
    pub fn fetch<T, E>(&self, executor: &mut E) -> OrmResult<Vec<T>>
    where
        T: DeserializeOwned,
        E: Executor,
    {
        let dialect = executor.dialect();
        let query = self.render(dialect)?;
        let rows = executor.fetch(&query)?;
        map_rows(&rows, self.selection(), dialect)
    }

    /// Render, fetch through a suspending executor, and map the rows.
    pub async fn fetch_async<T, E>(&self, executor: &mut E) -> OrmResult<Vec<T>>
    where
        T: DeserializeOwned,
        E: AsyncExecutor,
    {
        let dialect = executor.dialect();
        let query = self.render(dialect)?;
        let rows = executor.fetch(&query).await?;
        map_rows(&rows, self.selection(), dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, TableBuilder, TableInfo};
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn schema() -> (TableInfo, TableInfo) {
        let user = TableBuilder::new("user")
            .column("id", ColumnDef::integer().primary())
            .column("email", ColumnDef::text())
            .build();
        let message = TableBuilder::new("message")
            .column("id", ColumnDef::integer().primary())
            .column("content", ColumnDef::text())
            .build();
        (user, message)
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct UserRow {
        id: i64,
        email: String,
    }

    #[test]
    fn flat_row_maps_to_struct() {
        let (user, _) = schema();
        let selection = Selection::from_table(&user);
        let rows = vec![BTreeMap::from([
            ("id".to_string(), json!(1)),
            ("email".to_string(), json!("a@b.com")),
        ])];
        let mapped: Vec<UserRow> = map_rows(&rows, &selection, Dialect::Postgres).unwrap();
        assert_eq!(
            mapped,
            vec![UserRow {
                id: 1,
                email: "a@b.com".to_string()
            }]
        );
    }

    #[test]
    fn missing_field_is_mapping_error() {
        let (user, _) = schema();
        let selection = Selection::from_table(&user);
        let row = BTreeMap::from([("id".to_string(), json!(1))]);
        let err = decode_row(&row, &selection, Dialect::Postgres).unwrap_err();
        assert!(err.is_mapping());
    }

    #[test]
    fn extra_field_is_mapping_error() {
        let (user, _) = schema();
        let selection = Selection::from_table(&user);
        let row = BTreeMap::from([
            ("id".to_string(), json!(1)),
            ("email".to_string(), json!("a@b.com")),
            ("ghost".to_string(), json!(0)),
        ]);
        let err = decode_row(&row, &selection, Dialect::Postgres).unwrap_err();
        assert!(err.is_mapping());
    }

    #[test]
    fn nested_many_decodes_json_text() {
        let (user, message) = schema();
        let selection = Selection::new()
            .column("id", user.column("id").unwrap())
            .many_table("messages", &message);
        let row = BTreeMap::from([
            ("id".to_string(), json!(1)),
            (
                "messages".to_string(),
                json!(r#"[{"id": 10, "content": "hi"}, {"id": 11, "content": "yo"}]"#),
            ),
        ]);
        let decoded = decode_row(&row, &selection, Dialect::Sqlite).unwrap();
        assert_eq!(decoded["messages"][0]["content"], json!("hi"));
        assert_eq!(decoded["messages"][1]["id"], json!(11));
    }

    #[test]
    fn nested_one_passes_through_native_json() {
        let (user, message) = schema();
        let selection = Selection::new()
            .column("id", message.column("id").unwrap())
            .one_table("author", &user);
        let row = BTreeMap::from([
            ("id".to_string(), json!(10)),
            ("author".to_string(), json!({"id": 1, "email": "a@b.com"})),
        ]);
        let decoded = decode_row(&row, &selection, Dialect::Postgres).unwrap();
        assert_eq!(decoded["author"]["email"], json!("a@b.com"));
    }

    #[test]
    fn nested_garbage_is_mapping_error() {
        let (user, message) = schema();
        let selection = Selection::new()
            .column("id", user.column("id").unwrap())
            .many_table("messages", &message);
        let row = BTreeMap::from([
            ("id".to_string(), json!(1)),
            ("messages".to_string(), json!("not json {{")),
        ]);
        let err = decode_row(&row, &selection, Dialect::Sqlite).unwrap_err();
        assert!(err.is_mapping());
    }

    #[test]
    fn nested_one_rejects_array_shape() {
        let (user, message) = schema();
        let selection = Selection::new()
            .column("id", message.column("id").unwrap())
            .one_table("author", &user);
        let row = BTreeMap::from([
            ("id".to_string(), json!(10)),
            ("author".to_string(), json!([{"id": 1}])),
        ]);
        let err = decode_row(&row, &selection, Dialect::Postgres).unwrap_err();
        assert!(err.is_mapping());
    }

    #[test]
    fn sqlite_fallback_json_then_timestamp_then_raw() {
        assert_eq!(coerce_sqlite(&json!("[1, 2]")), json!([1, 2]));
        assert_eq!(
            coerce_sqlite(&json!("2024-05-01 12:30:00")),
            json!("2024-05-01T12:30:00")
        );
        assert_eq!(coerce_sqlite(&json!("plain text")), json!("plain text"));
        assert_eq!(coerce_sqlite(&json!(5)), json!(5));
    }

    #[test]
    fn postgres_strings_are_not_sniffed() {
        let (user, _) = schema();
        let selection = Selection::new().column("email", user.column("email").unwrap());
        let row = BTreeMap::from([("email".to_string(), json!("[1]"))]);
        let decoded = decode_row(&row, &selection, Dialect::Postgres).unwrap();
        assert_eq!(decoded["email"], json!("[1]"));
    }
}
