//! Per-tenant lead store. Unlike users, the leads table has no fixed shape:
//! every statement is built from the tenant's materialized schema, and the
//! schema is the single authority on which columns exist and which of them
//! clients may write.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::error::ApiError;
use crate::schema::{ColumnType, LeadSchema, LEADS_TABLE};

pub const LEAD_SOURCES: &[&str] = &["website", "manual"];

/// A typed value ready to bind into a dynamically built statement.
enum BindValue {
    Text(Option<String>),
    Timestamp(DateTime<Utc>),
}

/// Validate a write payload against the schema and type each value for
/// binding. Keys must name insertable columns; anything else is rejected
/// rather than silently dropped. Order follows the payload, not the schema.
fn collect_writes(
    schema: &LeadSchema,
    payload: Map<String, Value>,
) -> Result<(Vec<String>, Vec<BindValue>), ApiError> {
    let mut columns = Vec::with_capacity(payload.len());
    let mut values = Vec::with_capacity(payload.len());

    for (key, value) in payload {
        let col = schema
            .column(&key)
            .filter(|c| c.insertable)
            .ok_or_else(|| ApiError::validation(format!("Unknown or read-only field: {}", key)))?;

        let bind = match col.ty {
            ColumnType::Timestamp => {
                let raw = value.as_str().ok_or_else(|| {
                    ApiError::validation(format!("Field {} must be a timestamp string", key))
                })?;
                let parsed = DateTime::parse_from_rfc3339(raw).map_err(|_| {
                    ApiError::validation(format!("Invalid timestamp for {}: {}", key, raw))
                })?;
                BindValue::Timestamp(parsed.with_timezone(&Utc))
            }
            ColumnType::Text => {
                let text = match value {
                    Value::String(s) => Some(s),
                    Value::Null => None,
                    other => {
                        return Err(ApiError::validation(format!(
                            "Field {} must be a string, got {}",
                            key, other
                        )))
                    }
                };
                if col.name == "source" {
                    match text.as_deref() {
                        Some(s) if LEAD_SOURCES.contains(&s) => {}
                        other => {
                            return Err(ApiError::validation(format!(
                                "Invalid source: {} (expected website or manual)",
                                other.unwrap_or("null")
                            )))
                        }
                    }
                }
                BindValue::Text(text)
            }
            // Only `id` is UUID-typed and it is never insertable
            ColumnType::Uuid => {
                return Err(ApiError::validation(format!(
                    "Unknown or read-only field: {}",
                    key
                )))
            }
        };

        columns.push(col.name.clone());
        values.push(bind);
    }

    Ok((columns, values))
}

pub struct LeadStore<'a> {
    pool: &'a PgPool,
    schema: &'a LeadSchema,
}

impl<'a> LeadStore<'a> {
    pub fn new(pool: &'a PgPool, schema: &'a LeadSchema) -> Self {
        Self { pool, schema }
    }

    pub async fn create(&self, payload: Map<String, Value>) -> Result<Value, ApiError> {
        let (columns, values) = collect_writes(self.schema, payload)?;
        if columns.is_empty() {
            return Err(ApiError::validation("Lead payload is empty"));
        }

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            LEADS_TABLE,
            columns
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(", "),
            placeholders.join(", "),
            self.select_list()
        );

        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value(query, value);
        }

        let row = query
            .fetch_one(self.pool)
            .await
            .map_err(DatabaseError::Sqlx)?;
        self.row_to_json(&row)
    }

    pub async fn list(&self) -> Result<Vec<Value>, ApiError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY capture_time DESC",
            self.select_list(),
            LEADS_TABLE
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(DatabaseError::Sqlx)?;

        rows.iter().map(|row| self.row_to_json(row)).collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<Value, ApiError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            self.select_list(),
            LEADS_TABLE
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(DatabaseError::Sqlx)?;

        match row {
            Some(row) => self.row_to_json(&row),
            None => Err(ApiError::not_found("Lead not found")),
        }
    }

    pub async fn update(&self, id: Uuid, payload: Map<String, Value>) -> Result<Value, ApiError> {
        let (columns, values) = collect_writes(self.schema, payload)?;
        if columns.is_empty() {
            return Err(ApiError::validation("Lead payload is empty"));
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ${}", quote(c), i + 2))
            .collect();
        let sql = format!(
            "UPDATE {} SET {}, updated_at = now() WHERE id = $1 RETURNING {}",
            LEADS_TABLE,
            assignments.join(", "),
            self.select_list()
        );

        let mut query = sqlx::query(&sql).bind(id);
        for value in values {
            query = bind_value(query, value);
        }

        let row = query
            .fetch_optional(self.pool)
            .await
            .map_err(DatabaseError::Sqlx)?;

        match row {
            Some(row) => self.row_to_json(&row),
            None => Err(ApiError::not_found("Lead not found")),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 RETURNING id", LEADS_TABLE);
        let deleted = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(DatabaseError::Sqlx)?;

        deleted
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("Lead not found"))
    }

    fn select_list(&self) -> String {
        self.schema
            .columns
            .iter()
            .map(|c| quote(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn row_to_json(&self, row: &PgRow) -> Result<Value, ApiError> {
        let mut object = Map::with_capacity(self.schema.columns.len());
        for col in &self.schema.columns {
            let value = match col.ty {
                ColumnType::Uuid => {
                    let id: Uuid = row.try_get(col.name.as_str()).map_err(DatabaseError::Sqlx)?;
                    json!(id)
                }
                ColumnType::Timestamp => {
                    let t: Option<DateTime<Utc>> =
                        row.try_get(col.name.as_str()).map_err(DatabaseError::Sqlx)?;
                    t.map(|t| json!(t)).unwrap_or(Value::Null)
                }
                ColumnType::Text => {
                    let s: Option<String> =
                        row.try_get(col.name.as_str()).map_err(DatabaseError::Sqlx)?;
                    s.map(Value::String).unwrap_or(Value::Null)
                }
            };
            object.insert(col.name.clone(), value);
        }
        Ok(Value::Object(object))
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    value: BindValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match value {
        BindValue::Text(text) => query.bind(text),
        BindValue::Timestamp(t) => query.bind(t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> LeadSchema {
        LeadSchema::build(&["name".to_string(), "email".to_string()])
    }

    fn collect(payload: Value) -> Result<Vec<String>, ApiError> {
        let Value::Object(map) = payload else {
            panic!("test payload must be an object");
        };
        collect_writes(&schema(), map).map(|(columns, _)| columns)
    }

    #[test]
    fn accepts_insertable_columns() {
        let columns = collect(json!({
            "name": "Alice",
            "email": "alice@example.com",
            "source": "website"
        }))
        .unwrap();
        assert!(columns.contains(&"name".to_string()));
        assert!(columns.contains(&"source".to_string()));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = collect(json!({"bogus": "x"})).unwrap_err();
        assert!(err.message().contains("bogus"));
    }

    #[test]
    fn rejects_read_only_metadata() {
        assert!(collect(json!({"id": "abc"})).is_err());
        assert!(collect(json!({"created_at": "2024-01-01T00:00:00Z"})).is_err());
    }

    #[test]
    fn rejects_invalid_source() {
        let err = collect(json!({"source": "imported"})).unwrap_err();
        assert!(err.message().contains("Invalid source"));
    }

    #[test]
    fn parses_capture_time() {
        assert!(collect(json!({"capture_time": "2024-06-01T10:30:00Z"})).is_ok());

        let err = collect(json!({"capture_time": "yesterday"})).unwrap_err();
        assert!(err.message().contains("Invalid timestamp"));
    }

    #[test]
    fn rejects_non_string_text_values() {
        let err = collect(json!({"name": 42})).unwrap_err();
        assert!(err.message().contains("must be a string"));
    }

    #[test]
    fn null_clears_a_text_field() {
        assert!(collect(json!({"name": null})).is_ok());
    }
}
