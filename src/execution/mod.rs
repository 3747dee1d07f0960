//! Statement executor
//!
//! The only component that touches the store. Every statement is gated by
//! [`safety::check_read_only`] first; rejected statements never reach SQLite.

pub mod safety;

use crate::error::PipelineError;
use crate::models::Row;
use crate::Result;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, warn};

pub use safety::{check_read_only, is_safe, SafetyViolation};

const MAX_CONNECTIONS: u32 = 5;

/// Executes gated statements against a shared SQLite pool
#[derive(Clone)]
pub struct SqlExecutor {
    pool: SqlitePool,
}

impl SqlExecutor {
    /// Opens the store read-only. One executor per process.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Safety gate plus a query-plan dry run
    pub async fn validate(&self, sql: &str) -> Result<()> {
        check_read_only(sql).map_err(|v| PipelineError::ValidationError(v.to_string()))?;

        let plan = format!("EXPLAIN QUERY PLAN {}", sql);
        sqlx::query(&plan)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::ValidationError(e.to_string()))?;

        Ok(())
    }

    pub async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        if let Err(violation) = check_read_only(sql) {
            warn!(reason = %violation, "Rejected unsafe statement");
            return Err(PipelineError::ValidationError(violation.to_string()));
        }

        let start = Instant::now();
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::ExecutionError(e.to_string()))?;

        debug!(
            row_count = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statement executed"
        );

        Ok(rows.iter().map(decode_row).collect())
    }
}

/// Field → value in result-set column order
fn decode_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .map(|column| {
            let value = decode_value(row, column.ordinal());
            (column.name().to_string(), value)
        })
        .collect()
}

/// SQLite values carry their own storage class, so decoding follows the
/// value rather than the declared column type.
fn decode_value(row: &SqliteRow, index: usize) -> Value {
    let raw = match row.try_get_raw(index) {
        Ok(raw) => raw,
        Err(_) => return Value::Null,
    };
    if raw.is_null() {
        return Value::Null;
    }

    let storage = raw.type_info().name().to_string();
    match storage.as_str() {
        "INTEGER" => row
            .try_get::<i64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get::<f64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(hex::encode(bytes)))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn executor() -> SqlExecutor {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE ledger (id INTEGER, name TEXT, amount REAL, note TEXT, raw BLOB)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO ledger VALUES (1, 'rooms', 125.5, NULL, x'0aff'), (2, 'food', 40.0, 'late', NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();

        SqlExecutor::from_pool(pool)
    }

    #[tokio::test]
    async fn test_rows_follow_result_column_order() {
        let executor = executor().await;
        let rows = executor
            .execute("SELECT name, id, amount, note, raw FROM ledger ORDER BY id")
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["name", "id", "amount", "note", "raw"]);
        assert_eq!(rows[0]["name"], json!("rooms"));
        assert_eq!(rows[0]["id"], json!(1));
        assert_eq!(rows[0]["amount"], json!(125.5));
        assert_eq!(rows[0]["note"], Value::Null);
        assert_eq!(rows[0]["raw"], json!("0aff"));
        assert_eq!(rows[1]["note"], json!("late"));
    }

    #[tokio::test]
    async fn test_aggregate_columns_decode() {
        let executor = executor().await;
        let rows = executor
            .execute("SELECT COUNT(*) AS n, SUM(amount) AS total FROM ledger")
            .await
            .unwrap();
        assert_eq!(rows[0]["n"], json!(2));
        assert_eq!(rows[0]["total"], json!(165.5));
    }

    #[tokio::test]
    async fn test_unsafe_statement_never_reaches_store() {
        let executor = executor().await;
        let err = executor.execute("DELETE FROM ledger").await.unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError(_)));

        let rows = executor.execute("SELECT * FROM ledger").await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_carries_message() {
        let executor = executor().await;
        let err = executor.execute("SELECT * FROM missing_table").await.unwrap_err();
        match err {
            PipelineError::ExecutionError(message) => assert!(message.contains("no such table")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_runs_query_plan() {
        let executor = executor().await;
        assert!(executor.validate("SELECT name FROM ledger WHERE id = 1").await.is_ok());

        let err = executor.validate("SELECT nope FROM ledger").await.unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError(_)));

        let err = executor.validate("DROP TABLE ledger").await.unwrap_err();
        assert!(err.to_string().contains("only read statements"));
    }
}
