//! MySQL/MariaDB row source implementation.
//!
//! Uses SQLx for connection pooling and async query execution.
//! Foreign-key metadata comes from `information_schema`; table scans
//! are streamed through a bounded channel so the engine never holds a
//! whole table in memory.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::core::value::ScalarValue;
use crate::error::{DumpError, Result};
use crate::graph::ForeignKeyRow;
use crate::source::{RowSource, ScanEvent};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Channel depth for streaming scans.
const SCAN_CHANNEL_CAPACITY: usize = 64;

/// One row per column of every foreign key in the schema. Ordering by
/// constraint name and ordinal position keeps composite-key columns
/// contiguous and in key order.
const LOAD_REFS_QUERY: &str = r#"
    SELECT
        CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME,
        CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
        CAST(CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
        CAST(REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
        CAST(REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME
    FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
    WHERE TABLE_SCHEMA = ? AND REFERENCED_COLUMN_NAME IS NOT NULL
    ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
"#;

/// MySQL/MariaDB row source.
pub struct MysqlSource {
    pool: MySqlPool,
}

impl MysqlSource {
    /// Connect to MySQL and verify the connection.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .charset("utf8mb4");

        // The dump is strictly sequential; one connection streams rows
        // while a second serves metadata queries.
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| DumpError::connection(e, "creating MySQL pool"))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| DumpError::connection(e, "testing MySQL connection"))?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self { pool })
    }

    /// Convert one result row into scalar values, driven by the
    /// driver's column type names. Types outside the encoder's closed
    /// set become [`ScalarValue::Unsupported`] and fail at encode time.
    fn row_to_values(row: &MySqlRow) -> Vec<ScalarValue> {
        row.columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let type_name = col.type_info().name();

                let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
                if is_null {
                    return ScalarValue::Null;
                }

                match type_name {
                    "TINYINT" | "BOOLEAN" => row
                        .try_get::<i8, _>(i)
                        .map(|v| ScalarValue::Int(v as i64))
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "SMALLINT" => row
                        .try_get::<i16, _>(i)
                        .map(|v| ScalarValue::Int(v as i64))
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "MEDIUMINT" | "INT" => row
                        .try_get::<i32, _>(i)
                        .map(|v| ScalarValue::Int(v as i64))
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "BIGINT" => row
                        .try_get::<i64, _>(i)
                        .map(ScalarValue::Int)
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "TINYINT UNSIGNED" => row
                        .try_get::<u8, _>(i)
                        .map(|v| ScalarValue::UInt(v as u64))
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "SMALLINT UNSIGNED" => row
                        .try_get::<u16, _>(i)
                        .map(|v| ScalarValue::UInt(v as u64))
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => row
                        .try_get::<u32, _>(i)
                        .map(|v| ScalarValue::UInt(v as u64))
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "BIGINT UNSIGNED" => row
                        .try_get::<u64, _>(i)
                        .map(ScalarValue::UInt)
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "FLOAT" => row
                        .try_get::<f32, _>(i)
                        .map(|v| ScalarValue::Float(v as f64))
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "DOUBLE" => row
                        .try_get::<f64, _>(i)
                        .map(ScalarValue::Float)
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "DECIMAL" => row
                        .try_get::<rust_decimal::Decimal, _>(i)
                        .map(ScalarValue::Decimal)
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT"
                    | "ENUM" | "SET" => row
                        .try_get::<String, _>(i)
                        .map(ScalarValue::Text)
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),
                    "DATETIME" | "TIMESTAMP" => row
                        .try_get::<chrono::NaiveDateTime, _>(i)
                        .map(ScalarValue::DateTime)
                        .unwrap_or_else(|_| ScalarValue::Unsupported(type_name.to_string())),

                    // BLOB, BIT, DATE, TIME, YEAR, JSON, GEOMETRY, ...
                    other => ScalarValue::Unsupported(other.to_string()),
                }
            })
            .collect()
    }
}

#[async_trait]
impl RowSource for MysqlSource {
    async fn load_foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyRow>> {
        let rows: Vec<MySqlRow> = sqlx::query(LOAD_REFS_QUERY)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DumpError::SchemaLoad(e.to_string()))?;

        let fk_rows: Vec<ForeignKeyRow> = rows
            .iter()
            .map(|row| ForeignKeyRow {
                source_table: row.get("TABLE_NAME"),
                source_column: row.get("COLUMN_NAME"),
                constraint_name: row.get("CONSTRAINT_NAME"),
                target_table: row.get("REFERENCED_TABLE_NAME"),
                target_column: row.get("REFERENCED_COLUMN_NAME"),
            })
            .collect();

        debug!(
            "Loaded {} foreign-key columns for schema '{}'",
            fk_rows.len(),
            schema
        );
        Ok(fk_rows)
    }

    async fn scan(
        &self,
        table: &str,
        statement: &str,
    ) -> Result<mpsc::Receiver<Result<ScanEvent>>> {
        let (tx, rx) = mpsc::channel(SCAN_CHANNEL_CAPACITY);
        let pool = self.pool.clone();
        let table = table.to_string();
        let statement = statement.to_string();

        tokio::spawn(async move {
            let mut stream = sqlx::query(&statement).fetch(&pool);
            let mut sent_columns = false;

            loop {
                match stream.try_next().await {
                    Ok(Some(row)) => {
                        if !sent_columns {
                            let columns = row
                                .columns()
                                .iter()
                                .map(|c| c.name().to_string())
                                .collect();
                            if tx.send(Ok(ScanEvent::Columns(columns))).await.is_err() {
                                return; // receiver dropped: cancelled
                            }
                            sent_columns = true;
                        }
                        let values = Self::row_to_values(&row);
                        if tx.send(Ok(ScanEvent::Row(values))).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => return,
                    Err(e) => {
                        let _ = tx.send(Err(DumpError::scan(&table, e))).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
