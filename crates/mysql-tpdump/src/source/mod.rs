//! Row source collaborators.
//!
//! The dump engine is written against [`RowSource`]: something that
//! can hand over the schema's foreign-key metadata and stream the rows
//! of an arbitrary SELECT statement. The production implementation is
//! [`mysql::MysqlSource`]; [`memory::MemorySource`] backs the tests.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::value::ScalarValue;
use crate::error::Result;
use crate::graph::ForeignKeyRow;

/// One message of a streaming table scan.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Column names in select order. Sent exactly once, before the
    /// first row; a scan with no rows sends nothing at all.
    Columns(Vec<String>),

    /// One row of typed scalars, positionally matching the columns.
    Row(Vec<ScalarValue>),
}

/// Reads schema metadata and streams rows.
///
/// Scans are forward-only and lazily consumed; dropping the receiver
/// is treated as a normal end-of-input by implementations, which is
/// how a caller cancels a long-running scan.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// All foreign-key constraint rows for a schema, one row per
    /// column of a possibly-composite key, ordered so that rows of the
    /// same constraint are contiguous and in key-column order.
    async fn load_foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyRow>>;

    /// Execute a SELECT statement against `table` and stream its
    /// result. The table name is carried for error context; the
    /// statement is authoritative.
    async fn scan(&self, table: &str, statement: &str)
        -> Result<mpsc::Receiver<Result<ScanEvent>>>;
}
