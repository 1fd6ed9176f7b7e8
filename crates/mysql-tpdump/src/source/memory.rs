//! In-memory row source for tests.
//!
//! Holds fixture tables and foreign-key rows, and evaluates exactly
//! the predicate shapes the filter synthesizer generates: single
//! column `IN` lists, parenthesized equality conjunctions, and `OR`
//! combinations of those. Anything else is a scan error, which keeps
//! fixtures honest.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::value::ScalarValue;
use crate::error::{DumpError, Result};
use crate::graph::ForeignKeyRow;
use crate::source::{RowSource, ScanEvent};

/// A fixture table: column names plus rows of scalars.
#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<ScalarValue>>,
}

/// In-memory [`RowSource`].
#[derive(Debug, Default)]
pub struct MemorySource {
    foreign_keys: Vec<ForeignKeyRow>,
    tables: HashMap<String, MemoryTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one column of a foreign key. Call repeatedly with the
    /// same constraint name for composite keys, in key-column order.
    pub fn with_foreign_key(
        mut self,
        source_table: &str,
        source_column: &str,
        constraint_name: &str,
        target_table: &str,
        target_column: &str,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyRow {
            source_table: source_table.to_string(),
            source_column: source_column.to_string(),
            constraint_name: constraint_name.to_string(),
            target_table: target_table.to_string(),
            target_column: target_column.to_string(),
        });
        self
    }

    /// Register a table with its rows.
    pub fn with_table(
        mut self,
        name: &str,
        columns: &[&str],
        rows: Vec<Vec<ScalarValue>>,
    ) -> Self {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            },
        );
        self
    }
}

#[async_trait]
impl RowSource for MemorySource {
    async fn load_foreign_keys(&self, _schema: &str) -> Result<Vec<ForeignKeyRow>> {
        Ok(self.foreign_keys.clone())
    }

    async fn scan(
        &self,
        table: &str,
        statement: &str,
    ) -> Result<mpsc::Receiver<Result<ScanEvent>>> {
        let fixture = self
            .tables
            .get(table)
            .ok_or_else(|| DumpError::scan(table, format!("no fixture table '{}'", table)))?;

        let predicate = statement
            .split_once(" WHERE ")
            .map(|(_, clause)| Predicate::parse(clause))
            .transpose()
            .map_err(|e| DumpError::scan(table, e))?;

        let kept: Vec<&Vec<ScalarValue>> = fixture
            .rows
            .iter()
            .filter(|row| match &predicate {
                Some(p) => p.matches(&fixture.columns, row),
                None => true,
            })
            .collect();

        let (tx, rx) = mpsc::channel(kept.len() + 2);
        if !kept.is_empty() {
            let _ = tx.try_send(Ok(ScanEvent::Columns(fixture.columns.clone())));
            for row in kept {
                let _ = tx.try_send(Ok(ScanEvent::Row(row.clone())));
            }
        }
        Ok(rx)
    }
}

/// Parsed form of an engine-generated WHERE clause: a disjunction of
/// clauses, each an IN list or an equality conjunction.
#[derive(Debug)]
struct Predicate {
    clauses: Vec<Clause>,
}

#[derive(Debug)]
enum Clause {
    In { column: String, values: Vec<ScalarValue> },
    Equalities(Vec<(String, ScalarValue)>),
}

impl Predicate {
    fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut clauses = Vec::new();
        for part in text.split(" OR ") {
            clauses.push(Clause::parse(part.trim())?);
        }
        Ok(Predicate { clauses })
    }

    fn matches(&self, columns: &[String], row: &[ScalarValue]) -> bool {
        let positions: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        self.clauses.iter().any(|c| c.matches(&positions, row))
    }
}

impl Clause {
    fn parse(text: &str) -> std::result::Result<Self, String> {
        if let Some((column, rest)) = text.split_once(" IN (") {
            let list = rest
                .strip_suffix(')')
                .ok_or_else(|| format!("unterminated IN list: {}", text))?;
            let values = list
                .split(',')
                .map(parse_literal)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            return Ok(Clause::In {
                column: column.trim().to_string(),
                values,
            });
        }

        let inner = text
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .unwrap_or(text);
        let mut equalities = Vec::new();
        for cond in inner.split(" AND ") {
            let (column, literal) = cond
                .split_once('=')
                .ok_or_else(|| format!("unsupported clause: {}", cond))?;
            equalities.push((column.trim().to_string(), parse_literal(literal)?));
        }
        Ok(Clause::Equalities(equalities))
    }

    fn matches(&self, positions: &HashMap<&str, usize>, row: &[ScalarValue]) -> bool {
        match self {
            Clause::In { column, values } => positions
                .get(column.as_str())
                .and_then(|&i| row.get(i))
                .map(|cell| values.iter().any(|v| v == cell))
                .unwrap_or(false),
            Clause::Equalities(conds) => conds.iter().all(|(column, value)| {
                positions
                    .get(column.as_str())
                    .and_then(|&i| row.get(i))
                    .map(|cell| cell == value)
                    .unwrap_or(false)
            }),
        }
    }
}

fn parse_literal(text: &str) -> std::result::Result<ScalarValue, String> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return Ok(ScalarValue::Text(inner.to_string()));
    }
    if let Ok(v) = text.parse::<i64>() {
        return Ok(ScalarValue::Int(v));
    }
    if let Ok(v) = text.parse::<f64>() {
        return Ok(ScalarValue::Float(v));
    }
    Err(format!("unsupported literal: {}", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(mut rx: mpsc::Receiver<Result<ScanEvent>>) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event.unwrap());
        }
        events
    }

    fn orders_source() -> MemorySource {
        MemorySource::new().with_table(
            "orders",
            &["id", "label"],
            vec![
                vec![ScalarValue::Int(1), ScalarValue::Text("a".into())],
                vec![ScalarValue::Int(2), ScalarValue::Text("b".into())],
                vec![ScalarValue::Int(3), ScalarValue::Text("c".into())],
            ],
        )
    }

    #[tokio::test]
    async fn test_unfiltered_scan_returns_all_rows() {
        let rx = orders_source()
            .scan("orders", "select * from `orders`")
            .await
            .unwrap();
        let events = collect(rx);
        assert!(matches!(&events[0], ScanEvent::Columns(c) if c == &["id", "label"]));
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn test_in_list_filtering() {
        let rx = orders_source()
            .scan("orders", "select * from `orders` WHERE id IN (1,3)")
            .await
            .unwrap();
        let events = collect(rx);
        assert_eq!(events.len(), 3); // columns + 2 rows
    }

    #[tokio::test]
    async fn test_equality_conjunction_filtering() {
        let rx = orders_source()
            .scan(
                "orders",
                "select * from `orders` WHERE (id=2 AND label='b') OR (id=9 AND label='z')",
            )
            .await
            .unwrap();
        let events = collect(rx);
        assert_eq!(events.len(), 2); // columns + 1 row
    }

    #[tokio::test]
    async fn test_empty_result_sends_nothing() {
        let rx = orders_source()
            .scan("orders", "select * from `orders` WHERE id IN (99)")
            .await
            .unwrap();
        assert!(collect(rx).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_table_is_scan_error() {
        let err = orders_source()
            .scan("ghosts", "select * from `ghosts`")
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::RowScan { .. }));
    }
}
