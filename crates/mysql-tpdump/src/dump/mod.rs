//! Streaming dump engine.
//!
//! Processes tables strictly one at a time in sequencer order: later
//! tables' filters depend on earlier tables' completed value indexes,
//! so no parallelism is possible without breaking that invariant. Rows
//! are consumed in a single forward pass; only the indexed key tuples
//! are retained per row, never whole rows.

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, MatchMode};
use crate::core::identifier::quote_ident;
use crate::core::value::ScalarValue;
use crate::error::{DumpError, Result};
use crate::filter::{synthesize, TableFilter};
use crate::graph::{ColumnSet, DependencyGraph, Reference};
use crate::source::{RowSource, ScanEvent};

/// Session settings written before any data: pin the character set and
/// time zone, disable constraint checking and triggers on replay so
/// load order inside a table never matters.
const PREAMBLE: &[&str] = &[
    "SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT;",
    "SET @OLD_CHARACTER_SET_RESULTS=@@CHARACTER_SET_RESULTS;",
    "SET @OLD_COLLATION_CONNECTION=@@COLLATION_CONNECTION;",
    "SET NAMES utf8;",
    "SET @OLD_TIME_ZONE=@@TIME_ZONE;",
    "SET TIME_ZONE='+00:00';",
    "SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0;",
    "SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0;",
    "SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE='NO_AUTO_VALUE_ON_ZERO';",
    "SET @OLD_SQL_NOTES=@@SQL_NOTES, SQL_NOTES=0;",
    "SET @OLD_AUTOCOMMIT=@@AUTOCOMMIT, AUTOCOMMIT=0;",
    "SET @DISABLE_TRIGGERS=1;",
];

/// Session restoration written after the last table.
const CLOSING: &[&str] = &[
    "SET @DISABLE_TRIGGERS=NULL;",
    "SET TIME_ZONE=@OLD_TIME_ZONE;",
    "SET SQL_MODE=@OLD_SQL_MODE;",
    "SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS;",
    "SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS;",
    "SET CHARACTER_SET_CLIENT=@OLD_CHARACTER_SET_CLIENT;",
    "SET CHARACTER_SET_RESULTS=@OLD_CHARACTER_SET_RESULTS;",
    "SET COLLATION_CONNECTION=@OLD_COLLATION_CONNECTION;",
    "SET SQL_NOTES=@OLD_SQL_NOTES;",
    "SET AUTOCOMMIT=@OLD_AUTOCOMMIT;",
    "COMMIT;",
];

/// Result of one dump run.
#[derive(Debug, Clone, Serialize)]
pub struct DumpSummary {
    /// Tables that produced at least a scan (including empty results).
    pub tables_dumped: usize,

    /// Tables excluded because no row could be proven reachable.
    pub tables_skipped: usize,

    /// Total rows written across all tables.
    pub rows_written: u64,

    /// Per-table detail in processing order.
    pub tables: Vec<TableSummary>,
}

/// Per-table outcome.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: u64,
    pub skipped: bool,

    /// The WHERE clause used, if the scan was predicated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

impl DumpSummary {
    /// Serialize the summary as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Streams the referential closure of the starting table into a SQL
/// script.
pub struct DumpEngine<'a, S, W> {
    source: &'a S,
    config: &'a Config,
    out: W,
}

impl<'a, S: RowSource, W: Write> DumpEngine<'a, S, W> {
    pub fn new(source: &'a S, config: &'a Config, out: W) -> Self {
        Self {
            source,
            config,
            out,
        }
    }

    /// Run the dump: load metadata, build the graph, and process every
    /// table of the closure in dependency order.
    pub async fn run(mut self) -> Result<DumpSummary> {
        let fk_rows = self
            .source
            .load_foreign_keys(&self.config.database.database)
            .await?;

        let mut graph = DependencyGraph::build(
            self.config.dump.table.clone(),
            self.config.dump.r#where.clone(),
            &fk_rows,
        );
        let order = graph.processing_order();
        info!(
            tables = order.len(),
            start = %self.config.dump.table,
            "processing order computed"
        );

        for line in PREAMBLE {
            writeln!(self.out, "{}", line)?;
        }
        writeln!(self.out)?;
        writeln!(self.out)?;

        let mut summary = DumpSummary {
            tables_dumped: 0,
            tables_skipped: 0,
            rows_written: 0,
            tables: Vec::with_capacity(order.len()),
        };

        for table in &order {
            let table_summary = self.process_table(&mut graph, table).await?;
            if table_summary.skipped {
                summary.tables_skipped += 1;
            } else {
                summary.tables_dumped += 1;
                summary.rows_written += table_summary.rows;
            }
            summary.tables.push(table_summary);
        }

        for line in CLOSING {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()?;

        info!(
            tables_dumped = summary.tables_dumped,
            tables_skipped = summary.tables_skipped,
            rows = summary.rows_written,
            "dump complete"
        );
        Ok(summary)
    }

    async fn process_table(
        &mut self,
        graph: &mut DependencyGraph,
        table: &str,
    ) -> Result<TableSummary> {
        let filter = synthesize(graph, table, self.config.dump.max_values_per_column_set)?;

        if filter == TableFilter::Skip {
            debug!(table, "no reachable rows, skipping");
            writeln!(self.out, "-- skipping {}", table)?;
            return Ok(TableSummary {
                name: table.to_string(),
                rows: 0,
                skipped: true,
                predicate: None,
            });
        }

        let mut statement = format!("select * from {}", quote_ident(table));
        let predicate = match &filter {
            TableFilter::Predicate(p) => {
                statement.push_str(" WHERE ");
                statement.push_str(p);
                Some(p.clone())
            }
            _ => None,
        };
        writeln!(self.out, "-- {}", statement)?;

        let deferred = filter == TableFilter::DeferredScan;
        let (out_refs, stored_sets): (Vec<Reference>, Vec<ColumnSet>) = {
            let node = graph
                .table(table)
                .ok_or_else(|| DumpError::scan(table, "table vanished from graph"))?;
            (
                node.out_refs.clone(),
                node.stored_column_sets.iter().cloned().collect(),
            )
        };

        let mut rx = self.source.scan(table, &statement).await?;

        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut count: u64 = 0;

        while let Some(event) = rx.recv().await {
            match event? {
                ScanEvent::Columns(cols) => {
                    positions = cols
                        .iter()
                        .enumerate()
                        .map(|(i, c)| (c.clone(), i))
                        .collect();
                    columns = cols;
                }
                ScanEvent::Row(row) => {
                    if columns.is_empty() {
                        return Err(DumpError::scan(table, "row received before column list"));
                    }

                    // No predicate could be built: check the row
                    // against the in-memory index instead.
                    if deferred
                        && !out_refs.is_empty()
                        && !Self::row_reachable(
                            graph,
                            &out_refs,
                            &row,
                            &positions,
                            self.config.dump.match_mode,
                        )
                    {
                        continue;
                    }

                    // Encode before writing anything for this row; an
                    // unsupported value aborts the run.
                    let mut literals = Vec::with_capacity(row.len());
                    for value in &row {
                        literals.push(value.to_sql_literal()?);
                    }

                    if count == 0 {
                        writeln!(self.out, "LOCK TABLES {} WRITE;", quote_ident(table))?;
                        let col_list = columns
                            .iter()
                            .map(|c| quote_ident(c))
                            .collect::<Vec<_>>()
                            .join(",");
                        writeln!(
                            self.out,
                            "{} INTO {} ({}) VALUES",
                            self.config.dump.insert_verb,
                            quote_ident(table),
                            col_list
                        )?;
                    } else {
                        write!(self.out, ",\n")?;
                    }
                    write!(self.out, "({})", literals.join(","))?;
                    count += 1;

                    // Store referenced key tuples for downstream
                    // filter synthesis.
                    for column_set in &stored_sets {
                        let tuple: Option<Vec<ScalarValue>> = column_set
                            .iter()
                            .map(|c| positions.get(c).and_then(|&i| row.get(i)).cloned())
                            .collect();
                        let tuple = tuple.ok_or_else(|| {
                            DumpError::scan(
                                table,
                                format!("referenced columns {:?} missing from result", column_set),
                            )
                        })?;
                        graph
                            .table_mut(table)
                            .ok_or_else(|| DumpError::scan(table, "table vanished from graph"))?
                            .index_values(column_set, tuple);
                    }
                }
            }
        }

        if count > 0 {
            write!(self.out, ";\nUNLOCK TABLES;\n")?;
        }
        writeln!(self.out, "-- found {} rows in {}\n\n", count, quote_ident(table))?;

        debug!(table, rows = count, deferred, "table done");
        Ok(TableSummary {
            name: table.to_string(),
            rows: count,
            skipped: false,
            predicate,
        })
    }

    /// Deferred-scan retention: does the row's key tuple appear in the
    /// target index of at least one outgoing reference (ANY), or of
    /// every outgoing reference (ALL)?
    fn row_reachable(
        graph: &DependencyGraph,
        out_refs: &[Reference],
        row: &[ScalarValue],
        positions: &HashMap<String, usize>,
        mode: MatchMode,
    ) -> bool {
        let matches = |reference: &Reference| -> bool {
            let values = match graph
                .table(&reference.target_table)
                .and_then(|t| t.indexed_values(&reference.target_columns))
            {
                Some(values) => values,
                None => return false,
            };
            let tuple: Option<Vec<ScalarValue>> = reference
                .source_columns
                .iter()
                .map(|c| positions.get(c).and_then(|&i| row.get(i)).cloned())
                .collect();
            match tuple {
                Some(tuple) => values.contains(&tuple),
                None => false,
            }
        };

        match mode {
            MatchMode::Any => out_refs.iter().any(matches),
            MatchMode::All => out_refs.iter().all(matches),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, DumpConfig};
    use crate::source::memory::MemorySource;

    fn test_config(table: &str, r#where: Option<&str>) -> Config {
        Config {
            database: DatabaseConfig {
                host: "localhost".into(),
                port: 3306,
                database: "shop".into(),
                user: "dumper".into(),
                password: String::new(),
            },
            dump: DumpConfig {
                table: table.into(),
                r#where: r#where.map(|w| w.to_string()),
                insert_verb: "REPLACE".into(),
                max_values_per_column_set: 20,
                match_mode: MatchMode::Any,
            },
        }
    }

    async fn run_dump(source: &MemorySource, config: &Config) -> (String, DumpSummary) {
        let mut out = Vec::new();
        let summary = DumpEngine::new(source, config, &mut out).run().await.unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[tokio::test]
    async fn test_preamble_and_closing_wrap_output() {
        let source = MemorySource::new().with_table("orders", &["id"], vec![]);
        let config = test_config("orders", None);
        let (output, _) = run_dump(&source, &config).await;

        assert!(output.starts_with("SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT;\n"));
        assert!(output.contains("SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS;"));
        assert!(output.trim_end().ends_with("COMMIT;"));
    }

    #[tokio::test]
    async fn test_empty_table_records_count_without_insert_block() {
        let source = MemorySource::new().with_table("orders", &["id"], vec![]);
        let config = test_config("orders", None);
        let (output, summary) = run_dump(&source, &config).await;

        assert!(output.contains("-- select * from `orders`\n"));
        assert!(output.contains("-- found 0 rows in `orders`"));
        assert!(!output.contains("LOCK TABLES"));
        assert_eq!(summary.tables_dumped, 1);
        assert_eq!(summary.rows_written, 0);
    }

    #[tokio::test]
    async fn test_insert_block_shape() {
        let source = MemorySource::new().with_table(
            "orders",
            &["id", "label"],
            vec![
                vec![ScalarValue::Int(1), ScalarValue::Text("a".into())],
                vec![ScalarValue::Int(2), ScalarValue::Text("b".into())],
            ],
        );
        let config = test_config("orders", None);
        let (output, summary) = run_dump(&source, &config).await;

        assert!(output.contains("LOCK TABLES `orders` WRITE;\n"));
        assert!(output.contains("REPLACE INTO `orders` (`id`,`label`) VALUES\n"));
        assert!(output.contains("(1,'a'),\n(2,'b');\nUNLOCK TABLES;\n"));
        assert!(output.contains("-- found 2 rows in `orders`"));
        assert_eq!(summary.rows_written, 2);
    }

    #[tokio::test]
    async fn test_unsupported_value_aborts_run() {
        let source = MemorySource::new().with_table(
            "orders",
            &["id", "payload"],
            vec![vec![ScalarValue::Int(1), ScalarValue::Unsupported("BLOB".into())]],
        );
        let config = test_config("orders", None);
        let mut out = Vec::new();
        let err = DumpEngine::new(&source, &config, &mut out)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, DumpError::UnsupportedValue { .. }));
    }
}
