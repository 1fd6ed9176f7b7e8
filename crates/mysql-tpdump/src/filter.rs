//! Per-table filter synthesis.
//!
//! Decides whether and how a table's row scan is restricted using key
//! values already observed in upstream tables. Fragments from
//! different references are joined with OR: a row belongs to the
//! closure if it is pointed at by ANY known value set.

use crate::error::Result;
use crate::graph::DependencyGraph;

/// Outcome of filter synthesis for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableFilter {
    /// Scan with this WHERE clause.
    Predicate(String),

    /// Scan everything and keep every row (seed without a predicate,
    /// or a table with no outgoing references).
    ScanAll,

    /// An index exceeded the value threshold; scan everything and
    /// filter rows against the in-memory index during the dump.
    DeferredScan,

    /// No row of this table can be proven reachable; skip it entirely.
    Skip,
}

/// Synthesize the filter for `table`.
///
/// Rules, in order: an explicit predicate wins outright; the starting
/// table without one is scanned in full; otherwise each outgoing
/// reference contributes an equality fragment from the target's value
/// index, unless some index exceeds `max_values` (deferred scan) or
/// every index is empty (skip).
pub fn synthesize(
    graph: &DependencyGraph,
    table: &str,
    max_values: usize,
) -> Result<TableFilter> {
    let node = match graph.table(table) {
        Some(node) => node,
        None => return Ok(TableFilter::Skip),
    };

    if let Some(predicate) = &node.explicit_predicate {
        return Ok(TableFilter::Predicate(predicate.clone()));
    }
    if table == graph.start {
        // Seed with no user predicate: full scan, no closure check.
        return Ok(TableFilter::ScanAll);
    }

    let mut parts: Vec<String> = Vec::new();

    for reference in &node.out_refs {
        let values = graph
            .table(&reference.target_table)
            .and_then(|target| target.indexed_values(&reference.target_columns));
        let values = match values {
            Some(values) if !values.is_empty() => values,
            // Nothing known for this reference yet; it contributes no
            // fragment.
            _ => continue,
        };

        if values.len() > max_values {
            // An equality list this long is impractical; the dump
            // engine will filter rows in memory instead.
            tracing::debug!(
                table,
                reference = %reference.name,
                known = values.len(),
                max_values,
                "value index over threshold, deferring to in-memory filtering"
            );
            return Ok(TableFilter::DeferredScan);
        }

        if reference.source_columns.len() == 1 {
            let mut encoded = Vec::with_capacity(values.len());
            for tuple in values {
                encoded.push(tuple[0].to_sql_literal()?);
            }
            encoded.sort();
            parts.push(format!(
                "{} IN ({})",
                reference.source_columns[0],
                encoded.join(",")
            ));
        } else {
            let mut disjuncts = Vec::with_capacity(values.len());
            for tuple in values {
                let mut conds = Vec::with_capacity(tuple.len());
                for (column, value) in reference.source_columns.iter().zip(tuple) {
                    conds.push(format!("{}={}", column, value.to_sql_literal()?));
                }
                disjuncts.push(format!("({})", conds.join(" AND ")));
            }
            disjuncts.sort();
            parts.extend(disjuncts);
        }
    }

    if parts.is_empty() {
        if node.out_refs.is_empty() {
            return Ok(TableFilter::ScanAll);
        }
        return Ok(TableFilter::Skip);
    }

    Ok(TableFilter::Predicate(parts.join(" OR ")))
}
