//! Foreign-key dependency graph over the tables of one schema.
//!
//! Built once per run from `information_schema` rows, read-mostly
//! afterwards: the only mutation after construction is the growth of
//! each table's value index while rows are dumped.

pub mod order;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::value::ScalarValue;

/// One `key_column_usage` row: a single column of a possibly-composite
/// foreign key.
#[derive(Debug, Clone)]
pub struct ForeignKeyRow {
    pub source_table: String,
    pub source_column: String,
    pub constraint_name: String,
    pub target_table: String,
    pub target_column: String,
}

/// A foreign-key constraint mapping source-table columns to the
/// same-arity target-table columns.
///
/// Composite keys are kept as ordered column lists, never split;
/// `source_columns[i]` pairs with `target_columns[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub source_table: String,
    pub target_table: String,
    pub source_columns: Vec<String>,
    pub target_columns: Vec<String>,
}

/// An ordered tuple of column names, keying one slice of the value index.
pub type ColumnSet = Vec<String>;

/// An observed tuple of key values, one per column of a [`ColumnSet`].
pub type ValueTuple = Vec<ScalarValue>;

/// Per-table descriptor: links into the reference graph plus the index
/// of key values observed while dumping.
#[derive(Debug, Default)]
pub struct TableNode {
    pub name: String,

    /// References where this table is the source; read by the filter
    /// synthesizer to look up already-known target values.
    pub out_refs: Vec<Reference>,

    /// References where this table is the target; used only during
    /// graph traversal to find the tables that depend on this one.
    pub in_refs: Vec<Reference>,

    /// Target-column tuples some reference points at. Every tuple here
    /// must be indexed for each dumped row.
    pub stored_column_sets: BTreeSet<ColumnSet>,

    /// Observed key values per stored column set, populated
    /// incrementally as rows are dumped. Values are only ever added.
    pub value_index: HashMap<ColumnSet, HashSet<ValueTuple>>,

    /// User-supplied filter; set only on the starting table.
    pub explicit_predicate: Option<String>,
}

impl TableNode {
    fn named(name: &str) -> Self {
        TableNode {
            name: name.to_string(),
            ..TableNode::default()
        }
    }

    /// Observed values for one target-column tuple; empty if nothing
    /// has been indexed yet.
    pub fn indexed_values(&self, columns: &[String]) -> Option<&HashSet<ValueTuple>> {
        self.value_index.get(columns)
    }

    /// Record one observed value tuple for a column set.
    pub fn index_values(&mut self, columns: &ColumnSet, values: ValueTuple) {
        self.value_index
            .entry(columns.clone())
            .or_default()
            .insert(values);
    }
}

/// The full table graph plus the starting table name.
#[derive(Debug)]
pub struct DependencyGraph {
    pub tables: HashMap<String, TableNode>,
    pub start: String,
}

impl DependencyGraph {
    /// Build the graph from foreign-key metadata rows.
    ///
    /// Rows sharing a constraint name (and table pair) are grouped into
    /// one [`Reference`] whose column-pair order matches input row
    /// order. Self-referencing constraints are discarded. Descriptors
    /// are created lazily on first mention; no schema-consistency
    /// validation happens beyond that.
    pub fn build(
        start: impl Into<String>,
        explicit_predicate: Option<String>,
        rows: &[ForeignKeyRow],
    ) -> Self {
        let start = start.into();

        // Group rows into references, preserving first-seen order so
        // traversal and output stay deterministic.
        let mut refs: Vec<Reference> = Vec::new();
        let mut by_key: HashMap<(String, String, String), usize> = HashMap::new();

        for row in rows {
            if row.source_table == row.target_table {
                tracing::debug!(
                    constraint = %row.constraint_name,
                    table = %row.source_table,
                    "discarding self-referencing constraint"
                );
                continue;
            }
            let key = (
                row.constraint_name.clone(),
                row.source_table.clone(),
                row.target_table.clone(),
            );
            let idx = *by_key.entry(key).or_insert_with(|| {
                refs.push(Reference {
                    name: row.constraint_name.clone(),
                    source_table: row.source_table.clone(),
                    target_table: row.target_table.clone(),
                    source_columns: Vec::new(),
                    target_columns: Vec::new(),
                });
                refs.len() - 1
            });
            refs[idx].source_columns.push(row.source_column.clone());
            refs[idx].target_columns.push(row.target_column.clone());
        }

        let mut tables: HashMap<String, TableNode> = HashMap::new();
        for reference in refs {
            let source = tables
                .entry(reference.source_table.clone())
                .or_insert_with(|| TableNode::named(&reference.source_table));
            source.out_refs.push(reference.clone());

            let target = tables
                .entry(reference.target_table.clone())
                .or_insert_with(|| TableNode::named(&reference.target_table));
            target
                .stored_column_sets
                .insert(reference.target_columns.clone());
            target.in_refs.push(reference);
        }

        let node = tables
            .entry(start.clone())
            .or_insert_with(|| TableNode::named(&start));
        node.explicit_predicate = explicit_predicate;

        tracing::debug!(tables = tables.len(), start = %start, "built dependency graph");

        DependencyGraph { tables, start }
    }

    pub fn table(&self, name: &str) -> Option<&TableNode> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableNode> {
        self.tables.get_mut(name)
    }
}
