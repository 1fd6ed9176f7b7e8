//! Topological processing order over the dependency graph.
//!
//! A table's value index must be complete before any table that builds
//! a filter from it is processed. Post-order DFS over "references into
//! me" edges, reversed, places each table strictly before every table
//! that (transitively) references it, with the starting table first.

use std::collections::HashSet;

use super::DependencyGraph;

impl DependencyGraph {
    /// Processing order for the dump engine.
    ///
    /// The traversal descends into referencing tables before appending
    /// the current table, then the build list is reversed. Only tables
    /// connected to the start through inbound chains are visited:
    /// tables the seed merely points at are outside the closure. The
    /// visited-set guard terminates constraint cycles, and the
    /// explicit stack keeps very deep chains off the call stack.
    pub fn processing_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();

        // Each frame is (table, index of next in_ref to descend into).
        let mut stack: Vec<(String, usize)> = vec![(self.start.clone(), 0)];
        visited.insert(self.start.clone());

        while let Some((name, next)) = stack.pop() {
            let in_refs = self
                .tables
                .get(&name)
                .map(|node| node.in_refs.as_slice())
                .unwrap_or(&[]);

            if let Some(reference) = in_refs.get(next) {
                stack.push((name.clone(), next + 1));
                let child = &reference.source_table;
                if visited.insert(child.clone()) {
                    stack.push((child.clone(), 0));
                }
            } else {
                order.push(name);
            }
        }

        order.reverse();
        order
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{DependencyGraph, ForeignKeyRow};

    fn fk(source: &str, target: &str, constraint: &str) -> ForeignKeyRow {
        ForeignKeyRow {
            source_table: source.to_string(),
            source_column: format!("{}_id", target),
            constraint_name: constraint.to_string(),
            target_table: target.to_string(),
            target_column: "id".to_string(),
        }
    }

    fn position(order: &[String], table: &str) -> usize {
        order.iter().position(|t| t == table).unwrap()
    }

    #[test]
    fn test_start_table_is_first() {
        let rows = vec![fk("order_items", "orders", "fk_oi")];
        let graph = DependencyGraph::build("orders", None, &rows);
        let order = graph.processing_order();
        assert_eq!(order[0], "orders");
        assert_eq!(order, vec!["orders", "order_items"]);
    }

    #[test]
    fn test_referencers_come_after_their_targets() {
        // shipments -> order_items -> orders, plus invoices -> orders
        let rows = vec![
            fk("order_items", "orders", "fk_oi"),
            fk("shipments", "order_items", "fk_sh"),
            fk("invoices", "orders", "fk_inv"),
        ];
        let graph = DependencyGraph::build("orders", None, &rows);
        let order = graph.processing_order();

        assert_eq!(order[0], "orders");
        assert!(position(&order, "order_items") > position(&order, "orders"));
        assert!(position(&order, "shipments") > position(&order, "order_items"));
        assert!(position(&order, "invoices") > position(&order, "orders"));
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_tables_only_pointed_at_by_seed_are_not_visited() {
        // orders references customers; nothing references customers
        // through an inbound chain from orders, so it stays outside
        // the closure.
        let rows = vec![
            fk("orders", "customers", "fk_cust"),
            fk("order_items", "orders", "fk_oi"),
        ];
        let graph = DependencyGraph::build("orders", None, &rows);
        let order = graph.processing_order();
        assert!(!order.contains(&"customers".to_string()));
        assert_eq!(order, vec!["orders", "order_items"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let rows = vec![
            fk("a", "orders", "fk_a"),
            fk("b", "a", "fk_b"),
            fk("a", "b", "fk_a_b"),
        ];
        let graph = DependencyGraph::build("orders", None, &rows);
        let order = graph.processing_order();
        assert_eq!(order[0], "orders");
        assert!(order.contains(&"a".to_string()));
        assert!(order.contains(&"b".to_string()));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        // 10k-deep chain of referencers; must complete without
        // exhausting the call stack.
        let mut rows = Vec::new();
        for i in 0..10_000 {
            let target = if i == 0 {
                "t0".to_string()
            } else {
                format!("t{}", i)
            };
            rows.push(fk(&format!("t{}", i + 1), &target, &format!("fk{}", i)));
        }
        let graph = DependencyGraph::build("t0", None, &rows);
        let order = graph.processing_order();
        assert_eq!(order.len(), 10_001);
        assert_eq!(order[0], "t0");
        assert_eq!(order[10_000], "t10000");
    }
}
