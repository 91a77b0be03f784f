//! Diagram state for the designer canvas, including entities deleted since
//! the baseline so the change view can still draw them.

use serde::Serialize;
use std::collections::HashSet;

use super::model::{Column, ForeignKey, Schema, Table};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayColumn {
    pub column: Column,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    pub table: Table,
    pub columns: Vec<DisplayColumn>,
    pub is_deleted: bool,
}

/// One edge per foreign key column pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub foreign_key_id: String,
    pub source: String,
    pub target: String,
    pub source_column_id: String,
    pub target_column_id: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

pub fn build_flow_state(schema: &Schema) -> FlowState {
    let nodes = schema
        .tables
        .iter()
        .map(|table| FlowNode {
            id: table.id.clone(),
            table: table.clone(),
            columns: table
                .columns
                .iter()
                .cloned()
                .map(|column| DisplayColumn {
                    column,
                    is_deleted: false,
                })
                .collect(),
            is_deleted: false,
        })
        .collect();

    let edges = schema
        .tables
        .iter()
        .flat_map(|table| {
            table
                .foreign_keys
                .iter()
                .flat_map(move |fk| foreign_key_edges(table, fk, false))
        })
        .collect();

    FlowState { nodes, edges }
}

fn foreign_key_edges(table: &Table, fk: &ForeignKey, is_deleted: bool) -> Vec<FlowEdge> {
    fk.column_pairs()
        .enumerate()
        .map(|(index, (source_column, target_column))| FlowEdge {
            id: format!("{}-{}", fk.id, index),
            foreign_key_id: fk.id.clone(),
            source: table.id.clone(),
            target: fk.referenced_table_id.clone(),
            source_column_id: source_column.to_string(),
            target_column_id: target_column.to_string(),
            is_deleted,
        })
        .collect()
}

/// Edges for foreign keys removed since `baseline` whose source and target
/// tables both still exist in `current`.
pub fn build_deleted_foreign_key_edges(baseline: &Schema, current: &Schema) -> Vec<FlowEdge> {
    let live_tables: HashSet<&str> = current.tables.iter().map(|t| t.id.as_str()).collect();
    deleted_edges_between(baseline, current, &live_tables)
}

/// Edges for foreign keys removed since `baseline` whose endpoints are both
/// in `drawn`.
fn deleted_edges_between(
    baseline: &Schema,
    current: &Schema,
    drawn: &HashSet<&str>,
) -> Vec<FlowEdge> {
    let live_keys: HashSet<&str> = current
        .tables
        .iter()
        .flat_map(|t| t.foreign_keys.iter().map(|fk| fk.id.as_str()))
        .collect();

    let live_keys = &live_keys;

    baseline
        .tables
        .iter()
        .filter(|table| drawn.contains(table.id.as_str()))
        .flat_map(move |table| {
            table
                .foreign_keys
                .iter()
                .filter(move |fk| !live_keys.contains(fk.id.as_str()))
                .filter(move |fk| drawn.contains(fk.referenced_table_id.as_str()))
                .flat_map(move |fk| foreign_key_edges(table, fk, true))
        })
        .collect()
}

/// Current columns with the baseline columns that were deleted put back at
/// their baseline positions.
pub fn merge_columns_with_deleted(
    baseline_table: &Table,
    current_columns: &[Column],
) -> Vec<DisplayColumn> {
    let mut merged: Vec<DisplayColumn> = current_columns
        .iter()
        .cloned()
        .map(|column| DisplayColumn {
            column,
            is_deleted: false,
        })
        .collect();

    let mut insert_at = 0;
    for column in &baseline_table.columns {
        match merged.iter().position(|c| c.column.id == column.id) {
            Some(index) => insert_at = index + 1,
            None => {
                merged.insert(
                    insert_at,
                    DisplayColumn {
                        column: column.clone(),
                        is_deleted: true,
                    },
                );
                insert_at += 1;
            }
        }
    }

    merged
}

/// Flow state of `current` plus deleted tables, columns and foreign keys.
pub fn build_flow_state_with_deletions(baseline: &Schema, current: &Schema) -> FlowState {
    let mut state = build_flow_state(current);

    for node in &mut state.nodes {
        if let Some(baseline_table) = baseline.table(&node.id) {
            node.columns = merge_columns_with_deleted(baseline_table, &node.table.columns);
        }
    }

    for (index, table) in baseline.tables.iter().enumerate() {
        if current.table(&table.id).is_some() {
            continue;
        }

        let node = FlowNode {
            id: table.id.clone(),
            table: table.clone(),
            columns: table
                .columns
                .iter()
                .cloned()
                .map(|column| DisplayColumn {
                    column,
                    is_deleted: true,
                })
                .collect(),
            is_deleted: true,
        };
        let position = index.min(state.nodes.len());
        state.nodes.insert(position, node);
    }

    let drawn: HashSet<&str> = state.nodes.iter().map(|n| n.id.as_str()).collect();
    let deleted_edges = deleted_edges_between(baseline, current, &drawn);

    state.edges.extend(deleted_edges);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_designer::ForeignKeyAction;

    fn column(id: &str) -> Column {
        Column {
            id: id.into(),
            name: id.into(),
            data_type: "int".into(),
            max_length: None,
            precision: None,
            scale: None,
            is_nullable: false,
            is_primary_key: false,
            is_identity: false,
            default_value: None,
            is_computed: false,
            computed_formula: None,
        }
    }

    fn fk(id: &str, from: &str, to_table: &str, to: &str) -> ForeignKey {
        ForeignKey {
            id: id.into(),
            name: id.into(),
            column_ids: vec![from.into()],
            referenced_table_id: to_table.into(),
            referenced_column_ids: vec![to.into()],
            on_delete_action: ForeignKeyAction::NoAction,
            on_update_action: ForeignKeyAction::NoAction,
        }
    }

    fn table(id: &str, columns: &[&str], foreign_keys: Vec<ForeignKey>) -> Table {
        Table {
            id: id.into(),
            name: id.into(),
            schema: "dbo".into(),
            columns: columns.iter().map(|c| column(c)).collect(),
            foreign_keys,
        }
    }

    fn baseline() -> Schema {
        Schema {
            tables: vec![
                table("orgs", &["o1"], Vec::new()),
                table("users", &["u1", "u2", "u3"], vec![fk("fk1", "u2", "orgs", "o1")]),
            ],
        }
    }

    #[test]
    fn flow_state_has_edge_per_column_pair() {
        let state = build_flow_state(&baseline());
        assert_eq!(state.nodes.len(), 2);
        assert_eq!(state.edges.len(), 1);
        assert_eq!(state.edges[0].source, "users");
        assert_eq!(state.edges[0].target, "orgs");
        assert!(!state.edges[0].is_deleted);
    }

    #[test]
    fn deleted_foreign_key_gets_deleted_edge() {
        let mut current = baseline();
        current.tables[1].foreign_keys.clear();

        let edges = build_deleted_foreign_key_edges(&baseline(), &current);
        assert_eq!(edges.len(), 1);
        assert!(edges[0].is_deleted);
        assert_eq!(edges[0].foreign_key_id, "fk1");
    }

    #[test]
    fn deleted_foreign_key_to_missing_table_is_skipped() {
        let mut current = baseline();
        current.tables.remove(0);
        current.tables[0].foreign_keys.clear();

        assert!(build_deleted_foreign_key_edges(&baseline(), &current).is_empty());
    }

    #[test]
    fn deleted_columns_return_at_baseline_positions() {
        let base = table("users", &["u1", "u2", "u3"], Vec::new());
        let current = vec![column("u1"), column("u4")];

        let merged = merge_columns_with_deleted(&base, &current);
        let layout: Vec<_> = merged
            .iter()
            .map(|c| (c.column.id.as_str(), c.is_deleted))
            .collect();

        assert_eq!(
            layout,
            vec![("u1", false), ("u2", true), ("u3", true), ("u4", false)]
        );
    }

    #[test]
    fn flow_state_with_deletions_draws_removed_tables() {
        let mut current = baseline();
        current.tables.remove(1);

        let state = build_flow_state_with_deletions(&baseline(), &current);

        assert_eq!(state.nodes.len(), 2);
        assert!(state.nodes[1].is_deleted);
        assert!(state.nodes[1].columns.iter().all(|c| c.is_deleted));
        assert_eq!(state.edges.len(), 1);
        assert!(state.edges[0].is_deleted);
    }

    #[test]
    fn dropped_key_from_live_table_to_dropped_table_is_drawn() {
        let mut current = baseline();
        current.tables.remove(0);
        current.tables[0].foreign_keys.clear();

        let state = build_flow_state_with_deletions(&baseline(), &current);

        assert!(state.nodes.iter().any(|n| n.id == "orgs" && n.is_deleted));
        assert_eq!(state.edges.len(), 1);
        assert!(state.edges[0].is_deleted);
        assert_eq!(state.edges[0].source, "users");
        assert_eq!(state.edges[0].target, "orgs");
    }
}
