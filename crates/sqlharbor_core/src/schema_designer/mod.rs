mod change;
mod diff;
mod ledger;
mod model;
mod visuals;

pub use change::{ChangeOperation, CopilotChange, EntityKind, EntitySnapshot};
pub use diff::{
    ChangeAction, ChangeCategory, ChangeGroup, PropertyChange, SchemaChange, TableChangeState,
    compute_schema_changes, group_changes_by_table,
};
pub use ledger::{
    compute_edited_entity_ids, fold_changes, process_copilot_changes,
    reconcile_tracked_changes_with_schema, remove_tracked_changes_for_edited_entities,
    resolve_table_ids,
};
pub use model::{Column, ForeignKey, ForeignKeyAction, Schema, Table};
pub use visuals::{
    DisplayColumn, FlowEdge, FlowNode, FlowState, build_deleted_foreign_key_edges,
    build_flow_state, build_flow_state_with_deletions, merge_columns_with_deleted,
};
