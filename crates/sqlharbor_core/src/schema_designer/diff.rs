//! Baseline diff: what changed between the schema at session start (or last
//! publish) and the schema being edited.

use serde::Serialize;

use super::model::{Column, ForeignKey, Schema, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeAction {
    Add,
    Modify,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeCategory {
    Table,
    Column,
    ForeignKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    pub property: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaChange {
    pub action: ChangeAction,
    pub category: ChangeCategory,
    pub table_id: String,
    pub table_name: String,
    pub table_schema: String,
    pub object_id: String,
    pub object_name: String,
    pub property_changes: Vec<PropertyChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TableChangeState {
    Created,
    Modified,
    Deleted,
}

/// All changes of one table, for the change summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeGroup {
    pub table_id: String,
    pub table_name: String,
    pub table_schema: String,
    pub state: TableChangeState,
    pub changes: Vec<SchemaChange>,
}

/// Changes from `baseline` to `current`, in baseline table order followed by
/// new tables in current order.
pub fn compute_schema_changes(baseline: &Schema, current: &Schema) -> Vec<SchemaChange> {
    let mut changes = Vec::new();

    for old_table in &baseline.tables {
        match current.table(&old_table.id) {
            None => changes.push(table_change(ChangeAction::Delete, old_table, Vec::new())),
            Some(new_table) => diff_table(old_table, new_table, &mut changes),
        }
    }

    for new_table in &current.tables {
        if baseline.table(&new_table.id).is_none() {
            changes.push(table_change(ChangeAction::Add, new_table, Vec::new()));
        }
    }

    changes
}

fn diff_table(old: &Table, new: &Table, changes: &mut Vec<SchemaChange>) {
    let mut properties = Vec::new();
    push_if_changed(&mut properties, "name", Some(&old.name), Some(&new.name));
    push_if_changed(&mut properties, "schema", Some(&old.schema), Some(&new.schema));

    if !properties.is_empty() {
        changes.push(table_change(ChangeAction::Modify, new, properties));
    }

    for column in &new.columns {
        match old.column(&column.id) {
            None => changes.push(column_change(ChangeAction::Add, new, column, Vec::new())),
            Some(previous) => {
                let properties = column_properties(previous, column);
                if !properties.is_empty() {
                    changes.push(column_change(ChangeAction::Modify, new, column, properties));
                }
            }
        }
    }

    for column in &old.columns {
        if new.column(&column.id).is_none() {
            changes.push(column_change(ChangeAction::Delete, new, column, Vec::new()));
        }
    }

    for fk in &new.foreign_keys {
        match old.foreign_key(&fk.id) {
            None => changes.push(foreign_key_change(ChangeAction::Add, new, fk, Vec::new())),
            Some(previous) => {
                let properties = foreign_key_properties(previous, fk);
                if !properties.is_empty() {
                    changes.push(foreign_key_change(ChangeAction::Modify, new, fk, properties));
                }
            }
        }
    }

    for fk in &old.foreign_keys {
        if new.foreign_key(&fk.id).is_none() {
            changes.push(foreign_key_change(ChangeAction::Delete, new, fk, Vec::new()));
        }
    }
}

fn push_if_changed<T: ToString + PartialEq>(
    properties: &mut Vec<PropertyChange>,
    property: &str,
    old: Option<T>,
    new: Option<T>,
) {
    if old != new {
        properties.push(PropertyChange {
            property: property.to_string(),
            old_value: old.map(|v| v.to_string()),
            new_value: new.map(|v| v.to_string()),
        });
    }
}

fn column_properties(old: &Column, new: &Column) -> Vec<PropertyChange> {
    let mut p = Vec::new();
    push_if_changed(&mut p, "name", Some(&old.name), Some(&new.name));
    push_if_changed(&mut p, "dataType", Some(&old.data_type), Some(&new.data_type));
    push_if_changed(&mut p, "maxLength", old.max_length.as_ref(), new.max_length.as_ref());
    push_if_changed(&mut p, "precision", old.precision, new.precision);
    push_if_changed(&mut p, "scale", old.scale, new.scale);
    push_if_changed(&mut p, "isNullable", Some(old.is_nullable), Some(new.is_nullable));
    push_if_changed(&mut p, "isPrimaryKey", Some(old.is_primary_key), Some(new.is_primary_key));
    push_if_changed(&mut p, "isIdentity", Some(old.is_identity), Some(new.is_identity));
    push_if_changed(&mut p, "defaultValue", old.default_value.as_ref(), new.default_value.as_ref());
    push_if_changed(&mut p, "isComputed", Some(old.is_computed), Some(new.is_computed));
    push_if_changed(
        &mut p,
        "computedFormula",
        old.computed_formula.as_ref(),
        new.computed_formula.as_ref(),
    );
    p
}

fn foreign_key_properties(old: &ForeignKey, new: &ForeignKey) -> Vec<PropertyChange> {
    let mut p = Vec::new();
    push_if_changed(&mut p, "name", Some(&old.name), Some(&new.name));
    push_if_changed(
        &mut p,
        "columns",
        Some(old.column_ids.join(", ")),
        Some(new.column_ids.join(", ")),
    );
    push_if_changed(
        &mut p,
        "referencedTable",
        Some(&old.referenced_table_id),
        Some(&new.referenced_table_id),
    );
    push_if_changed(
        &mut p,
        "referencedColumns",
        Some(old.referenced_column_ids.join(", ")),
        Some(new.referenced_column_ids.join(", ")),
    );
    push_if_changed(
        &mut p,
        "onDeleteAction",
        Some(old.on_delete_action.as_str()),
        Some(new.on_delete_action.as_str()),
    );
    push_if_changed(
        &mut p,
        "onUpdateAction",
        Some(old.on_update_action.as_str()),
        Some(new.on_update_action.as_str()),
    );
    p
}

fn table_change(action: ChangeAction, table: &Table, properties: Vec<PropertyChange>) -> SchemaChange {
    SchemaChange {
        action,
        category: ChangeCategory::Table,
        table_id: table.id.clone(),
        table_name: table.name.clone(),
        table_schema: table.schema.clone(),
        object_id: table.id.clone(),
        object_name: table.qualified_name(),
        property_changes: properties,
    }
}

fn column_change(
    action: ChangeAction,
    table: &Table,
    column: &Column,
    properties: Vec<PropertyChange>,
) -> SchemaChange {
    SchemaChange {
        action,
        category: ChangeCategory::Column,
        table_id: table.id.clone(),
        table_name: table.name.clone(),
        table_schema: table.schema.clone(),
        object_id: column.id.clone(),
        object_name: column.name.clone(),
        property_changes: properties,
    }
}

fn foreign_key_change(
    action: ChangeAction,
    table: &Table,
    fk: &ForeignKey,
    properties: Vec<PropertyChange>,
) -> SchemaChange {
    SchemaChange {
        action,
        category: ChangeCategory::ForeignKey,
        table_id: table.id.clone(),
        table_name: table.name.clone(),
        table_schema: table.schema.clone(),
        object_id: fk.id.clone(),
        object_name: fk.name.clone(),
        property_changes: properties,
    }
}

/// Groups changes per table, in order of first appearance.
pub fn group_changes_by_table(changes: &[SchemaChange]) -> Vec<ChangeGroup> {
    let mut groups: Vec<ChangeGroup> = Vec::new();

    for change in changes {
        let position = groups.iter().position(|g| g.table_id == change.table_id);
        let group = match position {
            Some(index) => &mut groups[index],
            None => {
                groups.push(ChangeGroup {
                    table_id: change.table_id.clone(),
                    table_name: change.table_name.clone(),
                    table_schema: change.table_schema.clone(),
                    state: TableChangeState::Modified,
                    changes: Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };

        if change.category == ChangeCategory::Table {
            match change.action {
                ChangeAction::Add => group.state = TableChangeState::Created,
                ChangeAction::Delete => group.state = TableChangeState::Deleted,
                ChangeAction::Modify => {}
            }
        }

        group.changes.push(change.clone());
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(id: &str, name: &str) -> Column {
        Column {
            id: id.into(),
            name: name.into(),
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

    fn table(id: &str, columns: Vec<Column>) -> Table {
        Table {
            id: id.into(),
            name: id.into(),
            schema: "dbo".into(),
            columns,
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn identical_schemas_have_no_changes() {
        let schema = Schema {
            tables: vec![table("t1", vec![column("c1", "id")])],
        };
        assert!(compute_schema_changes(&schema, &schema).is_empty());
    }

    #[test]
    fn classifies_column_changes() {
        let baseline = Schema {
            tables: vec![table("t1", vec![column("c1", "id"), column("c2", "name")])],
        };
        let mut current = baseline.clone();
        current.tables[0].columns[0].is_nullable = true;
        current.tables[0].columns.remove(1);
        current.tables[0].columns.push(column("c3", "email"));

        let changes = compute_schema_changes(&baseline, &current);
        let summary: Vec<_> = changes
            .iter()
            .map(|c| (c.action, c.object_id.as_str()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (ChangeAction::Modify, "c1"),
                (ChangeAction::Add, "c3"),
                (ChangeAction::Delete, "c2"),
            ]
        );
        assert_eq!(
            changes[0].property_changes,
            vec![PropertyChange {
                property: "isNullable".into(),
                old_value: Some("false".into()),
                new_value: Some("true".into()),
            }]
        );
    }

    #[test]
    fn groups_follow_baseline_then_new_tables() {
        let baseline = Schema {
            tables: vec![table("t1", Vec::new()), table("t2", Vec::new())],
        };
        let mut current = baseline.clone();
        current.tables.remove(0);
        current.tables[0].name = "renamed".into();
        current.tables.push(table("t3", Vec::new()));

        let groups = group_changes_by_table(&compute_schema_changes(&baseline, &current));
        let states: Vec<_> = groups
            .iter()
            .map(|g| (g.table_id.as_str(), g.state))
            .collect();

        assert_eq!(
            states,
            vec![
                ("t1", TableChangeState::Deleted),
                ("t2", TableChangeState::Modified),
                ("t3", TableChangeState::Created),
            ]
        );
    }
}
