//! Change ledger: folds copilot edits per entity, resolves their tables and
//! prunes entries the live schema no longer supports.
//!
//! Every function here is pure. The ledger is rebuilt from the authoritative
//! schema on each batch, so inconsistent entries are dropped silently.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use super::change::{ChangeOperation, CopilotChange, EntityKind, EntitySnapshot};
use super::model::{Schema, Table};

/// Folds `incoming` onto `tracked`, fills in table ids and reconciles the
/// result against `schema`.
pub fn process_copilot_changes(
    incoming: &[CopilotChange],
    tracked: &[CopilotChange],
    schema: &Schema,
) -> Vec<CopilotChange> {
    let folded = fold_changes(tracked.iter().chain(incoming).cloned());
    let resolved = resolve_table_ids(folded, schema);
    reconcile_tracked_changes_with_schema(&resolved, schema)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Entity(EntityKind, String),
    /// Changes without any entity id never merge.
    Unresolved(usize),
}

/// Merges chronologically ordered changes to the same entity.
///
/// Output keeps the order in which each entity first appeared.
pub fn fold_changes(changes: impl IntoIterator<Item = CopilotChange>) -> Vec<CopilotChange> {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut folded: HashMap<GroupKey, Option<CopilotChange>> = HashMap::new();

    for (index, change) in changes.into_iter().enumerate() {
        let key = match change.entity_id() {
            Some(id) => GroupKey::Entity(change.entity, id.to_string()),
            None => GroupKey::Unresolved(index),
        };

        match folded.get_mut(&key) {
            Some(slot) => {
                *slot = match slot.take() {
                    Some(earlier) => fold_pair(earlier, change),
                    None => Some(change),
                };
            }
            None => {
                order.push(key.clone());
                folded.insert(key, Some(change));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| folded.remove(&key).flatten())
        .collect()
}

fn fold_pair(earlier: CopilotChange, later: CopilotChange) -> Option<CopilotChange> {
    use ChangeOperation::{Add, Drop, Set};

    let (operation, before, after) = match (earlier.operation, later.operation) {
        (Add, Drop) => return None,
        (Add, Add | Set) => (Add, None, later.after),
        (Set, Add | Set) => (Set, earlier.before.or(later.before), later.after),
        (Set, Drop) => (Drop, earlier.before.or(later.before), None),
        (Drop, Add | Set) => (Set, earlier.before, later.after),
        (Drop, Drop) => (Drop, earlier.before.or(later.before), None),
    };

    Some(CopilotChange {
        operation,
        entity: later.entity,
        table_id: later.table_id.or(earlier.table_id),
        group_id: later.group_id.or(earlier.group_id),
        before,
        after,
        description: later.description,
    })
}

/// Fills missing `table_id`s from the table that owns the entity.
pub fn resolve_table_ids(changes: Vec<CopilotChange>, schema: &Schema) -> Vec<CopilotChange> {
    changes
        .into_iter()
        .map(|mut change| {
            if change.table_id.is_none() {
                change.table_id = resolve_table_id(&change, schema);
            }
            change
        })
        .collect()
}

fn resolve_table_id(change: &CopilotChange, schema: &Schema) -> Option<String> {
    let ids = [change.after.as_ref(), change.before.as_ref()]
        .into_iter()
        .flatten()
        .map(EntitySnapshot::id);

    for id in ids {
        let table = match change.entity {
            EntityKind::Table => return Some(id.to_string()),
            EntityKind::Column => schema.table_of_column(id),
            EntityKind::ForeignKey => schema.table_of_foreign_key(id),
        };

        if let Some(table) = table {
            return Some(table.id.clone());
        }
    }

    None
}

/// Drops changes the schema has since undone. Kept additions and edits get
/// their `after` refreshed from the schema. Idempotent.
pub fn reconcile_tracked_changes_with_schema(
    changes: &[CopilotChange],
    schema: &Schema,
) -> Vec<CopilotChange> {
    changes
        .iter()
        .filter_map(|change| reconcile_change(change, schema))
        .collect()
}

fn reconcile_change(change: &CopilotChange, schema: &Schema) -> Option<CopilotChange> {
    let lookup = |snapshot: Option<&EntitySnapshot>| {
        snapshot.and_then(|s| EntitySnapshot::lookup(schema, change.entity, s.id()))
    };

    match change.operation {
        ChangeOperation::Add => {
            let current = lookup(change.after.as_ref())?;
            Some(CopilotChange {
                after: Some(current),
                ..change.clone()
            })
        }
        ChangeOperation::Drop => {
            let before = change.before.as_ref()?;
            lookup(Some(before)).is_none().then(|| change.clone())
        }
        ChangeOperation::Set => {
            let current =
                lookup(change.after.as_ref()).or_else(|| lookup(change.before.as_ref()))?;

            if change
                .before
                .as_ref()
                .is_some_and(|before| before.same_shape(&current))
            {
                return None;
            }

            Some(CopilotChange {
                after: Some(current),
                ..change.clone()
            })
        }
    }
}

/// Removes changes touching any of `edited_ids`, either through their table
/// or their own entity id. Borrows the input when nothing is removed.
pub fn remove_tracked_changes_for_edited_entities<'a>(
    changes: &'a [CopilotChange],
    edited_ids: &HashSet<String>,
) -> Cow<'a, [CopilotChange]> {
    if edited_ids.is_empty() {
        return Cow::Borrowed(changes);
    }

    let touches = |change: &CopilotChange| {
        change
            .table_id
            .as_deref()
            .is_some_and(|id| edited_ids.contains(id))
            || [change.after.as_ref(), change.before.as_ref()]
                .into_iter()
                .flatten()
                .any(|snapshot| edited_ids.contains(snapshot.id()))
    };

    if !changes.iter().any(touches) {
        return Cow::Borrowed(changes);
    }

    Cow::Owned(changes.iter().filter(|c| !touches(c)).cloned().collect())
}

/// Ids of entities a manual edit changed between two versions of a table.
///
/// Added columns and keys are not reported.
pub fn compute_edited_entity_ids(original: &Table, updated: &Table) -> HashSet<String> {
    let mut edited = HashSet::new();

    if !original.same_shape(updated) {
        edited.insert(original.id.clone());
    }

    for column in &original.columns {
        match updated.column(&column.id) {
            Some(current) if current.same_shape(column) => {}
            _ => {
                edited.insert(column.id.clone());
            }
        }
    }

    for fk in &original.foreign_keys {
        match updated.foreign_key(&fk.id) {
            Some(current) if current.same_shape(fk) => {}
            _ => {
                edited.insert(fk.id.clone());
            }
        }
    }

    edited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_designer::model::Column;
    use pretty_assertions::assert_eq;

    fn column(id: &str, name: &str, data_type: &str) -> Column {
        Column {
            id: id.into(),
            name: name.into(),
            data_type: data_type.into(),
            max_length: None,
            precision: None,
            scale: None,
            is_nullable: true,
            is_primary_key: false,
            is_identity: false,
            default_value: None,
            is_computed: false,
            computed_formula: None,
        }
    }

    fn col(id: &str, data_type: &str) -> EntitySnapshot {
        EntitySnapshot::Column(column(id, id, data_type))
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

    fn schema_with(columns: Vec<Column>) -> Schema {
        Schema {
            tables: vec![table("t1", columns)],
        }
    }

    #[test]
    fn add_then_drop_annihilates() {
        let folded = fold_changes(vec![
            CopilotChange::add(col("c1", "int")),
            CopilotChange::drop(col("c1", "int")),
        ]);

        assert!(folded.is_empty());
    }

    #[test]
    fn add_then_set_keeps_add_with_latest_after() {
        let folded = fold_changes(vec![
            CopilotChange::add(col("c1", "int")),
            CopilotChange::set(col("c1", "int"), col("c1", "bigint")),
        ]);

        assert_eq!(folded.len(), 1);
        assert_eq!(folded[0].operation, ChangeOperation::Add);
        assert_eq!(folded[0].before, None);
        assert_eq!(folded[0].after, Some(col("c1", "bigint")));
    }

    #[test]
    fn set_then_set_spans_both_edits() {
        let folded = fold_changes(vec![
            CopilotChange::set(col("c1", "int"), col("c1", "bigint")),
            CopilotChange::set(col("c1", "bigint"), col("c1", "decimal")),
        ]);

        assert_eq!(
            folded,
            vec![CopilotChange::set(col("c1", "int"), col("c1", "decimal"))]
        );
    }

    #[test]
    fn set_then_drop_keeps_original_before() {
        let folded = fold_changes(vec![
            CopilotChange::set(col("c1", "int"), col("c1", "bigint")),
            CopilotChange::drop(col("c1", "bigint")),
        ]);

        assert_eq!(folded, vec![CopilotChange::drop(col("c1", "int"))]);
    }

    #[test]
    fn drop_then_add_becomes_set() {
        let folded = fold_changes(vec![
            CopilotChange::drop(col("c1", "int")),
            CopilotChange::add(col("c1", "nvarchar")),
        ]);

        assert_eq!(
            folded,
            vec![CopilotChange::set(col("c1", "int"), col("c1", "nvarchar"))]
        );
    }

    #[test]
    fn group_and_description_come_from_later_change() {
        let folded = fold_changes(vec![
            CopilotChange::add(col("c1", "int"))
                .with_group("g1")
                .with_description("add c1"),
            CopilotChange::set(col("c1", "int"), col("c1", "bigint")).with_description("widen c1"),
        ]);

        assert_eq!(folded[0].group_id.as_deref(), Some("g1"));
        assert_eq!(folded[0].description, "widen c1");
    }

    #[test]
    fn unresolved_changes_never_merge() {
        let folded = fold_changes(vec![
            CopilotChange::new(ChangeOperation::Add, EntityKind::Column),
            CopilotChange::new(ChangeOperation::Drop, EntityKind::Column),
        ]);

        assert_eq!(folded.len(), 2);
    }

    #[test]
    fn fold_preserves_first_appearance_order() {
        let folded = fold_changes(vec![
            CopilotChange::add(col("c2", "int")),
            CopilotChange::add(col("c1", "int")),
            CopilotChange::set(col("c2", "int"), col("c2", "bit")),
        ]);

        let ids: Vec<_> = folded.iter().filter_map(|c| c.entity_id()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
    }

    #[test]
    fn table_ids_resolve_from_schema() {
        let schema = schema_with(vec![column("c1", "c1", "int")]);
        let resolved = resolve_table_ids(
            vec![
                CopilotChange::set(col("c1", "int"), col("c1", "bigint")),
                CopilotChange::add(EntitySnapshot::Table(table("t9", Vec::new()))),
            ],
            &schema,
        );

        assert_eq!(resolved[0].table_id.as_deref(), Some("t1"));
        assert_eq!(resolved[1].table_id.as_deref(), Some("t9"));
    }

    #[test]
    fn reconcile_prunes_undone_additions() {
        let schema = schema_with(vec![column("c1", "c1", "int")]);
        let changes = vec![
            CopilotChange::add(col("c1", "int")),
            CopilotChange::add(col("gone", "int")),
        ];

        let once = reconcile_tracked_changes_with_schema(&changes, &schema);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].entity_id(), Some("c1"));

        let twice = reconcile_tracked_changes_with_schema(&once, &schema);
        assert_eq!(once, twice);
    }

    #[test]
    fn reconcile_keeps_only_real_drops() {
        let schema = schema_with(vec![column("c1", "c1", "int")]);
        let changes = vec![
            CopilotChange::drop(col("c1", "int")),
            CopilotChange::drop(col("c2", "int")),
        ];

        let reconciled = reconcile_tracked_changes_with_schema(&changes, &schema);
        assert_eq!(reconciled, vec![CopilotChange::drop(col("c2", "int"))]);
    }

    #[test]
    fn reconcile_drops_reverted_edits_and_refreshes_after() {
        let schema = schema_with(vec![column("c1", "c1", "int"), column("c2", "c2", "bit")]);
        let changes = vec![
            CopilotChange::set(col("c1", "int"), col("c1", "bigint")),
            CopilotChange::set(col("c2", "int"), col("c2", "tinyint")),
            CopilotChange::set(col("c3", "int"), col("c3", "bit")),
        ];

        let reconciled = reconcile_tracked_changes_with_schema(&changes, &schema);

        assert_eq!(
            reconciled,
            vec![CopilotChange::set(col("c2", "int"), col("c2", "bit"))]
        );
    }

    #[test]
    fn process_runs_every_stage() {
        let schema = schema_with(vec![column("c1", "c1", "bigint")]);
        let tracked = vec![CopilotChange::add(col("c1", "int")).with_group("g1")];
        let incoming = vec![
            CopilotChange::set(col("c1", "int"), col("c1", "bigint")),
            CopilotChange::add(col("c2", "int")),
            CopilotChange::drop(col("c2", "int")),
        ];

        let processed = process_copilot_changes(&incoming, &tracked, &schema);

        assert_eq!(
            processed,
            vec![
                CopilotChange::add(col("c1", "bigint"))
                    .with_group("g1")
                    .with_table("t1")
            ]
        );
    }

    #[test]
    fn empty_edited_set_returns_input_slice() {
        let changes = vec![CopilotChange::add(col("c1", "int"))];
        let result = remove_tracked_changes_for_edited_entities(&changes, &HashSet::new());

        assert!(matches!(result, Cow::Borrowed(_)));
        assert!(std::ptr::eq(result.as_ref(), changes.as_slice()));
    }

    #[test]
    fn edited_entities_remove_matching_changes() {
        let changes = vec![
            CopilotChange::add(col("c1", "int")).with_table("t1"),
            CopilotChange::add(col("c2", "int")).with_table("t2"),
            CopilotChange::add(col("c3", "int")).with_table("t2"),
        ];
        let edited: HashSet<String> = ["t1".to_string(), "c3".to_string()].into();

        let result = remove_tracked_changes_for_edited_entities(&changes, &edited);

        assert_eq!(result.as_ref(), &changes[1..2]);
    }

    #[test]
    fn unchanged_table_has_no_edits() {
        let t = table("t1", vec![column("c1", "id", "int")]);
        assert!(compute_edited_entity_ids(&t, &t).is_empty());
    }

    #[test]
    fn table_rename_flags_only_the_table() {
        let original = table("t1", vec![column("c1", "id", "int")]);
        let mut renamed = original.clone();
        renamed.name = "people".into();

        let edited = compute_edited_entity_ids(&original, &renamed);
        assert_eq!(edited, HashSet::from(["t1".to_string()]));
    }

    #[test]
    fn removed_and_modified_columns_are_flagged_added_are_not() {
        let original = table(
            "t1",
            vec![column("c1", "id", "int"), column("c2", "name", "nvarchar")],
        );
        let mut updated = original.clone();
        updated.columns.remove(1);
        updated.columns[0].data_type = "bigint".into();
        updated.columns.push(column("c3", "email", "nvarchar"));

        let edited = compute_edited_entity_ids(&original, &updated);
        assert_eq!(
            edited,
            HashSet::from(["c1".to_string(), "c2".to_string()])
        );
    }
}
