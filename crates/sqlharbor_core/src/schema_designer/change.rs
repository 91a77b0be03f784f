use serde::{Deserialize, Serialize};

use super::model::{Column, ForeignKey, Schema, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOperation {
    Add,
    Set,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Table,
    Column,
    ForeignKey,
}

/// State of one entity before or after a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntitySnapshot {
    Table(Table),
    Column(Column),
    ForeignKey(ForeignKey),
}

impl EntitySnapshot {
    pub fn id(&self) -> &str {
        match self {
            EntitySnapshot::Table(table) => &table.id,
            EntitySnapshot::Column(column) => &column.id,
            EntitySnapshot::ForeignKey(fk) => &fk.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntitySnapshot::Table(_) => EntityKind::Table,
            EntitySnapshot::Column(_) => EntityKind::Column,
            EntitySnapshot::ForeignKey(_) => EntityKind::ForeignKey,
        }
    }

    pub fn same_shape(&self, other: &EntitySnapshot) -> bool {
        match (self, other) {
            (EntitySnapshot::Table(a), EntitySnapshot::Table(b)) => a.same_shape(b),
            (EntitySnapshot::Column(a), EntitySnapshot::Column(b)) => a.same_shape(b),
            (EntitySnapshot::ForeignKey(a), EntitySnapshot::ForeignKey(b)) => a.same_shape(b),
            _ => false,
        }
    }

    /// Current state of the entity `id` of `kind` in `schema`.
    pub fn lookup(schema: &Schema, kind: EntityKind, id: &str) -> Option<EntitySnapshot> {
        match kind {
            EntityKind::Table => schema.table(id).cloned().map(EntitySnapshot::Table),
            EntityKind::Column => schema.column(id).cloned().map(EntitySnapshot::Column),
            EntityKind::ForeignKey => schema
                .foreign_key(id)
                .cloned()
                .map(EntitySnapshot::ForeignKey),
        }
    }
}

/// One schema edit proposed by the copilot and tracked until it is
/// reconciled against the live schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopilotChange {
    pub operation: ChangeOperation,
    pub entity: EntityKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,

    /// Changes proposed together share a group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<EntitySnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<EntitySnapshot>,

    #[serde(default)]
    pub description: String,
}

impl CopilotChange {
    pub fn new(operation: ChangeOperation, entity: EntityKind) -> Self {
        Self {
            operation,
            entity,
            table_id: None,
            group_id: None,
            before: None,
            after: None,
            description: String::new(),
        }
    }

    pub fn add(after: EntitySnapshot) -> Self {
        let mut change = Self::new(ChangeOperation::Add, after.kind());
        change.after = Some(after);
        change
    }

    pub fn set(before: EntitySnapshot, after: EntitySnapshot) -> Self {
        let mut change = Self::new(ChangeOperation::Set, after.kind());
        change.before = Some(before);
        change.after = Some(after);
        change
    }

    pub fn drop(before: EntitySnapshot) -> Self {
        let mut change = Self::new(ChangeOperation::Drop, before.kind());
        change.before = Some(before);
        change
    }

    pub fn with_table(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Id of the affected entity: `after` first, then `before`.
    pub fn entity_id(&self) -> Option<&str> {
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .map(EntitySnapshot::id)
    }
}
