use serde::{Deserialize, Serialize};

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub name: String,
    pub data_type: String,

    /// Length as written in the type, e.g. `50` or `MAX`.
    #[serde(default)]
    pub max_length: Option<String>,

    #[serde(default)]
    pub precision: Option<u32>,

    #[serde(default)]
    pub scale: Option<u32>,

    #[serde(default)]
    pub is_nullable: bool,

    #[serde(default)]
    pub is_primary_key: bool,

    #[serde(default)]
    pub is_identity: bool,

    #[serde(default)]
    pub default_value: Option<String>,

    #[serde(default)]
    pub is_computed: bool,

    #[serde(default)]
    pub computed_formula: Option<String>,
}

impl Column {
    /// Structural comparison used to decide whether a column was edited.
    pub fn same_shape(&self, other: &Column) -> bool {
        self.name == other.name
            && self.data_type == other.data_type
            && self.max_length == other.max_length
            && self.precision == other.precision
            && self.scale == other.scale
            && self.is_nullable == other.is_nullable
            && self.default_value == other.default_value
            && self.is_computed == other.is_computed
            && self.computed_formula == other.computed_formula
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub id: String,
    pub name: String,

    /// Source columns, in key order.
    pub column_ids: Vec<String>,

    pub referenced_table_id: String,

    /// Target columns, paired positionally with `column_ids`.
    pub referenced_column_ids: Vec<String>,

    #[serde(default)]
    pub on_delete_action: ForeignKeyAction,

    #[serde(default)]
    pub on_update_action: ForeignKeyAction,
}

impl ForeignKey {
    pub fn same_shape(&self, other: &ForeignKey) -> bool {
        self.name == other.name
            && self.column_ids == other.column_ids
            && self.referenced_table_id == other.referenced_table_id
            && self.referenced_column_ids == other.referenced_column_ids
            && self.on_delete_action == other.on_delete_action
            && self.on_update_action == other.on_update_action
    }

    /// `(source column, referenced column)` pairs.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.column_ids
            .iter()
            .zip(&self.referenced_column_ids)
            .map(|(source, target)| (source.as_str(), target.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub name: String,

    #[serde(default = "default_schema_name")]
    pub schema: String,

    #[serde(default)]
    pub columns: Vec<Column>,

    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

fn default_schema_name() -> String {
    "dbo".to_string()
}

impl Table {
    /// Name and owning schema only. Columns and keys are compared separately.
    pub fn same_shape(&self, other: &Table) -> bool {
        self.name == other.name && self.schema == other.schema
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn foreign_key(&self, id: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    /// Table owning the column with `column_id`.
    pub fn table_of_column(&self, column_id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.column(column_id).is_some())
    }

    pub fn table_of_foreign_key(&self, foreign_key_id: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.foreign_key(foreign_key_id).is_some())
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.tables.iter().find_map(|t| t.column(column_id))
    }

    pub fn foreign_key(&self, foreign_key_id: &str) -> Option<&ForeignKey> {
        self.tables.iter().find_map(|t| t.foreign_key(foreign_key_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_json_uses_camel_case() {
        let json = r#"{
            "tables": [{
                "id": "t1",
                "name": "users",
                "columns": [{"id": "c1", "name": "id", "dataType": "int", "isPrimaryKey": true}],
                "foreignKeys": [{
                    "id": "fk1",
                    "name": "FK_users_orgs",
                    "columnIds": ["c1"],
                    "referencedTableId": "t2",
                    "referencedColumnIds": ["c9"],
                    "onDeleteAction": "Cascade"
                }]
            }]
        }"#;

        let schema: Schema = serde_json::from_str(json).unwrap();
        let table = &schema.tables[0];

        assert_eq!(table.schema, "dbo");
        assert!(table.columns[0].is_primary_key);
        assert_eq!(table.foreign_keys[0].on_delete_action, ForeignKeyAction::Cascade);
        assert_eq!(table.foreign_keys[0].on_update_action, ForeignKeyAction::NoAction);
        assert_eq!(schema.table_of_column("c1").map(|t| t.id.as_str()), Some("t1"));
    }

    #[test]
    fn shape_ignores_key_flags() {
        let a = Column {
            id: "c1".into(),
            name: "id".into(),
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
        };
        let mut b = a.clone();
        b.is_primary_key = true;
        assert!(a.same_shape(&b));

        b.is_nullable = true;
        assert!(!a.same_shape(&b));
    }
}
