use sqlharbor_core::schema_designer::{Column, ForeignKey, ForeignKeyAction, Schema, Table};
use sqlharbor_core::{AppConfig, AuthenticationType, ConnectionProfile, NodeInfo};

pub fn sql_profile(server: &str, database: Option<&str>) -> ConnectionProfile {
    ConnectionProfile::sql_login(server, "sa", database.map(str::to_string))
}

pub fn azure_profile(server: &str, account_id: &str) -> ConnectionProfile {
    let mut profile = ConnectionProfile::new(server, AuthenticationType::AzureMfa);
    profile.account_id = Some(account_id.to_string());
    profile
}

pub fn integrated_profile(server: &str) -> ConnectionProfile {
    ConnectionProfile::new(server, AuthenticationType::Integrated)
}

/// Config with short timeouts so tests that never get a reply finish fast.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.object_explorer.session_timeout_ms = 200;
    config.object_explorer.expand_timeout_ms = 200;
    config
}

pub fn server_root(server: &str) -> NodeInfo {
    NodeInfo {
        node_path: server.to_string(),
        node_type: "Server".to_string(),
        label: server.to_string(),
        node_status: Some("Online".to_string()),
        ..NodeInfo::default()
    }
}

pub fn node_info(node_path: &str, node_type: &str, label: &str) -> NodeInfo {
    NodeInfo {
        node_path: node_path.to_string(),
        node_type: node_type.to_string(),
        label: label.to_string(),
        ..NodeInfo::default()
    }
}

pub fn leaf_info(node_path: &str, node_type: &str, label: &str) -> NodeInfo {
    NodeInfo {
        is_leaf: true,
        ..node_info(node_path, node_type, label)
    }
}

pub fn folder_children(parent_path: &str, labels: &[&str]) -> Vec<NodeInfo> {
    labels
        .iter()
        .map(|label| node_info(&format!("{parent_path}/{label}"), "Folder", label))
        .collect()
}

pub fn column(id: &str, name: &str, data_type: &str) -> Column {
    Column {
        id: id.to_string(),
        name: name.to_string(),
        data_type: data_type.to_string(),
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

pub fn primary_key(id: &str, name: &str) -> Column {
    Column {
        is_nullable: false,
        is_primary_key: true,
        is_identity: true,
        ..column(id, name, "int")
    }
}

pub fn table(id: &str, name: &str, columns: Vec<Column>) -> Table {
    Table {
        id: id.to_string(),
        name: name.to_string(),
        schema: "dbo".to_string(),
        columns,
        foreign_keys: Vec::new(),
    }
}

pub fn foreign_key(
    id: &str,
    column_id: &str,
    referenced_table_id: &str,
    referenced_column_id: &str,
) -> ForeignKey {
    ForeignKey {
        id: id.to_string(),
        name: format!("FK_{id}"),
        column_ids: vec![column_id.to_string()],
        referenced_table_id: referenced_table_id.to_string(),
        referenced_column_ids: vec![referenced_column_id.to_string()],
        on_delete_action: ForeignKeyAction::NoAction,
        on_update_action: ForeignKeyAction::NoAction,
    }
}

pub fn schema(tables: Vec<Table>) -> Schema {
    Schema { tables }
}

/// `orgs(id)` and `users(id, name, org_id -> orgs.id)`.
pub fn users_and_orgs() -> Schema {
    let orgs = table("t_orgs", "orgs", vec![primary_key("c_org_id", "id")]);
    let mut users = table(
        "t_users",
        "users",
        vec![
            primary_key("c_user_id", "id"),
            column("c_user_name", "name", "nvarchar"),
            column("c_user_org", "org_id", "int"),
        ],
    );
    users
        .foreign_keys
        .push(foreign_key("fk_users_orgs", "c_user_org", "t_orgs", "c_org_id"));

    schema(vec![orgs, users])
}

pub fn schema_json(schema: &Schema) -> String {
    serde_json::to_string_pretty(schema).unwrap_or_default()
}
