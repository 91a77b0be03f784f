use pretty_assertions::assert_eq;
use sqlharbor_core::schema_designer::{
    ChangeAction, ChangeCategory, ChangeOperation, CopilotChange, EntitySnapshot, Schema,
    TableChangeState, build_flow_state_with_deletions, compute_edited_entity_ids,
    compute_schema_changes, group_changes_by_table, process_copilot_changes,
    remove_tracked_changes_for_edited_entities,
};
use sqlharbor_test_support::fixtures::{column, schema_json, table, users_and_orgs};

fn users_with(schema: &mut Schema, f: impl FnOnce(&mut sqlharbor_core::schema_designer::Table)) {
    if let Some(users) = schema.tables.iter_mut().find(|t| t.id == "t_users") {
        f(users);
    }
}

#[test]
fn copilot_session_collapses_to_net_effect() {
    let email = column("c_email", "email", "nvarchar");
    let mut wide_email = email.clone();
    wide_email.max_length = Some("320".to_string());

    let mut schema = users_and_orgs();
    users_with(&mut schema, |users| users.columns.push(wide_email.clone()));

    let first_batch = vec![
        CopilotChange::add(EntitySnapshot::Column(email.clone())).with_group("g1"),
    ];
    let tracked = process_copilot_changes(&first_batch, &[], &schema);
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].table_id.as_deref(), Some("t_users"));

    let second_batch = vec![CopilotChange::set(
        EntitySnapshot::Column(email),
        EntitySnapshot::Column(wide_email.clone()),
    )
    .with_group("g2")
    .with_description("Widen email")];
    let tracked = process_copilot_changes(&second_batch, &tracked, &schema);

    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].operation, ChangeOperation::Add);
    assert_eq!(tracked[0].before, None);
    assert_eq!(tracked[0].after, Some(EntitySnapshot::Column(wide_email)));
    assert_eq!(tracked[0].group_id.as_deref(), Some("g2"));
    assert_eq!(tracked[0].description, "Widen email");

    let again = process_copilot_changes(&[], &tracked, &schema);
    assert_eq!(again, tracked);
}

#[test]
fn add_then_drop_leaves_nothing() {
    let temp = column("c_tmp", "tmp", "int");
    let schema = users_and_orgs();

    let tracked = process_copilot_changes(
        &[CopilotChange::add(EntitySnapshot::Column(temp.clone())).with_table("t_users")],
        &[],
        &{
            let mut with_temp = schema.clone();
            users_with(&mut with_temp, |users| users.columns.push(temp.clone()));
            with_temp
        },
    );
    assert_eq!(tracked.len(), 1);

    let tracked = process_copilot_changes(
        &[CopilotChange::drop(EntitySnapshot::Column(temp)).with_table("t_users")],
        &tracked,
        &schema,
    );
    assert!(tracked.is_empty());
}

#[test]
fn manual_revert_drops_the_tracked_edit() {
    let baseline = users_and_orgs();
    let name = baseline.column("c_user_name").cloned().expect("name column");
    let mut renamed = name.clone();
    renamed.name = "full_name".to_string();

    let mut edited = baseline.clone();
    users_with(&mut edited, |users| {
        if let Some(c) = users.columns.iter_mut().find(|c| c.id == "c_user_name") {
            c.name = "full_name".to_string();
        }
    });

    let change = CopilotChange::set(
        EntitySnapshot::Column(name),
        EntitySnapshot::Column(renamed),
    );
    let tracked = process_copilot_changes(&[change], &[], &edited);
    assert_eq!(tracked.len(), 1);

    let reverted = process_copilot_changes(&[], &tracked, &baseline);
    assert!(reverted.is_empty());
}

#[test]
fn manual_edits_evict_overlapping_copilot_changes() {
    let baseline = users_and_orgs();
    let original = baseline.table("t_users").cloned().expect("users");

    let mut updated = original.clone();
    if let Some(c) = updated.columns.iter_mut().find(|c| c.id == "c_user_name") {
        c.data_type = "varchar".to_string();
    }

    let touched = CopilotChange::set(
        EntitySnapshot::Column(original.column("c_user_name").cloned().expect("name")),
        EntitySnapshot::Column(updated.column("c_user_name").cloned().expect("name")),
    );
    let elsewhere = CopilotChange::add(EntitySnapshot::Table(table("t_audit", "audit", vec![])))
        .with_table("t_audit");
    let tracked = vec![touched, elsewhere.clone()];

    let edited = compute_edited_entity_ids(&original, &updated);
    assert!(edited.contains("c_user_name"));
    assert!(!edited.contains("t_users"));

    let remaining = remove_tracked_changes_for_edited_entities(&tracked, &edited);
    assert_eq!(remaining.into_owned(), vec![elsewhere]);

    let untouched = compute_edited_entity_ids(&original, &original);
    assert!(untouched.is_empty());
}

#[test]
fn dropped_relationship_shows_in_diff_and_diagram() {
    let baseline = users_and_orgs();
    let mut current = baseline.clone();
    users_with(&mut current, |users| {
        users.columns.retain(|c| c.id != "c_user_org");
        users.foreign_keys.clear();
    });

    let changes = compute_schema_changes(&baseline, &current);
    let summary: Vec<(ChangeAction, ChangeCategory, &str)> = changes
        .iter()
        .map(|c| (c.action, c.category, c.object_name.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ChangeAction::Delete, ChangeCategory::Column, "org_id"),
            (ChangeAction::Delete, ChangeCategory::ForeignKey, "FK_fk_users_orgs"),
        ]
    );

    let groups = group_changes_by_table(&changes);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].table_id, "t_users");
    assert_eq!(groups[0].state, TableChangeState::Modified);

    let flow = build_flow_state_with_deletions(&baseline, &current);
    let users = flow.nodes.iter().find(|n| n.id == "t_users").expect("users node");
    let deleted: Vec<&str> = users
        .columns
        .iter()
        .filter(|c| c.is_deleted)
        .map(|c| c.column.name.as_str())
        .collect();
    assert_eq!(deleted, vec!["org_id"]);

    assert_eq!(flow.edges.len(), 1);
    assert!(flow.edges[0].is_deleted);
    assert_eq!(flow.edges[0].source, "t_users");
    assert_eq!(flow.edges[0].target, "t_orgs");
}

#[test]
fn dropped_table_is_drawn_where_it_was() {
    let baseline = users_and_orgs();
    let mut current = baseline.clone();
    current.tables.retain(|t| t.id != "t_orgs");
    users_with(&mut current, |users| users.foreign_keys.clear());

    let flow = build_flow_state_with_deletions(&baseline, &current);
    let order: Vec<(&str, bool)> = flow
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.is_deleted))
        .collect();
    assert_eq!(order, vec![("t_orgs", true), ("t_users", false)]);

    let groups = group_changes_by_table(&compute_schema_changes(&baseline, &current));
    let orgs = groups.iter().find(|g| g.table_id == "t_orgs").expect("orgs group");
    assert_eq!(orgs.state, TableChangeState::Deleted);
}

#[test]
fn schema_json_uses_camel_case() {
    let json = schema_json(&users_and_orgs());

    assert!(json.contains("\"foreignKeys\""));
    assert!(json.contains("\"referencedTableId\": \"t_orgs\""));
    assert!(json.contains("\"isPrimaryKey\": true"));

    let parsed: Schema = serde_json::from_str(&json).expect("parse");
    assert_eq!(parsed, users_and_orgs());
}
