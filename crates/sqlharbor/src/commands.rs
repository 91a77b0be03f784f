use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use log::info;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlharbor_core::schema_designer::{
    CopilotChange, Schema, build_flow_state_with_deletions, compute_schema_changes,
    group_changes_by_table, process_copilot_changes,
};
use sqlharbor_core::{
    AppConfig, CollapsibleState, ConnectionPrompter, ConnectionStatus, NodeKind,
    ObjectExplorerProvider, TreeNode,
};

use crate::cli::{Cli, Commands};
use crate::host::{Host, HostPaths, OfflineToolsService};
use crate::prompter::TerminalPrompter;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = HostPaths {
        config: cli.config,
        profiles: cli.profiles,
    };

    match cli.command {
        Commands::List => list(&paths).await,
        Commands::Add => add(&paths).await,
        Commands::Expand { connection, depth } => expand(&paths, &connection, depth).await,
        Commands::Remove { connection } => remove(&paths, &connection).await,
        Commands::Ledger {
            schema,
            incoming,
            tracked,
        } => ledger(&schema, &incoming, tracked.as_deref()),
        Commands::Diff {
            baseline,
            current,
            flow,
        } => diff(&baseline, &current, flow),
    }
}

fn open_offline(paths: &HostPaths) -> anyhow::Result<(Host, AppConfig)> {
    let config = paths.load_config()?;
    let host = Host::open(paths, &config, Arc::new(OfflineToolsService))?;
    host.service.initialize()?;
    Ok((host, config))
}

async fn list(paths: &HostPaths) -> anyhow::Result<()> {
    let (host, _) = open_offline(paths)?;
    let roots = host.provider.get_children(None).await?;

    if !roots.iter().any(TreeNode::is_connection) {
        println!("No saved connections. Run `sqlharbor add` to create one.");
        return Ok(());
    }

    for node in &roots {
        let item = host.provider.get_tree_item(node);
        println!("{}", describe(node));
        for line in item.tooltip.lines() {
            println!("    {line}");
        }
    }

    Ok(())
}

async fn add(paths: &HostPaths) -> anyhow::Result<()> {
    let (host, _) = open_offline(paths)?;

    let Some(profile) = TerminalPrompter.prompt_for_connection().await else {
        println!("Cancelled");
        return Ok(());
    };

    let label = profile.display_label();
    host.credentials.save_profile(&profile)?;
    host.service.upsert_connection_node(profile);

    println!("Saved {label}");
    Ok(())
}

async fn remove(paths: &HostPaths, query: &str) -> anyhow::Result<()> {
    let (host, _) = open_offline(paths)?;
    let roots = host.provider.get_children(None).await?;
    let node = find_connection(&roots, query)?;

    if host.provider.remove_node(&node.id).await? {
        println!("Removed {}", node.label);
    } else {
        println!("Kept {}", node.label);
    }

    Ok(())
}

async fn expand(paths: &HostPaths, query: &str, depth: usize) -> anyhow::Result<()> {
    let config = paths.load_config()?;
    let (process, client, notifications) = sqlharbor_rpc::launch(&config.tools_service)
        .await
        .context("starting tools service")?;

    let host = Host::open(paths, &config, Arc::new(client))?;
    let notification_loop =
        tokio::spawn(host.service.clone().run_notification_loop(notifications));

    let result = print_connection(&host, query, depth).await;

    host.service.shutdown().await;
    notification_loop.abort();
    process.shutdown().await;

    result
}

async fn print_connection(host: &Host, query: &str, depth: usize) -> anyhow::Result<()> {
    host.service.initialize()?;
    let roots = host.provider.get_children(None).await?;
    let root = find_connection(&roots, query)?.clone();
    print_subtree(&host.provider, root, depth).await
}

/// Prints `root` and its descendants down to `depth` levels, depth first.
async fn print_subtree(
    provider: &ObjectExplorerProvider,
    root: TreeNode,
    depth: usize,
) -> anyhow::Result<()> {
    let mut stack = vec![(root, 0usize)];

    while let Some((node, level)) = stack.pop() {
        let children = if level < depth && node.collapsible != CollapsibleState::None {
            provider.get_children(Some(&node.id)).await?
        } else {
            Vec::new()
        };

        // Loading children may have connected the node.
        let current = provider.service().node(&node.id).unwrap_or(node);
        println!("{}{}", "  ".repeat(level), describe(&current));

        for child in children.into_iter().rev() {
            stack.push((child, level + 1));
        }
    }

    info!("Printed tree to depth {}", depth);
    Ok(())
}

fn describe(node: &TreeNode) -> String {
    match &node.kind {
        NodeKind::Connection(connection) => {
            let status = match connection.status {
                ConnectionStatus::Unrealized => "not connected",
                ConnectionStatus::SessionPending => "connecting",
                ConnectionStatus::Connected => "connected",
                ConnectionStatus::Disconnected => "disconnected",
            };
            format!("{} [{}]", node.label, status)
        }
        NodeKind::Error { message } => format!("! {message}"),
        NodeKind::Object if !node.node_type.is_empty() => {
            format!("{} ({})", node.label, node.node_type)
        }
        _ => node.label.clone(),
    }
}

/// Resolves a connection by label, display name, profile id or server.
///
/// Server names only count when no label or id matches.
pub fn find_connection<'a>(roots: &'a [TreeNode], query: &str) -> anyhow::Result<&'a TreeNode> {
    let connections = || {
        roots
            .iter()
            .filter_map(|node| node.connection_profile().map(|profile| (node, profile)))
    };

    let named: Vec<&TreeNode> = connections()
        .filter(|(node, profile)| {
            profile.id.to_string() == query
                || node.label.eq_ignore_ascii_case(query)
                || profile
                    .profile_name
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(query))
        })
        .map(|(node, _)| node)
        .collect();

    let candidates: Vec<&TreeNode> = if named.is_empty() {
        connections()
            .filter(|(_, profile)| profile.server.eq_ignore_ascii_case(query))
            .map(|(node, _)| node)
            .collect()
    } else {
        named
    };

    match candidates.as_slice() {
        [node] => Ok(*node),
        [] => bail!("No saved connection matches '{query}'"),
        many => bail!(
            "'{query}' matches {} connections: {}",
            many.len(),
            many.iter()
                .map(|n| n.label.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn ledger(schema: &Path, incoming: &Path, tracked: Option<&Path>) -> anyhow::Result<()> {
    let schema: Schema = read_json(schema)?;
    let incoming: Vec<CopilotChange> = read_json(incoming)?;
    let tracked: Vec<CopilotChange> = match tracked {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let ledger = process_copilot_changes(&incoming, &tracked, &schema);
    info!(
        "Ledger holds {} changes after {} incoming",
        ledger.len(),
        incoming.len()
    );
    print_json(&ledger)
}

fn diff(baseline: &Path, current: &Path, flow: bool) -> anyhow::Result<()> {
    let baseline: Schema = read_json(baseline)?;
    let current: Schema = read_json(current)?;

    if flow {
        return print_json(&build_flow_state_with_deletions(&baseline, &current));
    }

    let changes = compute_schema_changes(&baseline, &current);
    print_json(&group_changes_by_table(&changes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlharbor_test_support::fixtures::{sql_profile, users_and_orgs};

    fn roots() -> Vec<TreeNode> {
        let mut named = sql_profile("srv-b", Some("sales"));
        named.profile_name = Some("Reporting".into());

        vec![
            TreeNode::connection(sql_profile("srv-a", None)),
            TreeNode::connection(named),
            TreeNode::connection(sql_profile("srv-a", Some("hr"))),
        ]
    }

    #[test]
    fn finds_by_display_name_ignoring_case() {
        let roots = roots();
        let node = find_connection(&roots, "reporting").unwrap();
        assert_eq!(node.connection_profile().unwrap().server, "srv-b");
    }

    #[test]
    fn finds_by_profile_id() {
        let roots = roots();
        let id = roots[2].connection_profile().unwrap().id.to_string();
        let node = find_connection(&roots, &id).unwrap();
        assert_eq!(node.id, roots[2].id);
    }

    #[test]
    fn server_name_must_be_unambiguous() {
        let roots = roots();
        assert!(find_connection(&roots, "SRV-B").is_ok());

        let err = find_connection(&roots, "srv-a").unwrap_err();
        assert!(err.to_string().contains("matches 2 connections"));
    }

    #[test]
    fn unknown_connection_is_an_error() {
        let err = find_connection(&roots(), "nowhere").unwrap_err();
        assert!(err.to_string().contains("No saved connection"));
    }

    #[test]
    fn ledger_and_diff_read_schema_files() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("schema.json");
        let changes_path = dir.path().join("changes.json");
        fs::write(
            &schema_path,
            serde_json::to_string(&users_and_orgs()).unwrap(),
        )
        .unwrap();
        fs::write(&changes_path, "[]").unwrap();

        ledger(&schema_path, &changes_path, None).unwrap();
        diff(&schema_path, &schema_path, false).unwrap();
        diff(&schema_path, &schema_path, true).unwrap();
    }

    #[test]
    fn malformed_schema_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{").unwrap();

        let err = diff(&path, &path, false).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
