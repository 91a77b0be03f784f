use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{ExplorerError, NodeFilter, TreeRefresher};

use super::service::ObjectExplorerService;
use super::tree_node::{CollapsibleState, NodeId, NodeKind, TreeNode};

/// What a host tree view needs to render one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeItem {
    pub id: NodeId,
    pub label: String,
    pub tooltip: String,
    pub icon: String,
    pub collapsible: CollapsibleState,
    pub context_value: String,
}

/// Host-facing adapter over `ObjectExplorerService`.
#[derive(Clone)]
pub struct ObjectExplorerProvider {
    service: Arc<ObjectExplorerService>,
}

impl ObjectExplorerProvider {
    pub fn new(service: Arc<ObjectExplorerService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<ObjectExplorerService> {
        &self.service
    }

    pub async fn get_children(
        &self,
        node: Option<&NodeId>,
    ) -> Result<Vec<TreeNode>, ExplorerError> {
        self.service.get_children(node).await
    }

    pub fn get_tree_item(&self, node: &TreeNode) -> TreeItem {
        TreeItem {
            id: node.id.clone(),
            label: node.label.clone(),
            tooltip: tooltip(node),
            icon: node.icon_id(),
            collapsible: node.collapsible,
            context_value: node.context.to_context_value(),
        }
    }

    pub fn get_parent(&self, node: &NodeId) -> Option<TreeNode> {
        self.service.parent_of(node)
    }

    pub fn refresh(&self, node: &NodeId) -> Result<(), ExplorerError> {
        self.service.refresh_node(node)
    }

    pub fn refresh_node(&self, node: &NodeId) -> Result<(), ExplorerError> {
        self.service.refresh_node(node)
    }

    pub async fn remove_node(&self, node: &NodeId) -> Result<bool, ExplorerError> {
        self.service.remove_node(node).await
    }

    pub async fn disconnect_node(&self, node: &NodeId) -> Result<(), ExplorerError> {
        self.service.disconnect_node(node).await
    }

    pub async fn reconnect_node(&self, node: &NodeId) -> Result<Vec<TreeNode>, ExplorerError> {
        self.service.reconnect_node(node).await
    }

    pub fn set_node_filters(
        &self,
        node: &NodeId,
        filters: Vec<NodeFilter>,
    ) -> Result<(), ExplorerError> {
        self.service.set_node_filters(node, filters)
    }

    pub fn clear_node_filters(&self, node: &NodeId) -> Result<(), ExplorerError> {
        self.service.clear_node_filters(node)
    }
}

fn tooltip(node: &TreeNode) -> String {
    match &node.kind {
        NodeKind::Connection(connection) => {
            let profile = &connection.profile;
            let mut lines = vec![format!("Server: {}", profile.server)];

            if let Some(database) = profile.database.as_deref().filter(|db| !db.is_empty()) {
                lines.push(format!("Database: {database}"));
            }
            lines.push(format!(
                "Authentication: {}",
                profile.authentication_type.display_name()
            ));
            if let Some(container) = profile.container_name.as_deref() {
                lines.push(format!("Container: {container}"));
            }

            lines.join("\n")
        }
        NodeKind::Error { message } => message.clone(),
        _ if node.node_path.is_empty() => node.label.clone(),
        _ => node.node_path.clone(),
    }
}

/// `TreeRefresher` forwarding repaint requests into a channel.
///
/// `None` in the channel means repaint everything.
pub struct ChannelRefresher {
    tx: mpsc::UnboundedSender<Option<NodeId>>,
}

impl ChannelRefresher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Option<NodeId>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TreeRefresher for ChannelRefresher {
    fn refresh(&self, node: Option<&NodeId>) {
        if self.tx.send(node.cloned()).is_err() {
            log::debug!("Tree refresh receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionProfile;

    #[test]
    fn channel_refresher_forwards_targets() {
        let (refresher, mut rx) = ChannelRefresher::new();
        let id = NodeId::new("n1");

        refresher.refresh(Some(&id));
        refresher.refresh(None);

        assert_eq!(rx.try_recv().unwrap(), Some(id));
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn connection_tooltip_lists_target() {
        let mut profile = ConnectionProfile::sql_login("srv", "sa", Some("db1".into()));
        profile.container_name = Some("sql2022".into());
        let node = TreeNode::connection(profile);

        assert_eq!(
            tooltip(&node),
            "Server: srv\nDatabase: db1\nAuthentication: SQL Login\nContainer: sql2022"
        );
    }
}
