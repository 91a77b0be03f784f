use crate::{NodeFilter, NodeFilterProperty, NodeInfo, ObjectMetadata};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use super::connection_node::ConnectionNode;

pub const SERVER_NODE_TYPE: &str = "Server";
pub const ERROR_NODE_TYPE: &str = "Error";
pub const ADD_CONNECTION_NODE_TYPE: &str = "AddConnection";
pub const ACCOUNT_SIGN_IN_NODE_TYPE: &str = "AccountSignIn";
pub const CONNECT_NODE_TYPE: &str = "Connect";

static NEXT_NODE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of a node in the object explorer arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a non-connection node.
    pub fn next() -> Self {
        let seq = NEXT_NODE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("node-{seq}"))
    }

    /// Fresh id for a connection node.
    ///
    /// A profile is represented by a new node instance on every reconnect
    /// cycle, so the id combines the profile id with the creation time.
    pub fn for_connection(profile_id: &Uuid) -> Self {
        let seq = NEXT_NODE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{}_{}_{}",
            profile_id,
            Utc::now().timestamp_millis(),
            seq
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollapsibleState {
    None,
    Collapsed,
    Expanded,
}

/// UI context attached to every tree item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeContext {
    pub node_type: String,
    pub filterable: bool,
    pub has_filters: bool,
    pub sub_type: Option<String>,
}

impl NodeContext {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            filterable: false,
            has_filters: false,
            sub_type: None,
        }
    }

    /// Flat `key=value` rendering consumed by host menus.
    pub fn to_context_value(&self) -> String {
        let mut value = format!(
            "type={},filterable={},hasFilters={}",
            self.node_type, self.filterable, self.has_filters
        );

        if let Some(sub_type) = self.sub_type.as_deref().filter(|s| !s.is_empty()) {
            value.push_str(",subType=");
            value.push_str(sub_type);
        }

        value
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Connection(ConnectionNode),
    Object,
    Error { message: String },
    AddConnection,
    AccountSignIn { profile_id: Uuid },
    Connect { profile_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub label: String,
    pub node_path: String,
    pub node_type: String,
    pub node_sub_type: Option<String>,
    pub node_status: Option<String>,
    /// Present only while a live session backs this node.
    pub session_id: Option<String>,
    /// Non-owning link into the arena.
    pub parent: Option<NodeId>,
    /// Profile of the connection this node belongs to.
    pub profile_id: Option<Uuid>,
    pub collapsible: CollapsibleState,
    pub context: NodeContext,
    pub is_leaf: bool,
    pub filterable_properties: Vec<NodeFilterProperty>,
    pub filters: Vec<NodeFilter>,
    pub metadata: Option<ObjectMetadata>,
    pub object_type: Option<String>,
    pub should_refresh: bool,
    pub kind: NodeKind,
}

impl TreeNode {
    fn base(node_type: &str, label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            label: label.into(),
            node_path: String::new(),
            node_type: node_type.to_string(),
            node_sub_type: None,
            node_status: None,
            session_id: None,
            parent: None,
            profile_id: None,
            collapsible: CollapsibleState::None,
            context: NodeContext::new(node_type),
            is_leaf: true,
            filterable_properties: Vec::new(),
            filters: Vec::new(),
            metadata: None,
            object_type: None,
            should_refresh: false,
            kind,
        }
    }

    /// Maps a service node description into a tree node. Pure.
    pub fn from_node_info(
        info: &NodeInfo,
        session_id: &str,
        parent: Option<&NodeId>,
        profile_id: Option<Uuid>,
        label: Option<&str>,
    ) -> Self {
        let mut node = Self::base(
            &info.node_type,
            label.unwrap_or(&info.label),
            NodeKind::Object,
        );

        node.node_path = info.node_path.clone();
        node.node_sub_type = info.node_sub_type.clone();
        node.node_status = info.node_status.clone();
        node.session_id = Some(session_id.to_string());
        node.parent = parent.cloned();
        node.profile_id = profile_id;
        node.is_leaf = info.is_leaf;
        node.collapsible = if info.is_leaf {
            CollapsibleState::None
        } else {
            CollapsibleState::Collapsed
        };
        node.filterable_properties = info.filterable_properties.clone();
        node.metadata = info.metadata.clone();
        node.object_type = info.object_type.clone();
        node.context = NodeContext {
            node_type: info.node_type.clone(),
            filterable: !info.filterable_properties.is_empty(),
            has_filters: false,
            sub_type: info.node_sub_type.clone(),
        };

        node
    }

    pub fn error(parent: Option<&NodeId>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut node = Self::base(ERROR_NODE_TYPE, message.clone(), NodeKind::Error { message });
        node.parent = parent.cloned();
        node
    }

    pub fn add_connection() -> Self {
        Self::base(
            ADD_CONNECTION_NODE_TYPE,
            "Add Connection",
            NodeKind::AddConnection,
        )
    }

    pub fn account_sign_in(parent: &NodeId, profile_id: Uuid) -> Self {
        let mut node = Self::base(
            ACCOUNT_SIGN_IN_NODE_TYPE,
            "Sign in to Azure...",
            NodeKind::AccountSignIn { profile_id },
        );
        node.parent = Some(parent.clone());
        node.profile_id = Some(profile_id);
        node
    }

    pub fn connect_affordance(parent: &NodeId, profile_id: Uuid) -> Self {
        let mut node = Self::base(
            CONNECT_NODE_TYPE,
            "Connect",
            NodeKind::Connect { profile_id },
        );
        node.parent = Some(parent.clone());
        node.profile_id = Some(profile_id);
        node
    }

    pub fn is_connection(&self) -> bool {
        matches!(self.kind, NodeKind::Connection(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, NodeKind::Error { .. })
    }

    /// Icon name resolved by the host's icon theme.
    pub fn icon_id(&self) -> String {
        match &self.kind {
            NodeKind::Connection(connection) => {
                let base = if connection.profile.is_containerized() {
                    "Docker"
                } else if connection.profile.targets_database() {
                    "Database"
                } else {
                    SERVER_NODE_TYPE
                };

                let state = if self.session_id.is_some() {
                    "connected"
                } else {
                    "disconnected"
                };

                format!("{base}_{state}")
            }
            NodeKind::Object => {
                let mut icon = self.node_type.clone();
                for part in [&self.node_sub_type, &self.node_status].into_iter().flatten() {
                    if !part.is_empty() {
                        icon.push('_');
                        icon.push_str(part);
                    }
                }
                icon
            }
            NodeKind::Error { .. } => ERROR_NODE_TYPE.to_string(),
            NodeKind::AddConnection => "Add".to_string(),
            NodeKind::AccountSignIn { .. } => "SignIn".to_string(),
            NodeKind::Connect { .. } => CONNECT_NODE_TYPE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_info() -> NodeInfo {
        NodeInfo {
            node_path: "srv/Databases/db1/Tables/dbo.users".into(),
            node_type: "Table".into(),
            label: "dbo.users".into(),
            node_sub_type: Some("System".into()),
            is_leaf: false,
            ..NodeInfo::default()
        }
    }

    #[test]
    fn from_node_info_maps_identity_and_hierarchy() {
        let parent = NodeId::new("parent");
        let node = TreeNode::from_node_info(&table_info(), "s1", Some(&parent), None, None);

        assert_eq!(node.node_path, "srv/Databases/db1/Tables/dbo.users");
        assert_eq!(node.session_id.as_deref(), Some("s1"));
        assert_eq!(node.parent, Some(parent));
        assert_eq!(node.collapsible, CollapsibleState::Collapsed);
        assert_eq!(node.label, "dbo.users");
        assert_eq!(node.icon_id(), "Table_System");
    }

    #[test]
    fn from_node_info_label_override_and_leaf() {
        let mut info = table_info();
        info.is_leaf = true;

        let node = TreeNode::from_node_info(&info, "s1", None, None, Some("users"));
        assert_eq!(node.label, "users");
        assert_eq!(node.collapsible, CollapsibleState::None);
    }

    #[test]
    fn ids_are_unique() {
        let profile_id = Uuid::new_v4();
        let a = NodeId::for_connection(&profile_id);
        let b = NodeId::for_connection(&profile_id);

        assert_ne!(a, b);
        assert!(a.as_str().starts_with(&profile_id.to_string()));
        assert_ne!(NodeId::next(), NodeId::next());
    }

    #[test]
    fn context_value_rendering() {
        let mut context = NodeContext::new("Server");
        assert_eq!(
            context.to_context_value(),
            "type=Server,filterable=false,hasFilters=false"
        );

        context.sub_type = Some("Docker".into());
        context.filterable = true;
        assert_eq!(
            context.to_context_value(),
            "type=Server,filterable=true,hasFilters=false,subType=Docker"
        );
    }
}
