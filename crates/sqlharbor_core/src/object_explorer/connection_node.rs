use crate::{ConnectionProfile, NodeInfo};

use super::tree_node::{
    CollapsibleState, NodeContext, NodeId, NodeKind, SERVER_NODE_TYPE, TreeNode,
};

/// Session lifecycle of a root connection node.
///
/// A removed node has no state: it simply leaves the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Loaded from a saved profile, never connected.
    Unrealized,
    /// Create-session request sent, completion notification outstanding.
    SessionPending,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct ConnectionNode {
    pub profile: ConnectionProfile,
    pub status: ConnectionStatus,
}

/// Inputs for `TreeNode::update_to_connected_state`.
pub struct ConnectedState<'a> {
    pub node_info: &'a NodeInfo,
    pub session_id: &'a str,
    pub parent: Option<&'a NodeId>,
    pub profile: ConnectionProfile,
}

impl TreeNode {
    /// Root node for a saved profile, in the disconnected state.
    pub fn connection(profile: ConnectionProfile) -> Self {
        let mut context = NodeContext::new(SERVER_NODE_TYPE);
        context.sub_type = connection_sub_type(&profile);

        Self {
            id: NodeId::for_connection(&profile.id),
            label: profile.display_label(),
            node_path: String::new(),
            node_type: SERVER_NODE_TYPE.to_string(),
            node_sub_type: None,
            node_status: None,
            session_id: None,
            parent: None,
            profile_id: Some(profile.id),
            collapsible: CollapsibleState::Collapsed,
            context,
            is_leaf: false,
            filterable_properties: Vec::new(),
            filters: Vec::new(),
            metadata: None,
            object_type: None,
            should_refresh: false,
            kind: NodeKind::Connection(ConnectionNode {
                profile,
                status: ConnectionStatus::Unrealized,
            }),
        }
    }

    pub fn connection_info(&self) -> Option<&ConnectionNode> {
        match &self.kind {
            NodeKind::Connection(connection) => Some(connection),
            _ => None,
        }
    }

    pub fn connection_info_mut(&mut self) -> Option<&mut ConnectionNode> {
        match &mut self.kind {
            NodeKind::Connection(connection) => Some(connection),
            _ => None,
        }
    }

    pub fn connection_profile(&self) -> Option<&ConnectionProfile> {
        self.connection_info().map(|c| &c.profile)
    }

    pub fn connection_status(&self) -> Option<ConnectionStatus> {
        self.connection_info().map(|c| c.status)
    }

    pub(crate) fn set_connection_status(&mut self, status: ConnectionStatus) {
        if let Some(connection) = self.connection_info_mut() {
            connection.status = status;
        }
    }

    pub(crate) fn replace_profile(&mut self, profile: ConnectionProfile) {
        self.label = profile.display_label();
        self.context.sub_type = connection_sub_type(&profile);
        self.profile_id = Some(profile.id);

        if let Some(connection) = self.connection_info_mut() {
            connection.profile = profile;
        }
    }

    /// Binds a live session to this connection node.
    ///
    /// Calling it twice with the same inputs leaves the same state.
    pub fn update_to_connected_state(&mut self, state: ConnectedState<'_>) {
        if !self.is_connection() {
            return;
        }

        self.replace_profile(state.profile);
        self.collapsible = CollapsibleState::Expanded;
        self.node_path = state.node_info.node_path.clone();
        self.node_status = state.node_info.node_status.clone();
        self.filterable_properties = state.node_info.filterable_properties.clone();
        self.context.filterable = !self.filterable_properties.is_empty();
        self.session_id = Some(state.session_id.to_string());
        self.parent = state.parent.cloned();
        self.is_leaf = false;
        self.set_connection_status(ConnectionStatus::Connected);
    }

    /// Drops the session binding.
    ///
    /// Unsaved passwords are blanked so they never outlive the session.
    pub fn update_to_disconnected_state(&mut self) {
        if !self.is_connection() {
            return;
        }

        self.session_id = None;
        self.node_path.clear();
        self.node_status = None;
        self.filterable_properties.clear();
        self.context.filterable = false;
        self.collapsible = CollapsibleState::Collapsed;
        self.should_refresh = false;

        if let Some(connection) = self.connection_info_mut() {
            connection.status = ConnectionStatus::Disconnected;
            if !connection.profile.save_password {
                connection.profile.password = None;
            }
        }
    }

    /// Returns a connection whose session never came up to its idle state.
    pub fn update_to_unrealized_state(&mut self) {
        if !self.is_connection() {
            return;
        }

        self.session_id = None;

        if let Some(connection) = self.connection_info_mut() {
            connection.status = ConnectionStatus::Unrealized;
            if !connection.profile.save_password {
                connection.profile.password = None;
            }
        }
    }
}

fn connection_sub_type(profile: &ConnectionProfile) -> Option<String> {
    if profile.is_containerized() {
        Some("Docker".to_string())
    } else if profile.targets_database() {
        Some("Database".to_string())
    } else {
        None
    }
}
