use std::collections::HashMap;

use crate::ConnectionProfile;

use super::tree_node::{NodeId, TreeNode};

/// Arena holding every node of the object explorer tree.
///
/// Nodes refer to their parent by id only. The children cache maps a node to
/// the ids of its children; a node without an entry has not been expanded.
#[derive(Debug, Default)]
pub struct ObjectTree {
    nodes: HashMap<NodeId, TreeNode>,
    roots: Vec<NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
    roots_loaded: bool,
}

impl ObjectTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots_loaded(&self) -> bool {
        self.roots_loaded
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    /// Root nodes in display order.
    pub fn roots(&self) -> Vec<TreeNode> {
        self.roots
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .cloned()
            .collect()
    }

    /// Replaces the whole root list. Roots are sorted case-insensitively by label.
    pub fn set_roots(&mut self, mut roots: Vec<TreeNode>) {
        for id in std::mem::take(&mut self.roots) {
            self.remove_subtree(&id);
        }

        roots.sort_by_key(|node| node.label.to_lowercase());

        for node in roots {
            self.roots.push(node.id.clone());
            self.nodes.insert(node.id.clone(), node);
        }

        self.roots_loaded = true;
    }

    /// Inserts a root at its sorted position.
    pub fn insert_root(&mut self, node: TreeNode) {
        let key = node.label.to_lowercase();
        let position = self
            .roots
            .iter()
            .position(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|existing| existing.label.to_lowercase() > key)
            })
            .unwrap_or(self.roots.len());

        self.roots.insert(position, node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Finds the root connection node whose profile has the same identity.
    pub fn find_connection(&self, profile: &ConnectionProfile) -> Option<&TreeNode> {
        self.roots
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .find(|node| {
                node.connection_profile()
                    .is_some_and(|existing| existing.same_target(profile))
            })
    }

    /// Inserts the connection node for `profile`, or replaces the profile of
    /// the existing node with the same identity. Returns the node id.
    pub fn upsert_connection(&mut self, profile: ConnectionProfile) -> NodeId {
        let existing = self.find_connection(&profile).map(|node| node.id.clone());

        match existing {
            Some(id) => {
                let relabel = self
                    .nodes
                    .get(&id)
                    .is_some_and(|node| node.label != profile.display_label());

                if let Some(node) = self.nodes.get_mut(&id) {
                    node.replace_profile(profile);
                }

                // Keep the root list sorted when the label changed.
                if relabel {
                    self.roots.retain(|root| root != &id);
                    if let Some(node) = self.nodes.remove(&id) {
                        self.insert_root(node);
                    }
                }

                id
            }
            None => {
                let node = TreeNode::connection(profile);
                let id = node.id.clone();
                self.insert_root(node);
                self.roots_loaded = true;
                id
            }
        }
    }

    /// Removes a root node and everything below it.
    pub fn remove_root(&mut self, id: &NodeId) -> Option<TreeNode> {
        let position = self.roots.iter().position(|root| root == id)?;
        self.roots.remove(position);
        self.remove_subtree(id)
    }

    pub fn children(&self, id: &NodeId) -> Option<Vec<TreeNode>> {
        self.children.get(id).map(|ids| {
            ids.iter()
                .filter_map(|child| self.nodes.get(child))
                .cloned()
                .collect()
        })
    }

    pub fn has_children(&self, id: &NodeId) -> bool {
        self.children.contains_key(id)
    }

    /// Replaces the cached children of `parent`. The previous subtree leaves
    /// the arena.
    pub fn set_children(&mut self, parent: &NodeId, children: Vec<TreeNode>) -> Vec<TreeNode> {
        self.clear_children(parent);

        let mut ids = Vec::with_capacity(children.len());
        for mut child in children.iter().cloned() {
            child.parent = Some(parent.clone());
            ids.push(child.id.clone());
            self.nodes.insert(child.id.clone(), child);
        }

        self.children.insert(parent.clone(), ids);
        self.children(parent).unwrap_or(children)
    }

    /// Drops the children cache of `parent` and the nodes below it.
    pub fn clear_children(&mut self, parent: &NodeId) {
        if let Some(ids) = self.children.remove(parent) {
            for id in ids {
                self.remove_subtree(&id);
            }
        }
    }

    pub fn parent_of(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes
            .get(id)
            .and_then(|node| node.parent.as_ref())
            .and_then(|parent| self.nodes.get(parent))
    }

    /// Walks parent links up to the root connection node.
    pub fn connection_root_of(&self, id: &NodeId) -> Option<&TreeNode> {
        let mut current = self.nodes.get(id)?;

        while let Some(parent) = current.parent.as_ref() {
            current = self.nodes.get(parent)?;
        }

        current.is_connection().then_some(current)
    }

    fn remove_subtree(&mut self, id: &NodeId) -> Option<TreeNode> {
        let mut stack = vec![id.clone()];
        let mut removed = None;

        while let Some(current) = stack.pop() {
            if let Some(children) = self.children.remove(&current) {
                stack.extend(children);
            }

            let node = self.nodes.remove(&current);
            if &current == id {
                removed = node;
            }
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectionProfile, NodeInfo};

    fn child(label: &str) -> TreeNode {
        let info = NodeInfo {
            node_path: format!("srv/{label}"),
            node_type: "Folder".into(),
            label: label.into(),
            ..NodeInfo::default()
        };
        TreeNode::from_node_info(&info, "s1", None, None, None)
    }

    #[test]
    fn roots_are_sorted_case_insensitively() {
        let mut tree = ObjectTree::new();
        tree.set_roots(vec![
            TreeNode::connection(ConnectionProfile::sql_login("b", "sa", None).with_name("beta")),
            TreeNode::connection(ConnectionProfile::sql_login("a", "sa", None).with_name("Alpha")),
        ]);
        tree.insert_root(TreeNode::connection(
            ConnectionProfile::sql_login("g", "sa", None).with_name("Gamma"),
        ));
        tree.insert_root(TreeNode::connection(
            ConnectionProfile::sql_login("a2", "sa", None).with_name("alpha2"),
        ));

        let labels: Vec<_> = tree.roots().into_iter().map(|n| n.label).collect();
        assert_eq!(labels, vec!["Alpha", "alpha2", "beta", "Gamma"]);
    }

    #[test]
    fn upsert_matches_by_identity() {
        let mut tree = ObjectTree::new();
        let first = ConnectionProfile::sql_login("srv", "sa", Some("db".into()));
        let mut second = ConnectionProfile::sql_login("srv", "other", Some("db".into()));
        second.profile_name = Some("renamed".into());

        let a = tree.upsert_connection(first);
        let b = tree.upsert_connection(second);

        assert_eq!(a, b);
        assert_eq!(tree.root_ids().len(), 1);
        assert_eq!(tree.get(&a).map(|n| n.label.as_str()), Some("renamed"));
    }

    #[test]
    fn replacing_children_drops_old_subtree() {
        let mut tree = ObjectTree::new();
        let root = tree.upsert_connection(ConnectionProfile::sql_login("srv", "sa", None));

        let first = tree.set_children(&root, vec![child("Databases"), child("Security")]);
        let grandchild_parent = first[0].id.clone();
        tree.set_children(&grandchild_parent, vec![child("db1")]);
        assert_eq!(tree.len(), 4);

        tree.set_children(&root, vec![child("Databases")]);
        assert_eq!(tree.len(), 2);
        assert!(!tree.contains(&grandchild_parent));
    }

    #[test]
    fn parent_links_resolve_to_connection_root() {
        let mut tree = ObjectTree::new();
        let root = tree.upsert_connection(ConnectionProfile::sql_login("srv", "sa", None));
        let children = tree.set_children(&root, vec![child("Databases")]);
        let nested = tree.set_children(&children[0].id, vec![child("db1")]);

        assert_eq!(tree.parent_of(&nested[0].id).map(|n| n.id.clone()), Some(children[0].id.clone()));
        assert_eq!(tree.connection_root_of(&nested[0].id).map(|n| n.id.clone()), Some(root));
    }

    #[test]
    fn remove_root_removes_descendants() {
        let mut tree = ObjectTree::new();
        let root = tree.upsert_connection(ConnectionProfile::sql_login("srv", "sa", None));
        tree.set_children(&root, vec![child("Databases")]);

        assert!(tree.remove_root(&root).is_some());
        assert!(tree.is_empty());
        assert!(tree.root_ids().is_empty());
    }
}
