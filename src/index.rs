use indexmap::IndexMap;

use crate::{NodeId, YamlTree};

/// Flattened views of a tree keyed by dotted path: every node, and only the
/// value-bearing ones. Both hold arena ids, so they never outlive a node's
/// content.
#[derive(Debug, Clone, Default)]
pub(crate) struct KeyIndex {
    nodes: IndexMap<String, NodeId>,
    values: IndexMap<String, NodeId>,
}

pub(crate) fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

impl KeyIndex {
    /// Walks the tree from its root, which is registered under `""`.
    pub(crate) fn build(tree: &YamlTree) -> Self {
        let mut index = KeyIndex::default();
        index.insert_subtree(tree, tree.root(), String::new());
        tracing::debug!(
            nodes = index.nodes.len(),
            values = index.values.len(),
            "built key index"
        );
        index
    }

    /// Registers `id` under `key` and every descendant under `key.name`.
    pub(crate) fn insert_subtree(&mut self, tree: &YamlTree, id: NodeId, key: String) {
        if tree[id].is_value_bearing() {
            self.values.insert(key.clone(), id);
        }
        self.nodes.insert(key.clone(), id);
        for child in tree[id].child_ids() {
            let child_key = join(&key, tree[child].name());
            self.insert_subtree(tree, child, child_key);
        }
    }

    pub(crate) fn node(&self, key: &str) -> Option<NodeId> {
        self.nodes.get(key).copied()
    }

    pub(crate) fn value(&self, key: &str) -> Option<NodeId> {
        self.values.get(key).copied()
    }

    pub(crate) fn insert_node(&mut self, key: impl Into<String>, id: NodeId) {
        self.nodes.insert(key.into(), id);
    }

    /// Brings the value map in line with the node's current content.
    pub(crate) fn sync_value(&mut self, tree: &YamlTree, key: &str, id: NodeId) {
        if tree[id].is_value_bearing() {
            if !self.values.contains_key(key) {
                self.values.insert(key.to_string(), id);
            }
        } else {
            self.values.shift_remove(key);
        }
    }

    /// Drops `key` and everything below it from both maps.
    pub(crate) fn remove_subtree(&mut self, key: &str) {
        let prefix = format!("{key}.");
        let covered = |k: &String| k == key || key.is_empty() || k.starts_with(&prefix);
        self.nodes.retain(|k, _| !covered(k));
        self.values.retain(|k, _| !covered(k));
    }

    /// Value-bearing keys, in the order they were registered.
    pub(crate) fn value_keys(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.values.iter().map(|(k, id)| (k.as_str(), *id))
    }
}
