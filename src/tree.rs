use std::ops::{Index, IndexMut};

use crate::{Element, NodeId, YamlError, YamlKey, YamlNode};

/// Owning arena of [`YamlNode`]s. Nodes refer to each other through
/// [`NodeId`]s, which stay valid for the lifetime of the tree. Removed
/// subtrees are unlinked but keep their slots.
#[derive(Debug, Clone)]
pub struct YamlTree {
    nodes: Vec<YamlNode>,
    root: NodeId,
}

impl Default for YamlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlTree {
    /// Creates a tree holding only an empty root.
    pub fn new() -> Self {
        YamlTree {
            nodes: vec![YamlNode::new("")],
            root: NodeId(0),
        }
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Gets a node, if `id` belongs to this tree.
    pub fn get(&self, id: NodeId) -> Option<&YamlNode> {
        self.nodes.get(id.0)
    }

    /// Gets a node mutably, if `id` belongs to this tree.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut YamlNode> {
        self.nodes.get_mut(id.0)
    }

    /// Direct children of `id`, in document order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self[id].child_ids().collect()
    }

    /// `id` followed by everything below it, in document order.
    pub(crate) fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Looks up a direct child of `parent` by name.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get(parent).and_then(|node| node.child(name))
    }

    fn alloc(&mut self, mut node: YamlNode, parent: NodeId) -> NodeId {
        node.parent = Some(parent);
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn check_can_adopt(&self, parent: NodeId, name: &str) -> Result<(), YamlError> {
        let node = &self[parent];
        if node.is_value_bearing() {
            return Err(YamlError::conflict(
                node.name(),
                "it is not possible to add a sub key to a node holding values",
            ));
        }
        if node.children.contains_key(name) {
            return Err(YamlError::conflict(node.name(), "the sub key already exists"));
        }
        Ok(())
    }

    /// Creates a child under `parent`. The new key is placed next to a
    /// sibling it shares a prefix with, so related keys stay together;
    /// otherwise it is appended.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        key: impl Into<YamlKey>,
    ) -> Result<NodeId, YamlError> {
        let key = key.into();
        self.check_can_adopt(parent, key.value())?;
        let name = key.value().to_string();
        let position = self[parent]
            .elements
            .iter()
            .enumerate()
            .find_map(|(i, e)| match e {
                Element::Node(sibling) => {
                    let sibling = self[*sibling].name();
                    if sibling.starts_with(name.as_str()) {
                        Some(i)
                    } else if name.starts_with(sibling) {
                        Some(i + 1)
                    } else {
                        None
                    }
                }
                Element::Value(_) => None,
            });
        let id = self.alloc(YamlNode::new(key), parent);
        let node = &mut self[parent];
        match position {
            Some(pos) if pos < node.elements.len() => node.elements.insert(pos, Element::Node(id)),
            _ => node.elements.push(Element::Node(id)),
        }
        node.children.insert(name, id);
        Ok(id)
    }

    /// Appends `node` as the last child of `parent`, keeping the node's
    /// metadata. Used while reading, where document order is authoritative.
    pub(crate) fn push_child(
        &mut self,
        parent: NodeId,
        node: YamlNode,
    ) -> Result<NodeId, YamlError> {
        self.check_can_adopt(parent, node.name())?;
        let name = node.name().to_string();
        let id = self.alloc(node, parent);
        let parent = &mut self[parent];
        parent.elements.push(Element::Node(id));
        parent.children.insert(name, id);
        Ok(id)
    }

    /// Unlinks `id` from its parent. Returns `false` for a root or a node
    /// that was already removed.
    pub fn remove_child(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.get(id).and_then(YamlNode::parent) else {
            return false;
        };
        let name = self[id].name().to_string();
        let node = &mut self[parent];
        let before = node.elements.len();
        node.elements.retain(|e| *e != Element::Node(id));
        if node.children.get(&name) == Some(&id) {
            node.children.remove(&name);
        }
        let removed = node.elements.len() != before;
        if removed {
            self[id].parent = None;
        }
        removed
    }

    /// Copies the subtree at `id` into a new tree whose root takes the
    /// node's content under an empty name. The copy shares nothing with
    /// this tree.
    pub fn deep_copy(&self, id: NodeId) -> YamlTree {
        let mut tree = YamlTree::new();
        let source = &self[id];
        let root = tree.root;
        {
            let target = &mut tree[root];
            target.flow = source.flow;
            target.dash_items = source.dash_items;
            target.compact = source.compact;
        }
        self.copy_elements(id, &mut tree, root);
        tracing::debug!(
            key = source.name(),
            nodes = tree.nodes.len(),
            "copied subtree"
        );
        tree
    }

    fn copy_elements(&self, from: NodeId, tree: &mut YamlTree, to: NodeId) {
        for element in &self[from].elements {
            match element {
                Element::Value(v) => tree[to].elements.push(Element::Value(v.clone())),
                Element::Node(child) => {
                    let mut copy = self[*child].clone();
                    copy.elements.clear();
                    copy.children.clear();
                    let name = copy.name().to_string();
                    let new_id = tree.alloc(copy, to);
                    let parent = &mut tree[to];
                    parent.elements.push(Element::Node(new_id));
                    parent.children.insert(name, new_id);
                    self.copy_elements(*child, tree, new_id);
                }
            }
        }
    }

    fn subtree_eq(&self, a: NodeId, other: &YamlTree, b: NodeId) -> bool {
        let (x, y) = (&self[a], &other[b]);
        if x.key != y.key
            || x.comment != y.comment
            || x.inline_comment != y.inline_comment
            || x.flow != y.flow
            || x.elements.len() != y.elements.len()
        {
            return false;
        }
        x.elements
            .iter()
            .zip(y.elements.iter())
            .all(|pair| match pair {
                (Element::Value(v), Element::Value(w)) => v.same_as(w, x.flow),
                (Element::Node(c), Element::Node(d)) => self.subtree_eq(*c, other, *d),
                _ => false,
            })
    }
}

impl Index<NodeId> for YamlTree {
    type Output = YamlNode;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for YamlTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.0]
    }
}

/// Structural equality of everything reachable from the roots: keys,
/// comments, values with their quoting, and sequence layout.
impl PartialEq for YamlTree {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn names(tree: &YamlTree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .into_iter()
            .map(|c| tree[c].name().to_string())
            .collect()
    }

    #[test]
    fn related_keys_stay_together() -> miette::Result<()> {
        let mut tree = YamlTree::new();
        let root = tree.root();
        tree.add_child(root, "Database")?;
        tree.add_child(root, "Language")?;
        tree.add_child(root, "Misc")?;
        tree.add_child(root, "LanguageUpdate")?;
        tree.add_child(root, "Data")?;

        assert_eq!(
            names(&tree, root),
            vec!["Data", "Database", "Language", "LanguageUpdate", "Misc"]
        );
        Ok(())
    }

    #[test]
    fn adoption_rules() -> miette::Result<()> {
        let mut tree = YamlTree::new();
        let root = tree.root();
        let scalar = tree.add_child(root, "scalar")?;
        tree[scalar].add_value("1")?;

        assert!(tree.add_child(scalar, "child").is_err());
        assert!(tree.add_child(root, "scalar").is_err());

        let list = tree.add_child(root, "list")?;
        tree[list].set(["a"])?;
        assert!(tree.add_child(list, "child").is_err());
        Ok(())
    }

    #[test]
    fn removal() -> miette::Result<()> {
        let mut tree = YamlTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "a")?;
        tree.add_child(root, "b")?;

        assert!(tree.remove_child(a));
        assert!(!tree.remove_child(a));
        assert!(!tree.remove_child(root));
        assert_eq!(names(&tree, root), vec!["b"]);
        assert_eq!(tree.child(root, "a"), None);
        Ok(())
    }

    #[test]
    fn deep_copy_is_independent() -> miette::Result<()> {
        let mut tree = YamlTree::new();
        let root = tree.root();
        let data = tree.add_child(root, "Data2")?;
        let inner = tree.add_child(data, "inner")?;
        tree[inner].set("value")?;

        let copy = tree.deep_copy(data);
        let copied_inner = copy.child(copy.root(), "inner").expect("copied child");
        assert_eq!(copy[copied_inner].value().map(|v| v.text()), Some("value"));
        assert_eq!(copy[copy.root()].name(), "");

        tree[inner].set("changed")?;
        assert_eq!(copy[copied_inner].value().map(|v| v.text()), Some("value"));
        assert_ne!(copy, tree.deep_copy(data));
        Ok(())
    }
}
