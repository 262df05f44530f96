use std::collections::HashMap;
use std::fmt::Write as _;

use action_protocol::ProjectPath;

use crate::node::{Node, NodeId, NodeKind};

/// Canonical project state built from merged action tokens.
///
/// Nodes live in an arena owned by the tree. Every live node, the root
/// included, is indexed by its full path; the index only stores handles.
#[derive(Debug, Clone)]
pub struct ArtifactTree {
    slots: Vec<Option<Node>>,
    index: HashMap<ProjectPath, NodeId>,
    root: NodeId,
}

impl Default for ArtifactTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactTree {
    #[must_use]
    pub fn new() -> Self {
        let root_id = NodeId(0);
        let root = Node {
            id: root_id,
            name: String::new(),
            path: ProjectPath::root(),
            parent: None,
            kind: NodeKind::Directory {
                children: Vec::new(),
            },
        };

        let mut index = HashMap::new();
        index.insert(ProjectPath::root(), root_id);

        Self {
            slots: vec![Some(root)],
            index,
            root: root_id,
        }
    }

    /// Drops every node and starts over with an empty root.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        self.slots[self.root.0 as usize]
            .as_ref()
            .expect("root slot is never vacated")
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    #[must_use]
    pub fn get(&self, path: &ProjectPath) -> Option<&Node> {
        self.index.get(path).and_then(|id| self.node(*id))
    }

    /// Looks up a raw, not yet normalized path.
    #[must_use]
    pub fn lookup(&self, raw: &str) -> Option<&Node> {
        let path = ProjectPath::parse(raw).ok()?;
        self.get(&path)
    }

    #[must_use]
    pub fn contains(&self, path: &ProjectPath) -> bool {
        self.index.contains_key(path)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        self.node(id)
            .map(Node::child_ids)
            .unwrap_or(&[])
            .iter()
            .filter_map(|child| self.node(*child))
    }

    /// Number of nodes, not counting the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth-first pre-order walk in child insertion order, root excluded.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        let mut stack: Vec<NodeId> = self.root().child_ids().to_vec();
        stack.reverse();
        Walk { tree: self, stack }
    }

    /// Files as `(path, content)` pairs in walk order.
    pub fn files(&self) -> impl Iterator<Item = (&ProjectPath, &str)> {
        self.walk()
            .filter_map(|node| node.content().map(|content| (node.path(), content)))
    }

    /// Indented listing with a trailing `/` on directories.
    #[must_use]
    pub fn render_listing(&self) -> String {
        let mut listing = String::new();
        for node in self.walk() {
            let depth = node.path().segments().count().saturating_sub(1);
            let suffix = if node.is_dir() { "/" } else { "" };
            let _ = writeln!(listing, "{}{}{suffix}", "  ".repeat(depth), node.name());
        }
        listing
    }

    pub(crate) fn root_id(&self) -> NodeId {
        self.root
    }

    pub(crate) fn id_of(&self, path: &ProjectPath) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }

    /// Appends a new node at `path` to `parent`'s child list.
    pub(crate) fn insert_child(&mut self, parent: NodeId, path: ProjectPath, kind: NodeKind) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        let node = Node {
            id,
            name: path.name().to_string(),
            path: path.clone(),
            parent: Some(parent),
            kind,
        };

        if let Some(NodeKind::Directory { children }) =
            self.node_mut(parent).map(|parent| &mut parent.kind)
        {
            children.push(id);
        }
        self.slots.push(Some(node));
        self.index.insert(path, id);
        id
    }

    /// Detaches a file or empty directory from its parent and the index.
    pub(crate) fn remove_leaf(&mut self, id: NodeId) -> Option<Node> {
        let node = self.slots.get_mut(id.0 as usize)?.take()?;
        if let Some(NodeKind::Directory { children }) = node
            .parent
            .and_then(|parent| self.node_mut(parent))
            .map(|parent| &mut parent.kind)
        {
            children.retain(|child| *child != id);
        }
        self.index.remove(&node.path);
        Some(node)
    }
}

/// Iterator returned by [`ArtifactTree::walk`].
pub struct Walk<'a> {
    tree: &'a ArtifactTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(node) = self.tree.node(id) else {
                continue;
            };
            self.stack.extend(node.child_ids().iter().rev());
            return Some(node);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::ArtifactTree;
    use crate::node::NodeKind;
    use action_protocol::ProjectPath;

    fn path(raw: &str) -> ProjectPath {
        ProjectPath::parse(raw).expect("valid path")
    }

    fn file(content: &str) -> NodeKind {
        NodeKind::File {
            content: content.to_string(),
        }
    }

    fn dir() -> NodeKind {
        NodeKind::Directory {
            children: Vec::new(),
        }
    }

    #[test]
    fn new_tree_has_only_root() {
        let tree = ArtifactTree::new();
        assert!(tree.is_empty());
        assert!(tree.root().is_dir());
        assert!(tree.root().path().is_root());
        assert_eq!(tree.walk().count(), 0);
    }

    #[test]
    fn walk_is_preorder_in_insertion_order() {
        let mut tree = ArtifactTree::new();
        let root = tree.root_id();
        let src = tree.insert_child(root, path("src"), dir());
        tree.insert_child(root, path("index.html"), file("<html>"));
        tree.insert_child(src, path("src/main.ts"), file("main"));
        tree.insert_child(src, path("src/app.ts"), file("app"));

        let order: Vec<&str> = tree.walk().map(|node| node.path().as_str()).collect();
        assert_eq!(order, vec!["src", "src/main.ts", "src/app.ts", "index.html"]);
        assert_eq!(tree.render_listing(), "src/\n  main.ts\n  app.ts\nindex.html\n");
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut tree = ArtifactTree::new();
        let root = tree.root_id();
        let first = tree.insert_child(root, path("a.txt"), file("1"));
        tree.remove_leaf(first).expect("removed");
        let second = tree.insert_child(root, path("a.txt"), file("2"));

        assert_ne!(first, second);
        assert!(tree.node(first).is_none());
        assert_eq!(tree.lookup("/a.txt").and_then(|node| node.content()), Some("2"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut tree = ArtifactTree::new();
        let root = tree.root_id();
        tree.insert_child(root, path("a.txt"), file("1"));
        tree.reset();
        assert!(tree.is_empty());
        assert!(tree.lookup("a.txt").is_none());
    }
}
