//! Generic ordered tree with cached subtree sizes
//!
//!     Nodes live in an arena owned by [`Tree`] and are addressed by [`NodeId`]. Parent and child
//!     links are stored as ids, so a node is owned by exactly one parent (or by none, while it is
//!     detached) without any shared mutable aliasing.
//!
//!     Every node caches `subtree_size`, the number of nodes in the subtree it roots (itself
//!     included). Structural operations validate all of their preconditions first and only then
//!     touch the tree, finishing with a single [`Tree::update_ancestors`] walk. A mutation
//!     either leaves every counter exact or panics before anything changed.
//!
//!     Nodes are created detached with [`Tree::create`]. A detached node may grow children of its
//!     own and is later attached with [`Tree::insert_child`] or [`Tree::insert_subtree`]. Removed
//!     nodes stay in the arena, detached, and may be inserted again.
//!
//! See [`keyroots`] for the key-root classification and [`distance`] for the tree edit distance
//! built on top of it.

pub mod distance;
pub mod keyroots;

pub use distance::{edit_distance, EditCost, UnitCost};

use std::fmt;

/// Stable handle of a node inside a [`Tree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Addresses a child either by its position or by its id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRef {
    Index(usize),
    Node(NodeId),
}

impl From<usize> for ChildRef {
    fn from(index: usize) -> Self {
        ChildRef::Index(index)
    }
}

impl From<NodeId> for ChildRef {
    fn from(node: NodeId) -> Self {
        ChildRef::Node(node)
    }
}

/// A tree element: payload plus structural links
#[derive(Debug, Clone)]
pub struct Node<T> {
    data: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    subtree_size: usize,
}

impl<T> Node<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            subtree_size: 1,
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Number of nodes in the subtree rooted here, this node included
    pub fn subtree_size(&self) -> usize {
        self.subtree_size
    }
}

#[derive(Debug, Clone)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    root: NodeId,
}

impl<T> Tree<T> {
    pub fn new(root_data: T) -> Self {
        Self {
            nodes: vec![Node::new(root_data)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node
    pub fn create(&mut self, data: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    pub fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id.0].data
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.nodes[id.0].subtree_size
    }

    /// Whether the node belongs to the tree proper: it is the root or hangs from a parent
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.nodes[id.0].parent.is_some()
    }

    /// Number of arena slots, attached or not
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Insert a node under `parent` at `index` (default: last).
    ///
    /// The `covered` children starting at `index` are moved under the new node, keeping their
    /// order. Panics if `node` already has a parent, is the root, would become its own
    /// ancestor, has children while `covered > 0`, or if the index range is out of bounds.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        node: NodeId,
        index: Option<usize>,
        covered: usize,
    ) {
        assert!(
            self.nodes[node.0].parent.is_none(),
            "node {node} already has a parent"
        );
        assert!(node != self.root, "node {node} is the tree root");
        assert!(
            !self.is_ancestor_or_self(node, parent),
            "node {node} cannot be inserted below itself"
        );
        let len = self.nodes[parent.0].children.len();
        let index = index.unwrap_or(len);
        assert!(
            index <= len,
            "insertion index {index} out of bounds for {len} children"
        );
        assert!(
            index + covered <= len,
            "cannot cover {covered} children from index {index} of {len}"
        );
        assert!(
            covered == 0 || self.nodes[node.0].children.is_empty(),
            "node {node} must have no children to cover siblings"
        );

        let delta = self.nodes[node.0].subtree_size;
        let moved: Vec<NodeId> = self.nodes[parent.0]
            .children
            .splice(index..index + covered, [node])
            .collect();
        let moved_size: usize = moved.iter().map(|id| self.nodes[id.0].subtree_size).sum();
        for id in &moved {
            self.nodes[id.0].parent = Some(node);
        }
        let inserted = &mut self.nodes[node.0];
        inserted.children.extend(moved);
        inserted.subtree_size += moved_size;
        inserted.parent = Some(parent);

        self.update_ancestors(parent, delta as isize);
    }

    /// Insert a node together with whatever subtree it already carries
    pub fn insert_subtree(&mut self, parent: NodeId, node: NodeId, index: Option<usize>) {
        self.insert_child(parent, node, index, 0);
    }

    /// Remove a single node, promoting its children into its place.
    pub fn remove_child(&mut self, parent: NodeId, child: impl Into<ChildRef>) -> Option<NodeId> {
        let index = self.child_index_of(parent, child)?;
        let node = self.nodes[parent.0].children[index];
        let promoted = std::mem::take(&mut self.nodes[node.0].children);
        for id in &promoted {
            self.nodes[id.0].parent = Some(parent);
        }
        self.nodes[parent.0]
            .children
            .splice(index..=index, promoted);
        let removed = &mut self.nodes[node.0];
        removed.parent = None;
        removed.subtree_size = 1;

        self.update_ancestors(parent, -1);
        Some(node)
    }

    /// Remove a node and its whole subtree.
    pub fn remove_subtree(
        &mut self,
        parent: NodeId,
        child: impl Into<ChildRef>,
    ) -> Option<NodeId> {
        let index = self.child_index_of(parent, child)?;
        let node = self.nodes[parent.0].children.remove(index);
        self.nodes[node.0].parent = None;
        let size = self.nodes[node.0].subtree_size;

        self.update_ancestors(parent, -(size as isize));
        Some(node)
    }

    pub fn child_at(&self, parent: NodeId, child: impl Into<ChildRef>) -> Option<NodeId> {
        match child.into() {
            ChildRef::Index(index) => self.nodes[parent.0].children.get(index).copied(),
            ChildRef::Node(id) => (self.nodes.get(id.0)?.parent == Some(parent)).then_some(id),
        }
    }

    pub fn child_index_of(&self, parent: NodeId, child: impl Into<ChildRef>) -> Option<usize> {
        let children = &self.nodes[parent.0].children;
        match child.into() {
            ChildRef::Index(index) => (index < children.len()).then_some(index),
            ChildRef::Node(id) => children.iter().position(|c| *c == id),
        }
    }

    /// Apply a size delta to `from` and every ancestor above it
    fn update_ancestors(&mut self, from: NodeId, delta: isize) {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let node = &mut self.nodes[id.0];
            node.subtree_size = node
                .subtree_size
                .checked_add_signed(delta)
                .expect("subtree size underflow");
            cursor = node.parent;
        }
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> bool {
        std::iter::once(of)
            .chain(self.ancestors(of))
            .any(|id| id == candidate)
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id.0].parent, move |p| self.nodes[p.0].parent)
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Pre-order walk of the subtree rooted at `id`, `id` first
    pub fn descendants(&self, id: NodeId) -> Descendants<'_, T> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Previous sibling, if any
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index_of(parent, id)?;
        index
            .checked_sub(1)
            .map(|i| self.nodes[parent.0].children[i])
    }

    /// Drop arena slots at and past `len`.
    ///
    /// Dropped nodes still hanging from a retained parent are unlinked first, so the retained
    /// part of the tree keeps exact counters.
    pub(crate) fn truncate(&mut self, len: usize) {
        assert!(len > self.root.0, "cannot truncate the root away");
        for index in len..self.nodes.len() {
            if let Some(parent) = self.nodes[index].parent {
                if parent.0 < len {
                    self.remove_subtree(parent, NodeId(index));
                }
            }
        }
        self.nodes.truncate(len);
    }

    /// Check structural consistency of every arena node.
    ///
    /// Verifies parent/child links point at each other exactly once and that every cached
    /// `subtree_size` equals one plus the sum of its children's.
    pub fn verify(&self) -> Result<(), String> {
        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId(index);
            let expected = 1 + node
                .children
                .iter()
                .map(|c| self.nodes[c.0].subtree_size)
                .sum::<usize>();
            if node.subtree_size != expected {
                return Err(format!(
                    "node {id}: subtree size {} but children sum to {expected}",
                    node.subtree_size
                ));
            }
            for child in &node.children {
                if self.nodes[child.0].parent != Some(id) {
                    return Err(format!("node {child} listed under {id} but points elsewhere"));
                }
                if node.children.iter().filter(|c| *c == child).count() != 1 {
                    return Err(format!("node {child} appears more than once under {id}"));
                }
            }
            if let Some(parent) = node.parent {
                if !self.nodes[parent.0].children.contains(&id) {
                    return Err(format!("node {id} points at {parent} which does not list it"));
                }
            }
        }
        Ok(())
    }
}

/// Pre-order iterator returned by [`Tree::descendants`]
pub struct Descendants<'a, T> {
    tree: &'a Tree<T>,
    stack: Vec<NodeId>,
}

impl<T> Iterator for Descendants<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(tree: &Tree<&'static str>, id: NodeId) -> Vec<&'static str> {
        tree.children(id).iter().map(|c| *tree.get(*c)).collect()
    }

    #[test]
    fn test_insert_appends_and_counts() {
        let mut tree = Tree::new("root");
        let a = tree.create("a");
        let b = tree.create("b");
        tree.insert_child(tree.root(), a, None, 0);
        tree.insert_child(tree.root(), b, None, 0);

        assert_eq!(labels(&tree, tree.root()), vec!["a", "b"]);
        assert_eq!(tree.subtree_size(tree.root()), 3);
        assert_eq!(tree.parent(a), Some(tree.root()));
        tree.verify().unwrap();
    }

    #[test]
    fn test_insert_covering_reparents_in_order() {
        let mut tree = Tree::new("root");
        let root = tree.root();
        for label in ["a", "b", "c", "d"] {
            let id = tree.create(label);
            tree.insert_child(root, id, None, 0);
        }
        let wrap = tree.create("wrap");
        tree.insert_child(root, wrap, Some(1), 2);

        assert_eq!(labels(&tree, root), vec!["a", "wrap", "d"]);
        assert_eq!(labels(&tree, wrap), vec!["b", "c"]);
        assert_eq!(tree.subtree_size(wrap), 3);
        assert_eq!(tree.subtree_size(root), 6);
        tree.verify().unwrap();
    }

    #[test]
    fn test_insert_updates_all_ancestors() {
        let mut tree = Tree::new("root");
        let a = tree.create("a");
        tree.insert_child(tree.root(), a, None, 0);
        let b = tree.create("b");
        tree.insert_child(a, b, None, 0);
        let c = tree.create("c");
        tree.insert_child(b, c, None, 0);

        assert_eq!(tree.subtree_size(tree.root()), 4);
        assert_eq!(tree.subtree_size(a), 3);
        assert_eq!(tree.depth(c), 3);
    }

    #[test]
    fn test_insert_subtree_adds_whole_size() {
        let mut tree = Tree::new("root");
        let sub = tree.create("sub");
        for label in ["x", "y"] {
            let id = tree.create(label);
            tree.insert_child(sub, id, None, 0);
        }
        tree.insert_subtree(tree.root(), sub, None);
        assert_eq!(tree.subtree_size(tree.root()), 4);
        assert_eq!(tree.children(sub).len(), 2);
        assert_eq!(tree.descendants(tree.root()).count(), 4);
        tree.verify().unwrap();
    }

    #[test]
    #[should_panic(expected = "already has a parent")]
    fn test_insert_rejects_parented_node() {
        let mut tree = Tree::new("root");
        let a = tree.create("a");
        let b = tree.create("b");
        tree.insert_child(tree.root(), a, None, 0);
        tree.insert_child(tree.root(), b, None, 0);
        tree.insert_child(b, a, None, 0);
    }

    #[test]
    #[should_panic(expected = "is the tree root")]
    fn test_insert_rejects_root() {
        let mut tree = Tree::new("root");
        let a = tree.create("a");
        let root = tree.root();
        tree.insert_child(a, root, None, 0);
    }

    #[test]
    #[should_panic(expected = "must have no children")]
    fn test_covering_requires_childless_node() {
        let mut tree = Tree::new("root");
        let a = tree.create("a");
        tree.insert_child(tree.root(), a, None, 0);
        let wrap = tree.create("wrap");
        let inner = tree.create("inner");
        tree.insert_child(wrap, inner, None, 0);
        tree.insert_child(tree.root(), wrap, Some(0), 1);
    }

    #[test]
    fn test_rejected_insert_leaves_counters_untouched() {
        let mut tree = Tree::new("root");
        let a = tree.create("a");
        tree.insert_child(tree.root(), a, None, 0);
        let snapshot = tree.clone();
        let b = tree.create("b");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tree.insert_child(snapshot.root(), b, Some(5), 0);
        }));
        assert!(result.is_err());
        assert_eq!(tree.subtree_size(tree.root()), 2);
        tree.verify().unwrap();
    }

    #[test]
    fn test_remove_child_promotes_children() {
        let mut tree = Tree::new("root");
        let root = tree.root();
        let a = tree.create("a");
        let mid = tree.create("mid");
        let z = tree.create("z");
        tree.insert_child(root, a, None, 0);
        tree.insert_child(root, mid, None, 0);
        tree.insert_child(root, z, None, 0);
        for label in ["m1", "m2"] {
            let id = tree.create(label);
            tree.insert_child(mid, id, None, 0);
        }

        assert_eq!(tree.remove_child(root, mid), Some(mid));
        assert_eq!(labels(&tree, root), vec!["a", "m1", "m2", "z"]);
        assert_eq!(tree.subtree_size(root), 5);
        assert_eq!(tree.parent(mid), None);
        assert_eq!(tree.subtree_size(mid), 1);
        tree.verify().unwrap();
    }

    #[test]
    fn test_remove_subtree_drops_descendants() {
        let mut tree = Tree::new("root");
        let root = tree.root();
        let mid = tree.create("mid");
        tree.insert_child(root, mid, None, 0);
        let leaf = tree.create("leaf");
        tree.insert_child(mid, leaf, None, 0);

        assert_eq!(tree.remove_subtree(root, 0), Some(mid));
        assert_eq!(tree.subtree_size(root), 1);
        assert_eq!(tree.subtree_size(mid), 2);
        assert!(!tree.is_attached(mid));

        // removed nodes can be inserted again
        tree.insert_subtree(root, mid, None);
        assert_eq!(tree.subtree_size(root), 3);
        tree.verify().unwrap();
    }

    #[test]
    fn test_misses_return_none() {
        let mut tree = Tree::new("root");
        let root = tree.root();
        let stray = tree.create("stray");
        assert_eq!(tree.remove_child(root, 0), None);
        assert_eq!(tree.remove_subtree(root, stray), None);
        assert_eq!(tree.child_at(root, 3), None);
        assert_eq!(tree.child_at(root, stray), None);
        assert_eq!(tree.child_index_of(root, stray), None);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut tree = Tree::new("r");
        let root = tree.root();
        let a = tree.create("a");
        let b = tree.create("b");
        let c = tree.create("c");
        tree.insert_child(root, a, None, 0);
        tree.insert_child(a, b, None, 0);
        tree.insert_child(root, c, None, 0);

        let order: Vec<_> = tree.descendants(root).map(|id| *tree.get(id)).collect();
        assert_eq!(order, vec!["r", "a", "b", "c"]);
        assert_eq!(tree.previous_sibling(c), Some(a));
        assert_eq!(tree.previous_sibling(a), None);
    }
}
