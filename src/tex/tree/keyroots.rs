//! Key-root classification
//!
//!     A node is a key root when it is the root of its tree or when it is not the left-most child
//!     of its parent. Following left-most children downwards from a key root yields one chain of
//!     the "left-most leaf" decomposition used by tree comparison algorithms; every node sits on
//!     exactly one chain, headed by the nearest key root above it.
//!
//!     The classification is derived on demand from the parent link and the child position, so
//!     it stays correct across any structural edit without extra bookkeeping.

use super::{NodeId, Tree};

impl<T> Tree<T> {
    pub fn is_key_root(&self, id: NodeId) -> bool {
        match self.parent(id) {
            None => true,
            Some(parent) => self.children(parent).first() != Some(&id),
        }
    }

    /// Follow left-most children down to a leaf
    pub fn leftmost_leaf(&self, id: NodeId) -> NodeId {
        let mut cursor = id;
        while let Some(first) = self.children(cursor).first() {
            cursor = *first;
        }
        cursor
    }

    /// Post-order listing of the subtree rooted at `id`
    pub fn postorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.subtree_size(id));
        let mut stack = vec![(id, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                out.push(node);
            } else {
                stack.push((node, true));
                stack.extend(self.children(node).iter().rev().map(|c| (*c, false)));
            }
        }
        out
    }

    /// Key roots of the subtree rooted at `id`, in post-order.
    ///
    /// `id` itself always counts: within its own subtree it has no parent.
    pub fn key_roots(&self, id: NodeId) -> Vec<NodeId> {
        self.postorder(id)
            .into_iter()
            .filter(|node| *node == id || self.is_key_root(*node))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // r
    // ├── a
    // │   ├── b
    // │   └── c
    // └── d
    fn sample() -> (Tree<char>, [NodeId; 5]) {
        let mut tree = Tree::new('r');
        let r = tree.root();
        let a = tree.create('a');
        let b = tree.create('b');
        let c = tree.create('c');
        let d = tree.create('d');
        tree.insert_child(r, a, None, 0);
        tree.insert_child(a, b, None, 0);
        tree.insert_child(a, c, None, 0);
        tree.insert_child(r, d, None, 0);
        (tree, [r, a, b, c, d])
    }

    #[test]
    fn test_key_root_classification() {
        let (tree, [r, a, b, c, d]) = sample();
        assert!(tree.is_key_root(r));
        assert!(!tree.is_key_root(a));
        assert!(!tree.is_key_root(b));
        assert!(tree.is_key_root(c));
        assert!(tree.is_key_root(d));
    }

    #[test]
    fn test_key_roots_follow_edits() {
        let (mut tree, [r, a, _, c, d]) = sample();
        tree.remove_subtree(r, a);
        assert!(tree.is_key_root(a));
        assert!(!tree.is_key_root(d));
        assert!(tree.is_key_root(c));
    }

    #[test]
    fn test_postorder_and_leftmost_leaf() {
        let (tree, [r, a, b, c, d]) = sample();
        assert_eq!(tree.postorder(r), vec![b, c, a, d, r]);
        assert_eq!(tree.leftmost_leaf(r), b);
        assert_eq!(tree.leftmost_leaf(d), d);
        assert_eq!(tree.key_roots(r), vec![c, d, r]);
        assert_eq!(tree.key_roots(a), vec![c, a]);
    }
}
