//! Tree edit distance (Zhang–Shasha)
//!
//!     Computes the minimum cost of turning one ordered tree into another with node deletions,
//!     insertions and relabelings. Subproblems are organised around key roots: for each pair of
//!     key roots a forest-distance table is filled, and full subtree distances found along the way
//!     are memoised for reuse by larger key roots.

use super::{NodeId, Tree};

/// Cost model for [`edit_distance`]
pub trait EditCost<A, B> {
    fn delete(&self, from: &A) -> usize;
    fn insert(&self, to: &B) -> usize;
    fn relabel(&self, from: &A, to: &B) -> usize;
}

/// Every operation costs one; relabeling equal payloads is free
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitCost;

impl<T: PartialEq> EditCost<T, T> for UnitCost {
    fn delete(&self, _: &T) -> usize {
        1
    }

    fn insert(&self, _: &T) -> usize {
        1
    }

    fn relabel(&self, from: &T, to: &T) -> usize {
        usize::from(from != to)
    }
}

/// Post-order view of one subtree: nodes and left-most leaf positions, both 1-based
struct Indexed<'a, T> {
    tree: &'a Tree<T>,
    nodes: Vec<NodeId>,
    leftmost: Vec<usize>,
    key_roots: Vec<usize>,
}

impl<'a, T> Indexed<'a, T> {
    fn new(tree: &'a Tree<T>, root: NodeId) -> Self {
        let order = tree.postorder(root);
        let mut position = std::collections::HashMap::with_capacity(order.len());
        for (i, id) in order.iter().enumerate() {
            position.insert(*id, i + 1);
        }
        let mut leftmost = vec![0];
        leftmost.extend(order.iter().map(|id| position[&tree.leftmost_leaf(*id)]));
        let key_roots = tree.key_roots(root).iter().map(|id| position[id]).collect();
        let mut nodes = vec![root];
        nodes.extend(order);
        Self {
            tree,
            nodes,
            leftmost,
            key_roots,
        }
    }

    fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    fn data(&self, i: usize) -> &T {
        self.tree.get(self.nodes[i])
    }
}

/// Edit distance between the subtree of `a` rooted at `a_root` and that of `b` at `b_root`
pub fn edit_distance<A, B, C>(
    a: &Tree<A>,
    a_root: NodeId,
    b: &Tree<B>,
    b_root: NodeId,
    cost: &C,
) -> usize
where
    C: EditCost<A, B>,
{
    let left = Indexed::new(a, a_root);
    let right = Indexed::new(b, b_root);
    let (n, m) = (left.len(), right.len());

    let mut tree_dist = vec![vec![0usize; m + 1]; n + 1];
    let mut forest = vec![vec![0usize; m + 1]; n + 1];

    for &i in &left.key_roots {
        for &j in &right.key_roots {
            let (li, lj) = (left.leftmost[i], right.leftmost[j]);
            forest[li - 1][lj - 1] = 0;
            for di in li..=i {
                forest[di][lj - 1] = forest[di - 1][lj - 1] + cost.delete(left.data(di));
            }
            for dj in lj..=j {
                forest[li - 1][dj] = forest[li - 1][dj - 1] + cost.insert(right.data(dj));
            }
            for di in li..=i {
                for dj in lj..=j {
                    let delete = forest[di - 1][dj] + cost.delete(left.data(di));
                    let insert = forest[di][dj - 1] + cost.insert(right.data(dj));
                    if left.leftmost[di] == li && right.leftmost[dj] == lj {
                        let relabel = forest[di - 1][dj - 1]
                            + cost.relabel(left.data(di), right.data(dj));
                        forest[di][dj] = delete.min(insert).min(relabel);
                        tree_dist[di][dj] = forest[di][dj];
                    } else {
                        let subtree = forest[left.leftmost[di] - 1][right.leftmost[dj] - 1]
                            + tree_dist[di][dj];
                        forest[di][dj] = delete.min(insert).min(subtree);
                    }
                }
            }
        }
    }

    tree_dist[n][m]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a tree from nested `(label, children)` pairs
    fn build(spec: &(char, Vec<(char, Vec<(char, Vec<()>)>)>)) -> Tree<char> {
        let mut tree = Tree::new(spec.0);
        let root = tree.root();
        for (label, grandchildren) in &spec.1 {
            let child = tree.create(*label);
            tree.insert_child(root, child, None, 0);
            for (g, _) in grandchildren {
                let leaf = tree.create(*g);
                tree.insert_child(child, leaf, None, 0);
            }
        }
        tree
    }

    #[test]
    fn test_identical_trees_have_zero_distance() {
        let t = build(&('f', vec![('d', vec![('a', vec![]), ('c', vec![])]), ('e', vec![])]));
        assert_eq!(edit_distance(&t, t.root(), &t, t.root(), &UnitCost), 0);
    }

    #[test]
    fn test_single_relabel() {
        let a = build(&('f', vec![('a', vec![]), ('b', vec![])]));
        let b = build(&('f', vec![('a', vec![]), ('x', vec![])]));
        assert_eq!(edit_distance(&a, a.root(), &b, b.root(), &UnitCost), 1);
    }

    #[test]
    fn test_classic_example() {
        // f(d(a, c(b)), e) vs f(c(d(a, b)), e): the textbook pair with distance 2
        let mut t1 = Tree::new('f');
        let f = t1.root();
        let d = t1.create('d');
        let a = t1.create('a');
        let c = t1.create('c');
        let b = t1.create('b');
        let e = t1.create('e');
        t1.insert_child(f, d, None, 0);
        t1.insert_child(d, a, None, 0);
        t1.insert_child(d, c, None, 0);
        t1.insert_child(c, b, None, 0);
        t1.insert_child(f, e, None, 0);

        let mut t2 = Tree::new('f');
        let f2 = t2.root();
        let c2 = t2.create('c');
        let d2 = t2.create('d');
        let a2 = t2.create('a');
        let b2 = t2.create('b');
        let e2 = t2.create('e');
        t2.insert_child(f2, c2, None, 0);
        t2.insert_child(c2, d2, None, 0);
        t2.insert_child(d2, a2, None, 0);
        t2.insert_child(d2, b2, None, 0);
        t2.insert_child(f2, e2, None, 0);

        assert_eq!(edit_distance(&t1, f, &t2, f2, &UnitCost), 2);
    }

    #[test]
    fn test_insertions_count_each_node() {
        let small = Tree::new('r');
        let big = build(&('r', vec![('a', vec![('b', vec![])]), ('c', vec![])]));
        assert_eq!(
            edit_distance(&small, small.root(), &big, big.root(), &UnitCost),
            3
        );
    }
}
