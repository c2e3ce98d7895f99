//! Dominator-tree construction.
//!
//! Uses the iterative data-flow formulation of Cooper, Harvey and Kennedy,
//! which converges quickly on the shallow reducible graphs control-flow
//! analysis produces while remaining correct on irreducible ones.

use crate::graph::{NodeId, Predecessors, Successors};

/// Dominance relation over the nodes reachable from a graph's entry.
///
/// Built once per control-flow graph by [`compute_dominators`]; the tree is
/// the backbone of back-edge detection (`head` dominating `tail` marks the
/// edge `tail -> head` as a loop-closing edge).
pub struct DominatorTree {
    entry: NodeId,
    /// Immediate dominator per node index; `None` for the entry and for
    /// unreachable nodes.
    idom: Vec<Option<NodeId>>,
    /// Distance from the entry along the dominator tree; `usize::MAX` marks
    /// unreachable nodes.
    depth: Vec<usize>,
    children: Vec<Vec<NodeId>>,
}

impl DominatorTree {
    /// Returns the entry node the tree is rooted at.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the immediate dominator of `node`, or `None` for the entry
    /// and for unreachable nodes.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns `true` if `a` dominates `b` (every path from the entry to `b`
    /// passes through `a`). Every reachable node dominates itself.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.immediate_dominator(cur) {
                Some(up) => cur = up,
                None => return false,
            }
        }
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns an iterator walking from `node` up to the entry, starting at
    /// `node` itself.
    pub fn dominators(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.is_reachable(node).then_some(node);
        std::iter::successors(start, |&n| self.immediate_dominator(n))
    }

    /// Returns the depth of `node` in the dominator tree (the entry has
    /// depth 0), or `None` for unreachable nodes.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> Option<usize> {
        match self.depth.get(node.index()) {
            Some(&d) if d != usize::MAX => Some(d),
            _ => None,
        }
    }

    /// Returns the nodes immediately dominated by `node`.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn is_reachable(&self, node: NodeId) -> bool {
        node == self.entry
            || self
                .idom
                .get(node.index())
                .is_some_and(|idom| idom.is_some())
    }
}

/// Computes the dominator tree of the nodes reachable from `entry`.
#[must_use]
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let rpo = super::reverse_postorder(graph, entry);
    let mut rpo_number = vec![usize::MAX; graph.node_count()];
    for (i, &node) in rpo.iter().enumerate() {
        rpo_number[node.index()] = i;
    }

    // idom in RPO-number space; the entry points at itself while iterating.
    let mut idom = vec![usize::MAX; rpo.len()];
    idom[0] = 0;

    let intersect = |idom: &[usize], mut a: usize, mut b: usize| {
        while a != b {
            while a > b {
                a = idom[a];
            }
            while b > a {
                b = idom[b];
            }
        }
        a
    };

    let mut changed = true;
    while changed {
        changed = false;
        for (i, &node) in rpo.iter().enumerate().skip(1) {
            let mut new_idom = usize::MAX;
            for pred in graph.predecessors(node) {
                let p = rpo_number[pred.index()];
                if p == usize::MAX || idom[p] == usize::MAX {
                    continue;
                }
                new_idom = if new_idom == usize::MAX {
                    p
                } else {
                    intersect(&idom, new_idom, p)
                };
            }
            if new_idom != usize::MAX && idom[i] != new_idom {
                idom[i] = new_idom;
                changed = true;
            }
        }
    }

    let mut idom_by_node = vec![None; graph.node_count()];
    let mut depth = vec![usize::MAX; graph.node_count()];
    let mut children = vec![Vec::new(); graph.node_count()];
    depth[entry.index()] = 0;
    // RPO guarantees a node's idom is finalized before the node itself.
    for (i, &node) in rpo.iter().enumerate().skip(1) {
        let parent = rpo[idom[i]];
        idom_by_node[node.index()] = Some(parent);
        depth[node.index()] = depth[parent.index()] + 1;
        children[parent.index()].push(node);
    }

    DominatorTree {
        entry,
        idom: idom_by_node,
        depth,
        children,
    }
}
