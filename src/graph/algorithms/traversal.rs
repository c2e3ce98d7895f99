//! Depth-first traversal orders.

use crate::graph::{NodeId, Successors};

/// Returns the nodes reachable from `entry` in postorder.
///
/// Successors are visited in adjacency order; unreachable nodes do not
/// appear in the result.
#[must_use]
pub fn postorder<G: Successors>(graph: &G, entry: NodeId) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(graph.node_count());
    let mut visited = vec![false; graph.node_count()];
    // Iterative DFS with an explicit successor cursor per frame.
    let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> = Vec::new();
    visited[entry.index()] = true;
    stack.push((entry, graph.successors(entry).collect(), 0));
    while let Some((node, succs, cursor)) = stack.last_mut() {
        if let Some(&next) = succs.get(*cursor) {
            *cursor += 1;
            if !visited[next.index()] {
                visited[next.index()] = true;
                stack.push((next, graph.successors(next).collect(), 0));
            }
        } else {
            order.push(*node);
            stack.pop();
        }
    }
    order
}

/// Returns the nodes reachable from `entry` in reverse postorder.
#[must_use]
pub fn reverse_postorder<G: Successors>(graph: &G, entry: NodeId) -> Vec<NodeId> {
    let mut order = postorder(graph, entry);
    order.reverse();
    order
}
