//! Tarjan's strongly connected components.

use crate::graph::{NodeId, Successors};

/// One strongly connected component: the member nodes in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scc {
    /// Nodes belonging to the component.
    pub nodes: Vec<NodeId>,
    /// Whether the component contains a cycle: more than one node, or a
    /// single node with a self edge.
    pub cyclic: bool,
}

struct TarjanState {
    index: Vec<usize>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<NodeId>,
    next_index: usize,
}

const UNVISITED: usize = usize::MAX;

/// Computes the strongly connected components reachable from `roots`,
/// returned in topological order (a component precedes the components its
/// edges lead into).
///
/// Roots are explored in the given order; nodes not reachable from any root
/// do not appear in the result.
#[must_use]
pub fn strongly_connected_components<G: Successors>(graph: &G, roots: &[NodeId]) -> Vec<Scc> {
    let n = graph.node_count();
    let mut state = TarjanState {
        index: vec![UNVISITED; n],
        lowlink: vec![UNVISITED; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        next_index: 0,
    };
    let mut components = Vec::new();

    for &root in roots {
        if state.index[root.index()] == UNVISITED {
            visit(graph, root, &mut state, &mut components);
        }
    }

    // Tarjan emits components in reverse topological order.
    components.reverse();
    components
}

fn visit<G: Successors>(
    graph: &G,
    start: NodeId,
    state: &mut TarjanState,
    components: &mut Vec<Scc>,
) {
    // Iterative DFS; each frame carries its successor list and a cursor.
    let mut frames: Vec<(NodeId, Vec<NodeId>, usize)> = Vec::new();

    state.index[start.index()] = state.next_index;
    state.lowlink[start.index()] = state.next_index;
    state.next_index += 1;
    state.stack.push(start);
    state.on_stack[start.index()] = true;
    frames.push((start, graph.successors(start).collect(), 0));

    while let Some(&mut (node, ref succs, ref mut cursor)) = frames.last_mut() {
        if let Some(&succ) = succs.get(*cursor) {
            *cursor += 1;
            if state.index[succ.index()] == UNVISITED {
                state.index[succ.index()] = state.next_index;
                state.lowlink[succ.index()] = state.next_index;
                state.next_index += 1;
                state.stack.push(succ);
                state.on_stack[succ.index()] = true;
                frames.push((succ, graph.successors(succ).collect(), 0));
            } else if state.on_stack[succ.index()] {
                state.lowlink[node.index()] =
                    state.lowlink[node.index()].min(state.index[succ.index()]);
            }
        } else {
            frames.pop();
            if let Some(&(parent, _, _)) = frames.last() {
                state.lowlink[parent.index()] =
                    state.lowlink[parent.index()].min(state.lowlink[node.index()]);
            }
            if state.lowlink[node.index()] == state.index[node.index()] {
                let mut nodes = Vec::new();
                loop {
                    let member = state.stack.pop().expect("scc stack underflow");
                    state.on_stack[member.index()] = false;
                    nodes.push(member);
                    if member == node {
                        break;
                    }
                }
                nodes.reverse();
                let cyclic = nodes.len() > 1
                    || graph.successors(node).any(|s| s == node);
                components.push(Scc { nodes, cyclic });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DirectedGraph;

    fn graph(n: usize, edges: &[(usize, usize)]) -> DirectedGraph<(), ()> {
        let mut g = DirectedGraph::new();
        let ids: Vec<_> = (0..n).map(|_| g.add_node(())).collect();
        for &(a, b) in edges {
            g.add_edge(ids[a], ids[b], ()).unwrap();
        }
        g
    }

    #[test]
    fn acyclic_chain() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let sccs = strongly_connected_components(&g, &[NodeId::new(0)]);
        assert_eq!(sccs.len(), 3);
        assert!(sccs.iter().all(|s| !s.cyclic && s.nodes.len() == 1));
        // Topological order: sources first.
        assert_eq!(sccs[0].nodes, vec![NodeId::new(0)]);
        assert_eq!(sccs[2].nodes, vec![NodeId::new(2)]);
    }

    #[test]
    fn simple_cycle() {
        // 0 -> 1 <-> 2, 2 -> 3
        let g = graph(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        let sccs = strongly_connected_components(&g, &[NodeId::new(0)]);
        assert_eq!(sccs.len(), 3);
        assert_eq!(sccs[0].nodes, vec![NodeId::new(0)]);
        assert!(sccs[1].cyclic);
        assert_eq!(sccs[1].nodes.len(), 2);
        assert_eq!(sccs[2].nodes, vec![NodeId::new(3)]);
    }

    #[test]
    fn self_loop_is_cyclic() {
        let g = graph(2, &[(0, 0), (0, 1)]);
        let sccs = strongly_connected_components(&g, &[NodeId::new(0)]);
        assert!(sccs[0].cyclic);
        assert_eq!(sccs[0].nodes, vec![NodeId::new(0)]);
        assert!(!sccs[1].cyclic);
    }

    #[test]
    fn multiple_roots_cover_disconnected_parts() {
        let g = graph(4, &[(0, 1), (2, 3)]);
        let sccs =
            strongly_connected_components(&g, &[NodeId::new(0), NodeId::new(2)]);
        assert_eq!(sccs.len(), 4);
    }

    #[test]
    fn unreached_nodes_absent() {
        let g = graph(3, &[(0, 1)]);
        let sccs = strongly_connected_components(&g, &[NodeId::new(0)]);
        let members: Vec<_> = sccs.iter().flat_map(|s| s.nodes.clone()).collect();
        assert!(!members.contains(&NodeId::new(2)));
    }
}
