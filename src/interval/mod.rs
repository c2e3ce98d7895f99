//! Nested strongly-connected-region decomposition.
//!
//! Classifies every CFG block into a tree of regions: `Acyclic` blocks that
//! form no cycle at their nesting level, `Interval` regions (natural loops
//! with a single dominating entry), and `Irreducible` regions (cycles with
//! several entry points). The loop-nest builder walks this tree to create
//! `Loop` scopes.
//!
//! The decomposition is Tarjan-style: compute strongly connected components
//! at the current level, then re-decompose each cyclic component with the
//! edges into its header removed, which exposes the next nesting level.

use crate::cfg::ControlFlowGraph;
use crate::graph::algorithms::strongly_connected_components;
use crate::graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors};
use crate::{Error, Result};
use strum::Display;

/// Classification of one region at its nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ScrKind {
    /// No cycle through this block at this level.
    Acyclic,
    /// Natural loop: a cycle with a single entry block.
    Interval,
    /// Cycle with more than one entry block.
    Irreducible,
}

/// One region of the decomposition.
#[derive(Debug, Clone)]
pub struct ScrNode {
    /// The representative CFG block: the block itself for `Acyclic`, the
    /// loop header for `Interval` and `Irreducible`.
    pub block: NodeId,
    /// Region classification.
    pub kind: ScrKind,
    /// Indices of nested regions, in topological order of the body.
    pub children: Vec<usize>,
}

/// The full region tree of one procedure's CFG.
pub struct ScrTree {
    nodes: Vec<ScrNode>,
    top: Vec<usize>,
}

impl ScrTree {
    /// Returns the region at `index`.
    #[must_use]
    pub fn node(&self, index: usize) -> &ScrNode {
        &self.nodes[index]
    }

    /// Returns the indices of the outermost regions in topological order.
    #[must_use]
    pub fn top(&self) -> &[usize] {
        &self.top
    }

    /// Returns the total number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Sub-view of a CFG restricted to a node subset, with edges into one
/// designated header removed. Cutting the header's incoming edges is what
/// peels one nesting level off a cyclic region.
struct Restricted<'a> {
    cfg: &'a ControlFlowGraph,
    allowed: &'a [bool],
    cut: Option<NodeId>,
}

impl GraphBase for Restricted<'_> {
    fn node_count(&self) -> usize {
        self.cfg.node_count()
    }
}

impl Successors for Restricted<'_> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.cfg
            .successors(node)
            .filter(|&s| self.allowed[s.index()] && Some(s) != self.cut)
    }
}

impl Predecessors for Restricted<'_> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let cut_here = Some(node) == self.cut;
        self.cfg
            .predecessors(node)
            .filter(move |&p| self.allowed[p.index()] && !cut_here)
    }
}

/// Decomposes `cfg` into its nested region tree.
///
/// Every block of the CFG appears exactly once in the tree, including blocks
/// unreachable from the entry (they decompose as regions of their own).
///
/// # Errors
///
/// Returns [`Error::IntervalAnalysis`] if the CFG has no blocks or the
/// decomposition encounters an inconsistent component.
pub fn analyze(cfg: &ControlFlowGraph) -> Result<ScrTree> {
    if cfg.node_count() == 0 {
        return Err(Error::IntervalAnalysis(
            "control-flow graph has no blocks".to_owned(),
        ));
    }
    let allowed = vec![true; cfg.node_count()];
    let entry = RootedGraph::entry(cfg);
    let mut roots = vec![entry];
    roots.extend(cfg.node_ids().filter(|&n| n != entry));

    let mut tree = ScrTree {
        nodes: Vec::new(),
        top: Vec::new(),
    };
    let top = decompose(cfg, &allowed, &roots, None, &mut tree)?;
    tree.top = top;
    Ok(tree)
}

/// Emits the regions of one nesting level and returns their indices in
/// topological order. `skip` names a header block whose trivial component is
/// represented by the enclosing region node rather than re-emitted.
fn decompose(
    cfg: &ControlFlowGraph,
    allowed: &[bool],
    roots: &[NodeId],
    skip: Option<NodeId>,
    tree: &mut ScrTree,
) -> Result<Vec<usize>> {
    let view = Restricted {
        cfg,
        allowed,
        cut: skip,
    };
    let mut emitted = Vec::new();
    for scc in strongly_connected_components(&view, roots) {
        if scc.nodes.is_empty() {
            return Err(Error::IntervalAnalysis(
                "strongly connected component with no members".to_owned(),
            ));
        }
        if !scc.cyclic {
            let block = scc.nodes[0];
            if Some(block) == skip {
                continue;
            }
            emitted.push(push_node(tree, block, ScrKind::Acyclic, Vec::new()));
            continue;
        }

        let mut in_scc = vec![false; cfg.node_count()];
        for &n in &scc.nodes {
            in_scc[n.index()] = true;
        }
        let (header, kind) = pick_header(&view, &scc.nodes, &in_scc);
        let children = decompose(cfg, &in_scc, &[header], Some(header), tree)?;
        emitted.push(push_node(tree, header, kind, children));
    }
    Ok(emitted)
}

fn push_node(tree: &mut ScrTree, block: NodeId, kind: ScrKind, children: Vec<usize>) -> usize {
    tree.nodes.push(ScrNode {
        block,
        kind,
        children,
    });
    tree.nodes.len() - 1
}

/// Chooses the header of a cyclic component and classifies it.
///
/// One entry block makes a natural loop. Several make an irreducible region,
/// whose header is the entry with the most outside predecessors (ties break
/// toward the lowest block id). A component with no outside predecessors at
/// all, such as a loop containing the procedure entry, is headed by its
/// lowest block id.
fn pick_header(view: &Restricted<'_>, members: &[NodeId], in_scc: &[bool]) -> (NodeId, ScrKind) {
    let mut entries: Vec<(NodeId, usize)> = Vec::new();
    for &n in members {
        let outside = view.predecessors(n).filter(|p| !in_scc[p.index()]).count();
        if outside > 0 {
            entries.push((n, outside));
        }
    }
    match entries.len() {
        0 => {
            let header = members.iter().copied().min().expect("nonempty component");
            (header, ScrKind::Interval)
        }
        1 => (entries[0].0, ScrKind::Interval),
        _ => {
            let header = entries
                .iter()
                .copied()
                .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                .map(|(n, _)| n)
                .expect("nonempty entry set");
            (header, ScrKind::Irreducible)
        }
    }
}
