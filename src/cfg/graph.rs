//! Basic-block partitioning and CFG assembly.

use crate::binutils::Instruction;
use crate::cfg::{CfgEdge, CfgEdgeKind, ProcedureIr, StmtClass};
use crate::graph::algorithms::{compute_dominators, DominatorTree};
use crate::graph::{DirectedGraph, EdgeId, GraphBase, NodeId, Predecessors, RootedGraph, Successors};
use crate::vma::Vma;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

/// A maximal straight-line run of instructions.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Returns the block's instructions in program order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns the first instruction.
    #[must_use]
    pub fn first_instruction(&self) -> &Instruction {
        &self.instructions[0]
    }

    /// Returns the last instruction.
    #[must_use]
    pub fn last_instruction(&self) -> &Instruction {
        self.instructions.last().expect("block is never empty")
    }

    /// Returns the address of the block's first instruction.
    #[must_use]
    pub fn begin_vma(&self) -> Vma {
        self.first_instruction().vma
    }

    /// Returns the address one past the block's last instruction.
    #[must_use]
    pub fn end_vma(&self) -> Vma {
        self.last_instruction().end_vma()
    }
}

/// The control-flow graph of one procedure.
///
/// Blocks are split at branch targets and after control-transfer
/// instructions (delay slots stay with their branch's block). Edges carry a
/// [`CfgEdge`] payload whose back-edge marking is derived from dominance at
/// construction time.
pub struct ControlFlowGraph {
    graph: DirectedGraph<BasicBlock, CfgEdge>,
    entry: NodeId,
    dominators: OnceLock<DominatorTree>,
}

impl ControlFlowGraph {
    /// Builds the CFG of `ir`'s procedure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if the procedure has no instructions.
    pub fn from_procedure(ir: &ProcedureIr) -> Result<Self> {
        let instrs = ir.instructions();
        if instrs.is_empty() {
            return Err(Error::Empty);
        }

        // Leaders: the first instruction, every branch target, and the
        // instruction following a control transfer and its delay slots.
        let mut leader = vec![false; instrs.len()];
        leader[0] = true;
        for i in 0..instrs.len() {
            if ir.label(i).is_some() {
                leader[i] = true;
            }
            if ir.classify(i) != StmtClass::Simple {
                let next = i + 1 + usize::from(ir.delay_slot_count(i));
                if next < instrs.len() {
                    leader[next] = true;
                }
            }
        }

        let mut graph: DirectedGraph<BasicBlock, CfgEdge> = DirectedGraph::new();
        let mut block_of_vma: HashMap<Vma, NodeId> = HashMap::new();
        let mut block_ranges: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;
        for i in 1..=instrs.len() {
            if i == instrs.len() || leader[i] {
                let id = graph.add_node(BasicBlock {
                    instructions: instrs[start..i].to_vec(),
                });
                for instr in &instrs[start..i] {
                    block_of_vma.entry(instr.vma).or_insert(id);
                }
                block_ranges.push((start, i));
                start = i;
            }
        }

        for (b, &(lo, hi)) in block_ranges.iter().enumerate() {
            let node = NodeId::new(b);
            let next = (b + 1 < block_ranges.len()).then(|| NodeId::new(b + 1));
            // The transfer instruction precedes any delay slots.
            let control = (lo..hi)
                .rev()
                .find(|&i| ir.classify(i) != StmtClass::Simple);
            match control.map(|i| (i, ir.classify(i))) {
                Some((_, StmtClass::Return)) => {}
                Some((i, StmtClass::UnconditionalJump)) => {
                    if let Some(&target) = block_of_vma.get(&ir.target_label(i)) {
                        graph.add_edge(node, target, CfgEdge::new(CfgEdgeKind::Unconditional))?;
                    }
                }
                Some((i, StmtClass::TwoWayConditional)) => {
                    if let Some(&target) = block_of_vma.get(&ir.target_label(i)) {
                        graph.add_edge(
                            node,
                            target,
                            CfgEdge::new(CfgEdgeKind::ConditionalTaken),
                        )?;
                    }
                    if let Some(next) = next {
                        graph.add_edge(node, next, CfgEdge::new(CfgEdgeKind::ConditionalFall))?;
                    }
                }
                _ => {
                    if let Some(next) = next {
                        graph.add_edge(node, next, CfgEdge::new(CfgEdgeKind::FallThrough))?;
                    }
                }
            }
        }

        let entry = NodeId::new(0);
        let tree = compute_dominators(&graph, entry);
        for e in 0..graph.edge_count() {
            let id = EdgeId::new(e);
            if let Some((source, target)) = graph.edge_endpoints(id) {
                if tree.dominates(target, source) {
                    if let Some(edge) = graph.edge_mut(id) {
                        edge.back = true;
                    }
                }
            }
        }

        let dominators = OnceLock::new();
        let _ = dominators.set(tree);
        Ok(ControlFlowGraph {
            graph,
            entry,
            dominators,
        })
    }

    /// Returns the entry block.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the block payload for `node`.
    #[must_use]
    pub fn block(&self, node: NodeId) -> Option<&BasicBlock> {
        self.graph.node(node)
    }

    /// Returns the dominator tree, computed lazily on first use.
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators
            .get_or_init(|| compute_dominators(&self.graph, self.entry))
    }

    /// Returns the edge payload for `edge`.
    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Option<&CfgEdge> {
        self.graph.edge(edge)
    }

    /// Returns the `(source, target)` endpoints of `edge`.
    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.graph.edge_endpoints(edge)
    }

    /// Returns the ids of edges entering `node`.
    pub fn incoming_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.graph.incoming_edges(node)
    }

    /// Returns the ids of edges leaving `node`.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.graph.outgoing_edges(node)
    }

    /// Returns the blocks with no successors (returns and stream tails).
    #[must_use]
    pub fn exits(&self) -> Vec<NodeId> {
        self.graph
            .node_ids()
            .filter(|&n| self.graph.successors(n).next().is_none())
            .collect()
    }
}

impl GraphBase for ControlFlowGraph {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

impl Successors for ControlFlowGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.successors(node)
    }
}

impl Predecessors for ControlFlowGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.predecessors(node)
    }
}

impl RootedGraph for ControlFlowGraph {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binutils::{BranchKind, ProcedureRecord};

    fn record(begin: Vma, end: Vma) -> ProcedureRecord {
        ProcedureRecord {
            name: "f".into(),
            link_name: "f".into(),
            file_name: None,
            begin_vma: begin,
            end_vma: end,
            begin_line: 1,
        }
    }

    /// 0x1000 cmp/branch to 0x100c, fall to 0x1008, join at 0x100c, ret.
    fn diamondish() -> ProcedureIr {
        ProcedureIr::new(
            record(0x1000, 0x1010),
            vec![
                Instruction::branch(0x1000, 4, BranchKind::CondRelative, 0x100c),
                Instruction::simple(0x1004, 4),
                Instruction::simple(0x1008, 4),
                Instruction::ret(0x100c, 4),
            ],
        )
    }

    #[test]
    fn splits_at_targets_and_branches() {
        let cfg = ControlFlowGraph::from_procedure(&diamondish()).unwrap();
        assert_eq!(cfg.node_count(), 3);
        let entry = cfg.entry();
        assert_eq!(cfg.block(entry).unwrap().begin_vma(), 0x1000);
        assert_eq!(cfg.successors(entry).count(), 2);
        assert_eq!(cfg.exits().len(), 1);
    }

    #[test]
    fn empty_stream_rejected() {
        let ir = ProcedureIr::new(record(0x1000, 0x1000), vec![]);
        assert!(matches!(
            ControlFlowGraph::from_procedure(&ir),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn back_edge_marked_by_dominance() {
        // 0x1000 entry; loop body at 0x1004 branches back to itself.
        let ir = ProcedureIr::new(
            record(0x1000, 0x1010),
            vec![
                Instruction::simple(0x1000, 4),
                Instruction::simple(0x1004, 4),
                Instruction::branch(0x1008, 4, BranchKind::CondRelative, 0x1004),
                Instruction::ret(0x100c, 4),
            ],
        );
        let cfg = ControlFlowGraph::from_procedure(&ir).unwrap();
        let mut back = 0;
        let mut forward = 0;
        for n in cfg.node_ids() {
            for e in cfg.incoming_edges(n) {
                if cfg.edge(e).unwrap().back {
                    back += 1;
                } else {
                    forward += 1;
                }
            }
        }
        assert_eq!(back, 1);
        assert!(forward >= 2);
    }

    #[test]
    fn delay_slots_stay_with_branch() {
        let mut branch = Instruction::branch(0x1004, 4, BranchKind::UncondRelative, 0x1000);
        branch.delay_slots = 1;
        let ir = ProcedureIr::new(
            record(0x1000, 0x1010),
            vec![
                Instruction::simple(0x1000, 4),
                branch,
                Instruction::simple(0x1008, 4),
                Instruction::ret(0x100c, 4),
            ],
        );
        let cfg = ControlFlowGraph::from_procedure(&ir).unwrap();
        // The delay slot at 0x1008 closes the branch's block.
        let entry = cfg.entry();
        assert_eq!(cfg.block(entry).unwrap().end_vma(), 0x100c);
    }
}
