//! Control-flow recovery for one machine-code procedure.
//!
//! The [`ProcedureIr`] adapter classifies raw instructions into the small
//! vocabulary the flow analyses understand (simple, jump, two-way branch,
//! return), and [`ControlFlowGraph`] partitions the instruction stream into
//! basic blocks connected by typed edges with back-edge markings derived from
//! dominance.

mod adapter;
mod edge;
mod graph;

pub use adapter::{ProcedureIr, StmtClass};
pub use edge::{CfgEdge, CfgEdgeKind};
pub use graph::{BasicBlock, ControlFlowGraph};
