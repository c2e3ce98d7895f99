//! Generic directed-graph infrastructure.
//!
//! This module provides the graph container and algorithms the control-flow
//! and interval analyses are built on: a [`DirectedGraph`] with typed node and
//! edge payloads, strongly-typed [`NodeId`]/[`EdgeId`] indices, and shared
//! algorithms (traversal orders, dominator trees, Tarjan strongly connected
//! components) that operate over small capability traits rather than the
//! concrete container.
//!
//! # Design
//!
//! Algorithms take `G: Successors` (or `Predecessors`) bounds so they can run
//! over restricted sub-views of a CFG — the interval analyzer re-decomposes
//! loop bodies by filtering edges without copying the graph.

pub mod algorithms;

mod directed;
mod node;

pub use directed::{DirectedGraph, EdgeId};
pub use node::NodeId;

/// Base capability: a finite node set addressable by [`NodeId`].
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node ids, in index order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.node_count()).map(NodeId::new)
    }
}

/// Forward-adjacency capability.
pub trait Successors: GraphBase {
    /// Returns an iterator over the successors of `node`.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_;
}

/// Backward-adjacency capability.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the predecessors of `node`.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_;
}

/// A graph with a distinguished entry node.
pub trait RootedGraph: Successors {
    /// Returns the entry node.
    fn entry(&self) -> NodeId;
}
