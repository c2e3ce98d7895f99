//! Graph algorithms shared by the control-flow and interval analyses.

mod dominators;
mod scc;
mod traversal;

pub use dominators::{compute_dominators, DominatorTree};
pub use scc::{strongly_connected_components, Scc};
pub use traversal::{postorder, reverse_postorder};
