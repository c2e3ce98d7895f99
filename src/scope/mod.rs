//! The recovered program-structure tree.
//!
//! Scopes form a strict hierarchy: a root owns load modules, which own
//! files, which own procedures, which own loops and statement ranges
//! (loops nest arbitrarily). Nodes live in an arena indexed by [`ScopeId`];
//! parent and child links are arena indices, so unlinking and relinking
//! are constant-time and deleted nodes can never dangle.

mod node;
mod tree;

pub use node::{LineRange, ScopeKind, ScopeNode};
pub use tree::{ScopeId, ScopeTree};
