//! # binscope Prelude
//!
//! Convenient re-exports of the types most analyses need. Import this
//! module to get quick access to structure recovery without spelling out
//! the full module paths.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all binscope operations
pub use crate::Error;

/// The result type used throughout binscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// One-call build-and-normalize pipeline for a load module
pub use crate::structure::build_and_normalize;

/// Structure recovery driver and its configuration
pub use crate::structure::{StructureBuilder, StructureConfig};

/// The normalization pipeline and its individual passes
pub use crate::normalize::{
    coalesce_duplicate_statements, filter_files, fuse_perfect_loop_nests, normalize,
    prune_empty_scopes,
};

// ================================================================================================
// Input Model
// ================================================================================================

/// Decoded instructions and procedure metadata
pub use crate::binutils::{BranchKind, Instruction, ProcedureRecord};

/// Address-to-source mapping
pub use crate::binutils::{MapResolver, SourceInfo, SourceResolver};

// ================================================================================================
// Control Flow and Intervals
// ================================================================================================

/// Control-flow graph construction
pub use crate::cfg::{BasicBlock, CfgEdge, CfgEdgeKind, ControlFlowGraph, ProcedureIr, StmtClass};

/// Nested strongly-connected-region decomposition
pub use crate::interval::{analyze, ScrKind, ScrNode, ScrTree};

// ================================================================================================
// The Scope Tree
// ================================================================================================

/// Scope-tree arena, node kinds, and line extents
pub use crate::scope::{LineRange, ScopeId, ScopeKind, ScopeNode, ScopeTree};

/// Address intervals and interval sets
pub use crate::vma::{Vma, VmaInterval, VmaIntervalSet};
