//! Scope-tree normalization.
//!
//! Four independent passes run in a fixed order: canonical-path file
//! filtering (only when a search path is configured), duplicate-statement
//! coalescing, perfect-nested-loop fusion, and empty-scope pruning. Each
//! pass reports whether it changed the tree; a normalized tree is a fixed
//! point, so running the pipeline again reports no changes.

mod coalesce;
mod filter;
mod fusion;
mod prune;

pub use coalesce::coalesce_duplicate_statements;
pub use filter::filter_files;
pub use fusion::fuse_perfect_loop_nests;
pub use prune::prune_empty_scopes;

use crate::scope::ScopeTree;
use crate::structure::StructureConfig;

/// Runs the full normalization pipeline over `tree`. Returns `true` if any
/// pass changed the tree.
pub fn normalize(tree: &mut ScopeTree, config: &StructureConfig) -> bool {
    let mut changed = false;
    if let Some(paths) = &config.path_filter {
        changed |= filter_files(tree, paths);
    }
    changed |= coalesce_duplicate_statements(tree, config.unsafe_normalization);
    changed |= fuse_perfect_loop_nests(tree);
    changed |= prune_empty_scopes(tree);
    changed
}
