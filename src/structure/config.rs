//! Structure-recovery configuration.

use std::path::PathBuf;

/// Semantic options consumed by structure recovery and normalization.
///
/// Flag syntax and argument parsing live with the caller; this type carries
/// only the decisions.
#[derive(Debug, Clone)]
pub struct StructureConfig {
    /// Run the normalization passes at all.
    pub normalize: bool,
    /// Enable cross-loop duplicate merging during coalescing. Merging across
    /// loop boundaries can misattribute code, hence opt-in.
    pub unsafe_normalization: bool,
    /// Treat irreducible regions as loops. When `false`, irreducible regions
    /// are transparent and only genuine nested natural loops inside them
    /// produce scopes.
    pub irreducible_is_loop: bool,
    /// Search path for canonical-path file filtering; `None` skips the
    /// filtering pass entirely.
    pub path_filter: Option<Vec<PathBuf>>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        StructureConfig {
            normalize: true,
            unsafe_normalization: false,
            irreducible_is_loop: false,
            path_filter: None,
        }
    }
}
