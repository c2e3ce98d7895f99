//! Loop-nest recovery: from instruction streams to a raw scope tree.
//!
//! [`StructureBuilder`] drives the whole front half of the pipeline for one
//! load module: CFG construction, interval analysis, loop creation with
//! header-line discovery, and statement placement with alien-code
//! relocation. The tree it produces is deliberately raw (duplicated
//! statements, unfused nests); [`crate::normalize`] cleans it up.

mod builder;
mod config;
mod linemap;

pub use builder::StructureBuilder;
pub use config::StructureConfig;
pub use linemap::{
    classify_placement, mark_relocated, strip_relocated, unknown_file_name, Placement,
    UNKNOWN_PROC,
};

use crate::binutils::{Instruction, ProcedureRecord, SourceResolver};
use crate::scope::ScopeTree;
use crate::Result;

/// Builds the scope tree of one load module and, when configured, runs the
/// normalization pipeline over it.
///
/// # Errors
///
/// Fails if any procedure has an empty instruction stream or its interval
/// analysis fails.
pub fn build_and_normalize<R: SourceResolver>(
    config: &StructureConfig,
    resolver: &R,
    load_module: &str,
    procedures: &[(ProcedureRecord, Vec<Instruction>)],
) -> Result<ScopeTree> {
    let mut tree = ScopeTree::new();
    let builder = StructureBuilder::new(config, resolver);
    builder.build_load_module(&mut tree, load_module, procedures)?;
    if config.normalize {
        crate::normalize::normalize(&mut tree, config);
    }
    Ok(tree)
}
