//! Decoded-binary input model.
//!
//! Structure recovery does not decode machine code itself; it consumes the
//! output of a disassembler and a line-table reader through the types in this
//! module: [`Instruction`] streams per procedure, [`ProcedureRecord`] symbol
//! metadata, and a [`SourceResolver`] that maps virtual addresses back to
//! `procedure / file / line` triples.

mod instruction;
mod resolver;

pub use instruction::{BranchKind, Instruction, ProcedureRecord};
pub use resolver::{MapResolver, SourceInfo, SourceResolver};
