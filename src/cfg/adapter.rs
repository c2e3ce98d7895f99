//! Instruction-stream adapter consumed by CFG construction.

use crate::binutils::{BranchKind, Instruction, ProcedureRecord};
use crate::vma::Vma;
use std::collections::HashSet;
use strum::Display;

/// Flow-relevant classification of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StmtClass {
    /// Falls through to the next instruction.
    Simple,
    /// Unconditional jump to a known address inside the procedure.
    UnconditionalJump,
    /// Conditional branch to a known address inside the procedure, with
    /// fall-through on the untaken path.
    TwoWayConditional,
    /// Return to caller.
    Return,
}

/// Flow view of one procedure's instruction stream.
///
/// Construction scans the stream once to collect the branch-target set: the
/// addresses some relative branch in the procedure jumps to. Classification
/// demotes anything the flow analyses cannot use as a loop-forming edge:
/// branches whose target lies outside the procedure, and indirect branches
/// whose target is not statically known, both classify as
/// [`StmtClass::Simple`].
pub struct ProcedureIr {
    record: ProcedureRecord,
    instructions: Vec<Instruction>,
    branch_targets: HashSet<Vma>,
}

impl ProcedureIr {
    /// Wraps a procedure's decoded instruction stream.
    ///
    /// Instructions must be in program order.
    #[must_use]
    pub fn new(record: ProcedureRecord, instructions: Vec<Instruction>) -> Self {
        let branch_targets = instructions
            .iter()
            .filter(|i| {
                matches!(
                    i.branch,
                    BranchKind::CondRelative | BranchKind::UncondRelative
                )
            })
            .filter_map(|i| i.target)
            .collect();
        ProcedureIr {
            record,
            instructions,
            branch_targets,
        }
    }

    /// Returns the procedure metadata.
    #[must_use]
    pub fn record(&self) -> &ProcedureRecord {
        &self.record
    }

    /// Returns the instruction stream in program order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Classifies the instruction at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn classify(&self, index: usize) -> StmtClass {
        let instr = &self.instructions[index];
        match instr.branch {
            BranchKind::Return => StmtClass::Return,
            BranchKind::UncondRelative if self.target_inside(instr) => {
                StmtClass::UnconditionalJump
            }
            BranchKind::CondRelative if self.target_inside(instr) => {
                StmtClass::TwoWayConditional
            }
            _ => StmtClass::Simple,
        }
    }

    /// Returns the instruction's own address if it is a recorded branch
    /// target, else `None`. Block leaders are discovered through this.
    #[must_use]
    pub fn label(&self, index: usize) -> Option<Vma> {
        let vma = self.instructions[index].vma;
        self.branch_targets.contains(&vma).then_some(vma)
    }

    /// Returns the resolved target of a relative branch; 0 for indirect
    /// branches, whose targets are not statically known.
    #[must_use]
    pub fn target_label(&self, index: usize) -> Vma {
        self.instructions[index].target.unwrap_or(0)
    }

    /// Returns the number of delay-slot instructions trailing the
    /// instruction at `index`.
    #[must_use]
    pub fn delay_slot_count(&self, index: usize) -> u8 {
        self.instructions[index].delay_slots
    }

    /// Multi-way branch targets. Binary-only input carries no jump-table
    /// metadata, so reaching this is a caller bug.
    pub fn multiway_targets(&self, _index: usize) -> ! {
        unimplemented!("multi-way branch queries are not supported on binary-only input")
    }

    /// Operand use/def sets. Not recoverable from a bare instruction stream,
    /// so reaching this is a caller bug.
    pub fn operand_uses(&self, _index: usize) -> ! {
        unimplemented!("use/def queries are not supported on binary-only input")
    }

    fn target_inside(&self, instr: &Instruction) -> bool {
        instr.target.is_some_and(|t| self.record.contains(t))
    }
}
