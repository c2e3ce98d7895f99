//! Instruction and procedure records produced by the decode front end.

use crate::vma::Vma;
use strum::{Display, EnumIter};

/// Control-transfer behavior of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BranchKind {
    /// No control transfer; execution falls through.
    None,
    /// Conditional branch with a PC-relative target.
    CondRelative,
    /// Unconditional jump with a PC-relative target.
    UncondRelative,
    /// Conditional branch through a register or memory operand.
    CondIndirect,
    /// Unconditional jump through a register or memory operand.
    UncondIndirect,
    /// Return to caller.
    Return,
}

impl BranchKind {
    /// Returns `true` for any kind other than [`BranchKind::None`].
    #[must_use]
    pub fn is_branch(self) -> bool {
        self != BranchKind::None
    }

    /// Returns `true` for conditional transfers, direct or indirect.
    #[must_use]
    pub fn is_conditional(self) -> bool {
        matches!(self, BranchKind::CondRelative | BranchKind::CondIndirect)
    }

    /// Returns `true` for unconditional jumps, direct or indirect.
    #[must_use]
    pub fn is_unconditional(self) -> bool {
        matches!(self, BranchKind::UncondRelative | BranchKind::UncondIndirect)
    }
}

/// A single decoded machine instruction.
///
/// VLIW bundles decode into several `Instruction` values sharing one `vma`
/// and distinguished by `op_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Virtual address of the instruction (of the bundle, for VLIW).
    pub vma: Vma,
    /// Position within a VLIW bundle; 0 for scalar ISAs.
    pub op_index: u16,
    /// Encoded size in bytes.
    pub size: u32,
    /// Control-transfer classification.
    pub branch: BranchKind,
    /// Branch target address, when statically known.
    pub target: Option<Vma>,
    /// Number of architectural delay slots following this instruction.
    pub delay_slots: u8,
}

impl Instruction {
    /// Creates a plain non-branching instruction.
    #[must_use]
    pub fn simple(vma: Vma, size: u32) -> Self {
        Instruction {
            vma,
            op_index: 0,
            size,
            branch: BranchKind::None,
            target: None,
            delay_slots: 0,
        }
    }

    /// Creates a branching instruction with a known target.
    #[must_use]
    pub fn branch(vma: Vma, size: u32, kind: BranchKind, target: Vma) -> Self {
        Instruction {
            vma,
            op_index: 0,
            size,
            branch: kind,
            target: Some(target),
            delay_slots: 0,
        }
    }

    /// Creates a return instruction.
    #[must_use]
    pub fn ret(vma: Vma, size: u32) -> Self {
        Instruction {
            vma,
            op_index: 0,
            size,
            branch: BranchKind::Return,
            target: None,
            delay_slots: 0,
        }
    }

    /// Returns the address one past the end of this instruction.
    #[must_use]
    pub fn end_vma(&self) -> Vma {
        self.vma + Vma::from(self.size)
    }
}

/// Symbol-table metadata for one procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureRecord {
    /// Preferred (demangled) name.
    pub name: String,
    /// Linker-level name; equals `name` when no mangling applies.
    pub link_name: String,
    /// Defining source file, if the debug info records one.
    pub file_name: Option<String>,
    /// First address of the procedure.
    pub begin_vma: Vma,
    /// One past the last address of the procedure.
    pub end_vma: Vma,
    /// Source line of the procedure's first instruction, 0 if unknown.
    pub begin_line: u32,
}

impl ProcedureRecord {
    /// Returns `true` if `vma` lies within the procedure's address range.
    #[must_use]
    pub fn contains(&self, vma: Vma) -> bool {
        self.begin_vma <= vma && vma < self.end_vma
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_kind_predicates() {
        assert!(!BranchKind::None.is_branch());
        assert!(BranchKind::Return.is_branch());
        assert!(BranchKind::CondIndirect.is_conditional());
        assert!(BranchKind::UncondRelative.is_unconditional());
        assert!(!BranchKind::Return.is_conditional());
    }

    #[test]
    fn instruction_end_vma() {
        let i = Instruction::simple(0x1000, 4);
        assert_eq!(i.end_vma(), 0x1004);
    }

    #[test]
    fn procedure_contains_is_half_open() {
        let p = ProcedureRecord {
            name: "main".into(),
            link_name: "main".into(),
            file_name: Some("main.c".into()),
            begin_vma: 0x1000,
            end_vma: 0x1010,
            begin_line: 12,
        };
        assert!(p.contains(0x1000));
        assert!(p.contains(0x100f));
        assert!(!p.contains(0x1010));
    }
}
