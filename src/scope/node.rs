//! Scope-node payloads.

use crate::scope::ScopeId;
use crate::vma::{Vma, VmaIntervalSet};
use std::fmt;

/// A closed source-line extent.
///
/// Either both ends are zero (no source correspondence) or both are valid
/// 1-based lines with `begin <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    begin: u32,
    end: u32,
}

impl LineRange {
    /// The empty extent: no source correspondence.
    #[must_use]
    pub const fn empty() -> Self {
        LineRange { begin: 0, end: 0 }
    }

    /// Creates an extent covering `[begin, end]`.
    ///
    /// # Panics
    ///
    /// Panics if exactly one end is zero, or if `begin > end`.
    #[must_use]
    pub fn new(begin: u32, end: u32) -> Self {
        assert_eq!(
            begin == 0,
            end == 0,
            "line range ends must be both zero or both valid: [{begin},{end}]"
        );
        assert!(begin <= end, "inverted line range [{begin},{end}]");
        LineRange { begin, end }
    }

    /// Creates a single-line extent, or the empty extent for line 0.
    #[must_use]
    pub fn single(line: u32) -> Self {
        LineRange {
            begin: line,
            end: line,
        }
    }

    /// Returns the first line, 0 if empty.
    #[must_use]
    pub fn begin(&self) -> u32 {
        self.begin
    }

    /// Returns the last line, 0 if empty.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Returns `true` if the extent carries valid lines.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.begin != 0
    }

    /// Returns `true` if `line` falls within the extent. The empty extent
    /// contains nothing.
    #[must_use]
    pub fn contains(&self, line: u32) -> bool {
        self.is_valid() && self.begin <= line && line <= self.end
    }

    /// Widens this extent to also cover `other`. Widening by the empty
    /// extent is a no-op; widening the empty extent adopts `other`.
    pub fn widen(&mut self, other: LineRange) {
        if !other.is_valid() {
            return;
        }
        if !self.is_valid() {
            *self = other;
        } else {
            self.begin = self.begin.min(other.begin);
            self.end = self.end.max(other.end);
        }
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.begin, self.end)
    }
}

/// Kind tag plus kind-specific payload of a scope node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// The singular tree root.
    Root,
    /// One analyzed binary.
    LoadModule {
        /// Load-module path or name.
        name: String,
    },
    /// One source file, possibly a synthesized orphan-file placeholder.
    File {
        /// File path, or a sentinel for unresolvable files.
        name: String,
        /// `true` for placeholder files synthesized during relocation.
        synthetic: bool,
    },
    /// One source-level procedure, possibly aggregating several
    /// machine-code bodies.
    Procedure {
        /// Preferred display name.
        name: String,
        /// Linker-level name.
        link_name: String,
        /// `true` when the procedure was synthesized as a relocation
        /// target; its display name carries the `"[relocated]"` prefix.
        relocated: bool,
    },
    /// One recovered loop; identified by its header block address.
    Loop {
        /// Address of the loop header's first instruction.
        header_vma: Vma,
    },
    /// One source line's instructions: a leaf.
    Statement,
}

impl ScopeKind {
    /// Returns `true` for `File`.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, ScopeKind::File { .. })
    }

    /// Returns `true` for `Procedure`.
    #[must_use]
    pub fn is_procedure(&self) -> bool {
        matches!(self, ScopeKind::Procedure { .. })
    }

    /// Returns `true` for `Loop`.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        matches!(self, ScopeKind::Loop { .. })
    }

    /// Returns `true` for `Statement`.
    #[must_use]
    pub fn is_statement(&self) -> bool {
        matches!(self, ScopeKind::Statement)
    }

    /// Returns the node's name, for the kinds that carry one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            ScopeKind::LoadModule { name }
            | ScopeKind::File { name, .. }
            | ScopeKind::Procedure { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// One node of the scope tree.
#[derive(Debug, Clone)]
pub struct ScopeNode {
    /// Kind tag and payload.
    pub kind: ScopeKind,
    /// Source-line extent.
    pub lines: LineRange,
    /// Machine-code footprint.
    pub vmas: VmaIntervalSet,
    pub(crate) parent: Option<ScopeId>,
    pub(crate) children: Vec<ScopeId>,
    pub(crate) live: bool,
}

impl ScopeNode {
    pub(crate) fn new(kind: ScopeKind, lines: LineRange) -> Self {
        ScopeNode {
            kind,
            lines,
            vmas: VmaIntervalSet::new(),
            parent: None,
            children: Vec::new(),
            live: true,
        }
    }
}
