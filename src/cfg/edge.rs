//! CFG edge payloads.

use strum::Display;

/// How control reaches the target block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CfgEdgeKind {
    /// Sequential execution into the next block.
    FallThrough,
    /// Unconditional jump.
    Unconditional,
    /// Conditional branch, taken path.
    ConditionalTaken,
    /// Conditional branch, untaken path.
    ConditionalFall,
}

/// Edge payload: transfer kind plus a dominance-derived back-edge marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfgEdge {
    /// How control transfers along this edge.
    pub kind: CfgEdgeKind,
    /// `true` if the target dominates the source (loop-closing edge).
    pub back: bool,
}

impl CfgEdge {
    /// Creates an edge with the back-edge marking unset; markings are filled
    /// in after dominator construction.
    #[must_use]
    pub fn new(kind: CfgEdgeKind) -> Self {
        CfgEdge { kind, back: false }
    }
}
