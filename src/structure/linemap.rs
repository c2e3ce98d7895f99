//! File/procedure classification for alien-code relocation.
//!
//! Debug info frequently attributes instructions to a file or procedure
//! other than the one they were emitted into (inlining, cloned bodies).
//! [`classify_placement`] decides whether a candidate attribution may stay
//! under its proposed enclosing procedure or must be exiled elsewhere.

use crate::binutils::SourceInfo;
use crate::scope::{ScopeId, ScopeKind, ScopeTree};

/// Textual marker prefixed to the names of relocation-target procedures.
pub(crate) const RELOCATED_PREFIX: &str = "[relocated]";

/// Placeholder name for code whose procedure cannot be resolved.
pub const UNKNOWN_PROC: &str = "<unknown-proc>";

/// Returns the load-module-scoped placeholder name for code whose source
/// file cannot be resolved.
#[must_use]
pub fn unknown_file_name(load_module: &str) -> String {
    format!("{load_module}:<unknown-file>")
}

/// Strips any number of leading `"[relocated]"` markers from a procedure
/// name, recovering the base name used for comparisons.
#[must_use]
pub fn strip_relocated(name: &str) -> &str {
    let mut base = name;
    while let Some(rest) = base.strip_prefix(RELOCATED_PREFIX) {
        base = rest.trim_start();
    }
    base
}

/// Prefixes a procedure name with the `"[relocated]"` marker.
#[must_use]
pub fn mark_relocated(name: &str) -> String {
    format!("{RELOCATED_PREFIX} {name}")
}

/// Where a candidate attribution belongs relative to its proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The code stays under the proposed procedure.
    Amnesty,
    /// The code moves to a different procedure in the same file.
    ExileToProc,
    /// The code moves to a different file entirely.
    ExileToFileProc,
}

/// Classifies a candidate `(file, procedure, line)` attribution against a
/// proposed enclosing procedure.
///
/// Empty candidate fields are first filled from the proposal: a missing file
/// defaults to the proposal's file; a missing procedure name defaults to the
/// proposal's base name only when the line is invalid, the proposal is
/// itself a relocated procedure, or the line falls inside the proposal's
/// declared bounds. A procedure name left empty after defaulting cannot
/// match the proposal and is exiled. A proposal without declared bounds
/// cannot disprove containment, so its bounds check passes.
///
/// Returns the placement together with the candidate's resolved file and
/// procedure names (the procedure name may remain empty when unresolvable).
#[must_use]
pub fn classify_placement(
    tree: &ScopeTree,
    proposal_file: &str,
    proposal_proc: ScopeId,
    candidate: &SourceInfo,
) -> (Placement, String, String) {
    let (proc_name, relocated) = match &tree.node(proposal_proc).kind {
        ScopeKind::Procedure {
            name, relocated, ..
        } => (name.as_str(), *relocated),
        other => panic!("placement proposal must be a procedure, got {other:?}"),
    };
    let proposal_base = strip_relocated(proc_name);
    let bounds = tree.node(proposal_proc).lines;
    let line = candidate.line;
    let within_bounds = !bounds.is_valid() || bounds.contains(line);
    let defaults_to_proposal = line == 0 || relocated || within_bounds;

    let file = match candidate.file.as_deref() {
        Some(f) if !f.is_empty() => f.to_owned(),
        _ => proposal_file.to_owned(),
    };
    let proc_ = match candidate.procedure.as_deref() {
        Some(p) if !p.is_empty() => strip_relocated(p).to_owned(),
        _ if defaults_to_proposal => proposal_base.to_owned(),
        _ => String::new(),
    };

    let placement = if file != proposal_file {
        Placement::ExileToFileProc
    } else if proc_ != proposal_base {
        Placement::ExileToProc
    } else if line != 0 && !relocated && !within_bounds {
        Placement::ExileToProc
    } else {
        Placement::Amnesty
    };
    (placement, file, proc_)
}
