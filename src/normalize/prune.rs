//! Empty-scope removal.

use crate::scope::{ScopeId, ScopeKind, ScopeTree};

/// Removes files with no children, and procedures or loops with no children
/// and no machine-code footprint. A childless procedure or loop that still
/// covers code is kept; the missing footprint is the actual emptiness
/// signal. Returns `true` if the tree changed.
pub fn prune_empty_scopes(tree: &mut ScopeTree) -> bool {
    visit(tree, tree.root())
}

fn visit(tree: &mut ScopeTree, node: ScopeId) -> bool {
    let mut changed = false;
    for child in tree.children(node).to_vec() {
        if tree.is_live(child) {
            changed |= visit(tree, child);
        }
    }
    let empty = match &tree.node(node).kind {
        ScopeKind::File { .. } => tree.children(node).is_empty(),
        ScopeKind::Procedure { .. } | ScopeKind::Loop { .. } => {
            tree.children(node).is_empty() && tree.node(node).vmas.is_empty()
        }
        ScopeKind::Root | ScopeKind::LoadModule { .. } | ScopeKind::Statement => false,
    };
    if empty {
        tree.unlink_and_delete(node);
        return true;
    }
    changed
}
