//! Perfect-nested-loop fusion.

use crate::scope::{ScopeId, ScopeTree};

/// Collapses perfectly nested loop pairs: a loop whose only child is
/// another loop with an identical, valid line extent absorbs that child.
/// Returns `true` if the tree changed.
pub fn fuse_perfect_loop_nests(tree: &mut ScopeTree) -> bool {
    visit(tree, tree.root())
}

fn visit(tree: &mut ScopeTree, node: ScopeId) -> bool {
    let mut changed = false;
    for child in tree.children(node).to_vec() {
        if tree.is_live(child) {
            changed |= visit(tree, child);
        }
    }
    if !tree.node(node).kind.is_loop() {
        return changed;
    }
    // A fused-in grandchild can itself be a fusable loop.
    loop {
        let children = tree.children(node);
        let [only] = children else { break };
        let only = *only;
        let inner = tree.node(only);
        if !inner.kind.is_loop()
            || !inner.lines.is_valid()
            || inner.lines != tree.node(node).lines
        {
            break;
        }
        tree.merge_into(only, node);
        changed = true;
    }
    changed
}
