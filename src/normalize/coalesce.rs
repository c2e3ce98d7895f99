//! Duplicate-statement coalescing.
//!
//! Loop bodies frequently attach the same source line at several places in
//! the raw tree (unrolled tails, cloned blocks, shared headers). This pass
//! merges such duplicates per procedure.
//!
//! Merging across loop boundaries reshapes the tree under iterators held by
//! recursive call frames, so the traversal uses an explicit restart
//! protocol: every recursive call returns either `Continue(changed)` or
//! `RestartAt(ancestor)`, and each frame unwinds the signal until the named
//! ancestor resumes iterating its children from the beginning. Already
//! processed subtrees are skipped through the visited set, which stays
//! valid across restarts because arena ids are never reused.

use crate::scope::{ScopeId, ScopeTree};
use std::collections::{HashMap, HashSet};

/// Outcome of one recursive traversal step.
enum Signal {
    /// Subtree fully processed; the flag reports whether it was mutated.
    Continue(bool),
    /// Unwind to the named ancestor and resume iterating its children.
    RestartAt(ScopeId),
}

/// Per-procedure traversal state. Line numbers are only comparable within
/// one procedure, so the whole state resets at every procedure boundary.
#[derive(Default)]
struct State {
    /// line -> (surviving statement, its depth)
    lines: HashMap<u32, (ScopeId, usize)>,
    /// Fully processed, depth-stable subtrees.
    visited: HashSet<ScopeId>,
}

/// Merges duplicate statement leaves within each procedure. With
/// `unsafe_normalization`, duplicates in sibling loop nests are also merged
/// by folding the loop chains together. Returns `true` if the tree changed.
pub fn coalesce_duplicate_statements(tree: &mut ScopeTree, unsafe_normalization: bool) -> bool {
    let mut changed = false;
    for lm in tree.children(tree.root()).to_vec() {
        for file in tree.children(lm).to_vec() {
            let mut state = State::default();
            match visit(tree, file, &mut state, unsafe_normalization) {
                Signal::Continue(c) => changed |= c,
                Signal::RestartAt(target) => {
                    unreachable!("restart target {target} escaped its file scope")
                }
            }
        }
    }
    changed
}

fn visit(tree: &mut ScopeTree, node: ScopeId, state: &mut State, unsafe_norm: bool) -> Signal {
    if tree.node(node).kind.is_procedure() {
        state.lines.clear();
        state.visited.clear();
    }
    let mut changed = false;
    'restart: loop {
        let children = tree.children(node).to_vec();
        for child in children {
            if !tree.is_live(child) || state.visited.contains(&child) {
                continue;
            }
            match visit(tree, child, state, unsafe_norm) {
                Signal::Continue(c) => changed |= c,
                Signal::RestartAt(target) if target == node => {
                    changed = true;
                    continue 'restart;
                }
                restart => return restart,
            }
        }
        break;
    }
    if tree.is_live(node) && tree.node(node).kind.is_statement() {
        match process_statement(tree, node, state, unsafe_norm) {
            Signal::Continue(c) => changed |= c,
            restart => return restart,
        }
    }
    state.visited.insert(node);
    Signal::Continue(changed)
}

fn process_statement(
    tree: &mut ScopeTree,
    stmt: ScopeId,
    state: &mut State,
    unsafe_norm: bool,
) -> Signal {
    let line = tree.node(stmt).lines.begin();
    let depth = tree.depth(stmt);
    let Some(&(other, other_depth)) = state.lines.get(&line) else {
        state.lines.insert(line, (stmt, depth));
        return Signal::Continue(false);
    };
    if other == stmt {
        return Signal::Continue(false);
    }
    if !tree.is_live(other) {
        state.lines.insert(line, (stmt, depth));
        return Signal::Continue(false);
    }

    let lca = tree.lca(stmt, other);
    let this_shallow = tree.parent(stmt) == Some(lca);
    let other_shallow = tree.parent(other) == Some(lca);
    if this_shallow || other_shallow {
        // Shallow duplicate: keep the deeper statement; ties keep the newer
        // one. Deleting the other is safe mid-iteration because it sits in
        // an already-visited part of the sibling list.
        let (keep, keep_depth, drop) = if other_depth > depth {
            (other, other_depth, stmt)
        } else {
            (stmt, depth, other)
        };
        let vmas = std::mem::take(&mut tree.node_mut(drop).vmas);
        tree.node_mut(keep).vmas.merge(&vmas);
        tree.unlink_and_delete(drop);
        state.lines.insert(line, (keep, keep_depth));
        return Signal::Continue(true);
    }
    if !unsafe_norm {
        return Signal::Continue(false);
    }

    // Cross-loop duplicate: fold the scope chain above `other` into the
    // chain above `stmt` pairwise, then merge the statements themselves.
    // The merges re-insert children by line order and can synthesize new
    // shallow duplicates, so the traversal restarts at the fork point.
    let chain_this = chain_below(tree, lca, stmt);
    let chain_other = chain_below(tree, lca, other);
    for (&o, &t) in chain_other.iter().zip(chain_this.iter()) {
        tree.merge_into(o, t);
    }
    tree.merge_into(other, stmt);
    state.lines.insert(line, (stmt, tree.depth(stmt)));
    Signal::RestartAt(lca)
}

/// Ancestors of `node` strictly between `lca` and `node`, ordered from the
/// LCA downward.
fn chain_below(tree: &ScopeTree, lca: ScopeId, node: ScopeId) -> Vec<ScopeId> {
    let mut chain: Vec<ScopeId> = tree
        .ancestors(node)
        .skip(1)
        .take_while(|&a| a != lca)
        .collect();
    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::LineRange;
    use crate::vma::VmaInterval;

    fn proc_tree() -> (ScopeTree, ScopeId) {
        let mut t = ScopeTree::new();
        let lm = t.add_load_module("a.out");
        let file = t.add_file(lm, "main.c", false);
        let p = t.add_procedure(file, "main", "main", false, LineRange::new(1, 99));
        (t, p)
    }

    #[test]
    fn shallow_duplicate_keeps_the_deeper() {
        let (mut t, p) = proc_tree();
        let shallow = t.add_statement(p, 12, VmaInterval::new(0x10, 0x14));
        let l = t.add_loop(p, 0x100, 10);
        t.node_mut(l).lines.widen(LineRange::new(10, 20));
        let deep = t.add_statement(l, 12, VmaInterval::new(0x20, 0x24));

        assert!(coalesce_duplicate_statements(&mut t, false));
        assert!(!t.is_live(shallow));
        assert!(t.is_live(deep));
        assert_eq!(t.node(deep).vmas.coverage(), 8);
    }

    #[test]
    fn equal_depth_duplicate_collapses() {
        let (mut t, p) = proc_tree();
        let a = t.add_statement(p, 12, VmaInterval::new(0x10, 0x14));
        let b = t.add_statement(p, 12, VmaInterval::new(0x20, 0x24));
        assert!(coalesce_duplicate_statements(&mut t, false));
        // Exactly one survivor carrying both ranges.
        assert_ne!(t.is_live(a), t.is_live(b));
        let survivor = if t.is_live(a) { a } else { b };
        assert_eq!(t.node(survivor).vmas.coverage(), 8);
    }

    #[test]
    fn cross_loop_duplicate_needs_unsafe_mode() {
        let (mut t, p) = proc_tree();
        let la = t.add_loop(p, 0x100, 10);
        t.node_mut(la).lines.widen(LineRange::new(10, 20));
        t.add_statement(la, 12, VmaInterval::new(0x10, 0x14));
        let lb = t.add_loop(p, 0x200, 10);
        t.node_mut(lb).lines.widen(LineRange::new(10, 20));
        t.add_statement(lb, 12, VmaInterval::new(0x20, 0x24));

        assert!(!coalesce_duplicate_statements(&mut t, false));
        assert!(t.is_live(la) && t.is_live(lb));

        assert!(coalesce_duplicate_statements(&mut t, true));
        // The loop chains folded together: one loop, one statement.
        assert_ne!(t.is_live(la), t.is_live(lb));
        let survivor = if t.is_live(la) { la } else { lb };
        let stmts: Vec<_> = t.children(survivor).to_vec();
        assert_eq!(stmts.len(), 1);
        assert_eq!(t.node(stmts[0]).vmas.coverage(), 8);
    }

    #[test]
    fn lines_never_compared_across_procedures() {
        let mut t = ScopeTree::new();
        let lm = t.add_load_module("a.out");
        let file = t.add_file(lm, "main.c", false);
        let p1 = t.add_procedure(file, "f", "f", false, LineRange::new(1, 50));
        let p2 = t.add_procedure(file, "g", "g", false, LineRange::new(1, 50));
        let s1 = t.add_statement(p1, 12, VmaInterval::new(0x10, 0x14));
        let s2 = t.add_statement(p2, 12, VmaInterval::new(0x20, 0x24));

        assert!(!coalesce_duplicate_statements(&mut t, true));
        assert!(t.is_live(s1) && t.is_live(s2));
    }

    #[test]
    fn second_run_is_a_fixed_point() {
        let (mut t, p) = proc_tree();
        t.add_statement(p, 12, VmaInterval::new(0x10, 0x14));
        t.add_statement(p, 12, VmaInterval::new(0x20, 0x24));
        assert!(coalesce_duplicate_statements(&mut t, true));
        assert!(!coalesce_duplicate_statements(&mut t, true));
    }
}
