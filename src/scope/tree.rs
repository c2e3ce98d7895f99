//! Arena-backed scope tree.

use crate::scope::{LineRange, ScopeKind, ScopeNode};
use crate::vma::{Vma, VmaInterval};
use std::collections::HashSet;
use std::fmt;

/// Index of a node within a [`ScopeTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    /// Returns the raw arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// The structure tree of one analysis run.
///
/// Nodes are never reclaimed while the tree lives; deletion unlinks a
/// subtree from its parent and marks it dead, so stale [`ScopeId`]s held by
/// in-flight traversals stay safe to query through [`ScopeTree::is_live`].
#[derive(Debug)]
pub struct ScopeTree {
    arena: Vec<ScopeNode>,
    root: ScopeId,
}

impl ScopeTree {
    /// Creates a tree holding only the root scope.
    #[must_use]
    pub fn new() -> Self {
        let root = ScopeNode::new(ScopeKind::Root, LineRange::empty());
        ScopeTree {
            arena: vec![root],
            root: ScopeId(0),
        }
    }

    /// Returns the root scope.
    #[must_use]
    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Returns the node at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    #[must_use]
    pub fn node(&self, id: ScopeId) -> &ScopeNode {
        &self.arena[id.0]
    }

    /// Returns a mutable reference to the node at `id`.
    pub fn node_mut(&mut self, id: ScopeId) -> &mut ScopeNode {
        &mut self.arena[id.0]
    }

    /// Returns `true` if `id` has not been deleted.
    #[must_use]
    pub fn is_live(&self, id: ScopeId) -> bool {
        self.arena[id.0].live
    }

    /// Returns the parent of `id`; only the root (and deleted roots of
    /// unlinked subtrees) has none.
    #[must_use]
    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.arena[id.0].parent
    }

    /// Returns the children of `id` in insertion order.
    #[must_use]
    pub fn children(&self, id: ScopeId) -> &[ScopeId] {
        &self.arena[id.0].children
    }

    /// Adds a load module under the root.
    pub fn add_load_module(&mut self, name: &str) -> ScopeId {
        let node = ScopeNode::new(
            ScopeKind::LoadModule {
                name: name.to_owned(),
            },
            LineRange::empty(),
        );
        self.attach(self.root, node)
    }

    /// Adds a file scope under `load_module`.
    pub fn add_file(&mut self, load_module: ScopeId, name: &str, synthetic: bool) -> ScopeId {
        debug_assert!(matches!(
            self.arena[load_module.0].kind,
            ScopeKind::LoadModule { .. }
        ));
        let node = ScopeNode::new(
            ScopeKind::File {
                name: name.to_owned(),
                synthetic,
            },
            LineRange::empty(),
        );
        self.attach(load_module, node)
    }

    /// Adds a procedure scope under `file`.
    pub fn add_procedure(
        &mut self,
        file: ScopeId,
        name: &str,
        link_name: &str,
        relocated: bool,
        lines: LineRange,
    ) -> ScopeId {
        debug_assert!(self.arena[file.0].kind.is_file());
        let node = ScopeNode::new(
            ScopeKind::Procedure {
                name: name.to_owned(),
                link_name: link_name.to_owned(),
                relocated,
            },
            lines,
        );
        self.attach(file, node)
    }

    /// Adds a loop scope under `parent` (a procedure or another loop).
    pub fn add_loop(&mut self, parent: ScopeId, header_vma: Vma, line: u32) -> ScopeId {
        let node = ScopeNode::new(ScopeKind::Loop { header_vma }, LineRange::single(line));
        self.attach(parent, node)
    }

    /// Adds a statement leaf under `parent` covering one source line and one
    /// machine-code range.
    pub fn add_statement(&mut self, parent: ScopeId, line: u32, vmas: VmaInterval) -> ScopeId {
        let mut node = ScopeNode::new(ScopeKind::Statement, LineRange::single(line));
        node.vmas.insert(vmas.begin(), vmas.end());
        self.attach(parent, node)
    }

    fn attach(&mut self, parent: ScopeId, mut node: ScopeNode) -> ScopeId {
        node.parent = Some(parent);
        let id = ScopeId(self.arena.len());
        self.arena.push(node);
        self.arena[parent.0].children.push(id);
        id
    }

    /// Unlinks `id` from its parent and marks the whole subtree dead.
    ///
    /// Safe to call while iterating over a snapshot of a sibling list; the
    /// caller is responsible for not revisiting the deleted ids.
    pub fn unlink_and_delete(&mut self, id: ScopeId) {
        assert!(id != self.root, "the root scope is never deleted");
        if let Some(parent) = self.arena[id.0].parent.take() {
            self.arena[parent.0].children.retain(|&c| c != id);
        }
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            self.arena[n.0].live = false;
            stack.extend(self.arena[n.0].children.iter().copied());
        }
    }

    /// Moves `id` under `new_parent`, keeping sibling order sorted by
    /// source-line begin.
    pub fn relink(&mut self, id: ScopeId, new_parent: ScopeId) {
        assert!(self.arena[id.0].live, "cannot relink a deleted scope");
        if let Some(old) = self.arena[id.0].parent.take() {
            self.arena[old.0].children.retain(|&c| c != id);
        }
        self.arena[id.0].parent = Some(new_parent);
        let begin = self.arena[id.0].lines.begin();
        let pos = self.arena[new_parent.0]
            .children
            .iter()
            .position(|&c| self.arena[c.0].lines.begin() > begin)
            .unwrap_or(self.arena[new_parent.0].children.len());
        self.arena[new_parent.0].children.insert(pos, id);
    }

    /// Returns an iterator from `id` up to the root, starting at `id`.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), |&n| self.arena[n.0].parent)
    }

    /// Returns the number of edges between `id` and the root.
    #[must_use]
    pub fn depth(&self, id: ScopeId) -> usize {
        self.ancestors(id).count() - 1
    }

    /// Returns the deepest common ancestor of `a` and `b`.
    #[must_use]
    pub fn lca(&self, a: ScopeId, b: ScopeId) -> ScopeId {
        let up: HashSet<ScopeId> = self.ancestors(a).collect();
        self.ancestors(b)
            .find(|n| up.contains(n))
            .expect("every pair of scopes shares the root")
    }

    /// Returns the nearest enclosing procedure of `id`, including `id`
    /// itself.
    #[must_use]
    pub fn enclosing_procedure(&self, id: ScopeId) -> Option<ScopeId> {
        self.ancestors(id).find(|&n| self.arena[n.0].kind.is_procedure())
    }

    /// Finds the file named `name` under `load_module`.
    #[must_use]
    pub fn find_file(&self, load_module: ScopeId, name: &str) -> Option<ScopeId> {
        self.children(load_module)
            .iter()
            .copied()
            .find(|&f| self.arena[f.0].kind.name() == Some(name))
    }

    /// Finds the file named `name` under `load_module`, creating it (as
    /// `synthetic`) when absent.
    pub fn find_or_create_file(
        &mut self,
        load_module: ScopeId,
        name: &str,
        synthetic: bool,
    ) -> ScopeId {
        match self.find_file(load_module, name) {
            Some(f) => f,
            None => self.add_file(load_module, name, synthetic),
        }
    }

    /// Finds the procedure named `name` under `file`.
    #[must_use]
    pub fn find_procedure(&self, file: ScopeId, name: &str) -> Option<ScopeId> {
        self.children(file)
            .iter()
            .copied()
            .find(|&p| self.arena[p.0].kind.name() == Some(name))
    }

    /// Finds the statement leaf for `line` among the direct children of
    /// `parent`.
    #[must_use]
    pub fn find_statement(&self, parent: ScopeId, line: u32) -> Option<ScopeId> {
        self.children(parent).iter().copied().find(|&c| {
            self.arena[c.0].kind.is_statement() && self.arena[c.0].lines.begin() == line
        })
    }

    /// Merges `src` into `dst`: unions the machine-code footprint, widens
    /// the line extent, re-parents `src`'s children under `dst` in
    /// line order, then deletes `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` and `dst` are the same scope.
    pub fn merge_into(&mut self, src: ScopeId, dst: ScopeId) {
        assert_ne!(src, dst, "cannot merge a scope into itself");
        let src_vmas = std::mem::take(&mut self.arena[src.0].vmas);
        let src_lines = self.arena[src.0].lines;
        self.arena[dst.0].vmas.merge(&src_vmas);
        self.arena[dst.0].lines.widen(src_lines);
        let children = std::mem::take(&mut self.arena[src.0].children);
        for child in children {
            // relink expects the child's parent link to be consistent.
            self.arena[child.0].parent = Some(src);
            self.arena[src.0].children.push(child);
            self.relink(child, dst);
        }
        self.unlink_and_delete(src);
    }

    /// Returns all live scopes in preorder.
    #[must_use]
    pub fn preorder(&self) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(n) = stack.pop() {
            out.push(n);
            for &c in self.arena[n.0].children.iter().rev() {
                stack.push(c);
            }
        }
        out
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
