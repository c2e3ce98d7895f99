//! Loop-nest construction over the interval tree.

use crate::binutils::{Instruction, ProcedureRecord, SourceResolver};
use crate::cfg::{ControlFlowGraph, ProcedureIr};
use crate::graph::NodeId;
use crate::interval::{ScrKind, ScrTree};
use crate::scope::{LineRange, ScopeId, ScopeKind, ScopeTree};
use crate::structure::linemap::{
    classify_placement, mark_relocated, unknown_file_name, Placement, UNKNOWN_PROC,
};
use crate::structure::StructureConfig;
use crate::vma::VmaInterval;
use crate::Result;

/// Builds raw scope trees for load modules and procedures.
///
/// The builder owns no tree state; each call threads the target
/// [`ScopeTree`] explicitly, so several load modules can be built into one
/// tree.
pub struct StructureBuilder<'a, R: SourceResolver> {
    config: &'a StructureConfig,
    resolver: &'a R,
}

impl<'a, R: SourceResolver> StructureBuilder<'a, R> {
    /// Creates a builder over the given configuration and line-table
    /// resolver.
    #[must_use]
    pub fn new(config: &'a StructureConfig, resolver: &'a R) -> Self {
        StructureBuilder { config, resolver }
    }

    /// Builds one load module and all of its procedures into `tree`.
    ///
    /// # Errors
    ///
    /// Fails if any procedure has an empty instruction stream or its
    /// interval analysis fails.
    pub fn build_load_module(
        &self,
        tree: &mut ScopeTree,
        name: &str,
        procedures: &[(ProcedureRecord, Vec<Instruction>)],
    ) -> Result<ScopeId> {
        let lm = tree.add_load_module(name);
        for (record, instructions) in procedures {
            self.build_procedure(tree, lm, name, record, instructions.clone())?;
        }
        Ok(lm)
    }

    /// Builds one procedure under `load_module` and returns its scope.
    ///
    /// # Errors
    ///
    /// Fails if the instruction stream is empty or interval analysis fails.
    pub fn build_procedure(
        &self,
        tree: &mut ScopeTree,
        load_module: ScopeId,
        load_module_name: &str,
        record: &ProcedureRecord,
        instructions: Vec<Instruction>,
    ) -> Result<ScopeId> {
        let (file_name, synthetic) = match &record.file_name {
            Some(f) if !f.is_empty() => (f.clone(), false),
            _ => (unknown_file_name(load_module_name), true),
        };
        let file = tree.find_or_create_file(load_module, &file_name, synthetic);

        let lines = match (
            record.begin_line,
            self.resolver.range_info(record.begin_vma, record.end_vma),
        ) {
            (0, None) => LineRange::empty(),
            (0, Some((lo, hi))) => LineRange::new(lo, hi),
            (b, None) => LineRange::single(b),
            (b, Some((_, hi))) => LineRange::new(b.min(hi), b.max(hi)),
        };
        // A procedure may come in several disjoint machine-code bodies;
        // later bodies fold into the scope the first one created.
        let proc_ = match tree.find_procedure(file, &record.name) {
            Some(p) => {
                tree.node_mut(p).lines.widen(lines);
                p
            }
            None => tree.add_procedure(file, &record.name, &record.link_name, false, lines),
        };
        if record.begin_vma < record.end_vma {
            tree.node_mut(proc_).vmas.insert(record.begin_vma, record.end_vma);
        }

        let ir = ProcedureIr::new(record.clone(), instructions);
        let cfg = ControlFlowGraph::from_procedure(&ir)?;
        let scr = crate::interval::analyze(&cfg)?;

        let mut walk = Walk {
            tree,
            cfg: &cfg,
            scr: &scr,
            config: self.config,
            resolver: self.resolver,
            load_module,
        };
        walk.build_forest(scr.top(), proc_, true);
        Ok(proc_)
    }
}

/// Per-procedure traversal state.
struct Walk<'t, 'a, R: SourceResolver> {
    tree: &'t mut ScopeTree,
    cfg: &'a ControlFlowGraph,
    scr: &'a ScrTree,
    config: &'a StructureConfig,
    resolver: &'a R,
    load_module: ScopeId,
}

impl<R: SourceResolver> Walk<'_, '_, R> {
    /// Builds a sibling list of regions under `enclosing`. Returns the
    /// number of loops recovered.
    fn build_forest(&mut self, regions: &[usize], enclosing: ScopeId, add_stmts: bool) -> usize {
        let mut count = 0;
        for &region in regions {
            let (kind, block) = {
                let n = self.scr.node(region);
                (n.kind, n.block)
            };
            match kind {
                ScrKind::Acyclic => self.attach_block_statements(block, enclosing),
                ScrKind::Interval => count += self.build_loop(region, enclosing),
                ScrKind::Irreducible if self.config.irreducible_is_loop => {
                    count += self.build_loop(region, enclosing);
                }
                // Transparent irreducible region: no scope of its own, but
                // genuine loops nested inside it are still recovered.
                ScrKind::Irreducible => count += self.build_region(region, enclosing, add_stmts),
            }
        }
        count
    }

    /// Builds one region's header statements and children under `enclosing`.
    fn build_region(&mut self, region: usize, enclosing: ScopeId, add_stmts: bool) -> usize {
        let (block, children) = {
            let n = self.scr.node(region);
            (n.block, n.children.clone())
        };
        if add_stmts {
            self.attach_block_statements(block, enclosing);
        }
        self.build_forest(&children, enclosing, add_stmts)
    }

    /// Creates a loop scope for a cyclic region, placing it under the
    /// relocation target when the header's attribution is alien, then
    /// builds the body. Returns the number of loops recovered (zero when
    /// the finished loop has no source correspondence and is discarded).
    fn build_loop(&mut self, region: usize, enclosing: ScopeId) -> usize {
        let header = self.scr.node(region).block;
        let header_vma = self.cfg.block(header).expect("region block").begin_vma();

        let proposal_proc = self
            .tree
            .enclosing_procedure(enclosing)
            .expect("loops are built under procedures");
        let proposal_file = self.enclosing_file_name(proposal_proc);
        let header_info = self.resolver.line_info(header_vma);
        let (placement, cand_file, cand_proc) =
            classify_placement(self.tree, &proposal_file, proposal_proc, &header_info);

        let loop_parent = match placement {
            Placement::Amnesty => enclosing,
            _ => {
                let target = self.relocation_target(
                    placement,
                    proposal_proc,
                    &cand_file,
                    &cand_proc,
                    header_info.line,
                );
                // The whole region moves: keep the procedure VMA sets
                // disjoint by erasing exactly what the target gains.
                for block in self.region_blocks(region) {
                    let b = self.cfg.block(block).expect("region block");
                    let (lo, hi) = (b.begin_vma(), b.end_vma());
                    self.tree.node_mut(proposal_proc).vmas.erase(lo, hi);
                    self.tree.node_mut(target).vmas.insert(lo, hi);
                }
                target
            }
        };

        let line = self.loop_header_line(header);
        let loop_scope = self.tree.add_loop(loop_parent, header_vma, line);
        let nested = self.build_region(region, loop_scope, true);

        // A loop that never resolved to any source line is useless.
        if !self.tree.node(loop_scope).lines.is_valid() {
            self.tree.unlink_and_delete(loop_scope);
            return 0;
        }
        nested + 1
    }

    /// Finds the loop's source line: the smallest valid line among the
    /// sources of backward edges into the header. An edge counts as
    /// backward if it is marked, or if its source address is numerically at
    /// or above the header (markings are a dominance approximation and miss
    /// some loop-closing edges). Falls back to the header's own first line.
    fn loop_header_line(&self, header: NodeId) -> u32 {
        let header_vma = self.cfg.block(header).expect("header block").begin_vma();
        let mut best = 0u32;
        for e in self.cfg.incoming_edges(header) {
            let edge = self.cfg.edge(e).expect("edge payload");
            let (src, _) = self.cfg.edge_endpoints(e).expect("edge endpoints");
            let src_last = self.cfg.block(src).expect("source block").last_instruction().vma;
            if edge.back || src_last >= header_vma {
                let line = self.resolver.line_info(src_last).line;
                if line != 0 && (best == 0 || line < best) {
                    best = line;
                }
            }
        }
        if best == 0 {
            best = self.resolver.line_info(header_vma).line;
        }
        best
    }

    /// Attaches one basic block's instructions as statement leaves under
    /// `enclosing`, relocating alien instructions as classified.
    fn attach_block_statements(&mut self, block: NodeId, enclosing: ScopeId) {
        let instructions = self.cfg.block(block).expect("block payload").instructions().to_vec();
        if self.tree.node(enclosing).kind.is_loop() {
            let b = self.cfg.block(block).expect("block payload");
            let (lo, hi) = (b.begin_vma(), b.end_vma());
            self.tree.node_mut(enclosing).vmas.insert(lo, hi);
        }

        let owner_proc = self
            .tree
            .enclosing_procedure(enclosing)
            .expect("statements are attached under procedures");
        let proposal_file = self.enclosing_file_name(owner_proc);

        for instr in instructions {
            let info = self.resolver.line_info(instr.vma);
            let (placement, cand_file, cand_proc) =
                classify_placement(self.tree, &proposal_file, owner_proc, &info);
            let (lo, hi) = (instr.vma, instr.end_vma());
            match placement {
                Placement::Amnesty => {
                    let target = self.innermost_containing_loop(enclosing, owner_proc, info.line);
                    self.place_statement(target, info.line, lo, hi);
                }
                _ => {
                    let target = self.relocation_target(
                        placement,
                        owner_proc,
                        &cand_file,
                        &cand_proc,
                        info.line,
                    );
                    self.tree.node_mut(owner_proc).vmas.erase(lo, hi);
                    self.tree.node_mut(target).vmas.insert(lo, hi);
                    self.place_statement(target, info.line, lo, hi);
                }
            }
        }
    }

    /// Walks outward from `scope` through the loop-ancestor chain and
    /// returns the innermost loop whose extent contains `line`. Loops do
    /// not know their end lines yet, so the owning procedure's end line
    /// bounds the check from above. Falls back to the procedure itself.
    fn innermost_containing_loop(&self, scope: ScopeId, proc_: ScopeId, line: u32) -> ScopeId {
        if line == 0 {
            return scope;
        }
        let proc_end = self.tree.node(proc_).lines.end();
        let upper = if proc_end == 0 { u32::MAX } else { proc_end };
        let mut cur = scope;
        loop {
            let node = self.tree.node(cur);
            if !node.kind.is_loop() {
                return cur;
            }
            let begin = node.lines.begin();
            if begin != 0 && begin <= line && line <= upper {
                return cur;
            }
            cur = self.tree.parent(cur).expect("loop has a parent");
        }
    }

    /// Creates or merges the statement leaf for `line` under `scope`; at
    /// most one leaf per line exists within one scope during a block pass.
    fn place_statement(&mut self, scope: ScopeId, line: u32, lo: u64, hi: u64) {
        match self.tree.find_statement(scope, line) {
            Some(s) => self.tree.node_mut(s).vmas.insert(lo, hi),
            None => {
                self.tree.add_statement(scope, line, VmaInterval::new(lo, hi));
            }
        }
        if self.tree.node(scope).kind.is_loop() {
            self.tree.node_mut(scope).lines.widen(LineRange::single(line));
        }
    }

    /// Finds or creates the file/procedure pair exiled code moves to.
    fn relocation_target(
        &mut self,
        placement: Placement,
        proposal_proc: ScopeId,
        file_name: &str,
        proc_name: &str,
        line: u32,
    ) -> ScopeId {
        let file = match placement {
            Placement::ExileToFileProc => {
                self.tree.find_or_create_file(self.load_module, file_name, false)
            }
            Placement::ExileToProc => {
                self.tree.parent(proposal_proc).expect("procedures live under files")
            }
            Placement::Amnesty => unreachable!("amnesty never relocates"),
        };
        let base = if proc_name.is_empty() {
            UNKNOWN_PROC
        } else {
            proc_name
        };
        // A bounds exile can carry the proposal's own base name; landing
        // back in the origin would undo the relocation.
        if let Some(p) = self.tree.find_procedure(file, base) {
            if p != proposal_proc {
                return p;
            }
        }
        let display = mark_relocated(base);
        if let Some(p) = self.tree.find_procedure(file, &display) {
            return p;
        }
        self.tree
            .add_procedure(file, &display, base, true, LineRange::single(line))
    }

    fn enclosing_file_name(&self, proc_: ScopeId) -> String {
        let file = self.tree.parent(proc_).expect("procedures live under files");
        match &self.tree.node(file).kind {
            ScopeKind::File { name, .. } => name.clone(),
            other => panic!("procedure parent must be a file, got {other:?}"),
        }
    }

    /// Collects the CFG blocks of a region and all its nested regions.
    fn region_blocks(&self, region: usize) -> Vec<NodeId> {
        let mut blocks = Vec::new();
        let mut stack = vec![region];
        while let Some(r) = stack.pop() {
            let n = self.scr.node(r);
            blocks.push(n.block);
            stack.extend(n.children.iter().copied());
        }
        blocks
    }
}
