//! End-to-end structure-recovery tests.
//!
//! Each test drives the full pipeline — instruction stream to normalized
//! scope tree — and checks the externally visible properties: line-extent
//! consistency, procedure footprint disjointness and conservation,
//! duplicate-free statements, pipeline idempotence, and the loop shapes
//! recovered from reducible and irreducible control flow.

use binscope::normalize::normalize;
use binscope::prelude::*;

fn record(name: &str, file: &str, begin: u64, end: u64, line: u32) -> ProcedureRecord {
    ProcedureRecord {
        name: name.into(),
        link_name: name.into(),
        file_name: Some(file.into()),
        begin_vma: begin,
        end_vma: end,
        begin_line: line,
    }
}

/// entry, outer header, self-looping inner block, latch back to the outer
/// header, exit: two nested natural loops.
fn nested_loop_module() -> (ProcedureRecord, Vec<Instruction>, MapResolver) {
    let instrs = vec![
        Instruction::simple(0x1000, 4),
        Instruction::simple(0x1004, 4),
        Instruction::branch(0x1008, 4, BranchKind::CondRelative, 0x1008),
        Instruction::branch(0x100c, 4, BranchKind::CondRelative, 0x1004),
        Instruction::ret(0x1010, 4),
    ];
    let mut resolver = MapResolver::new();
    resolver.insert_full(0x1000, "f", "f.c", 5);
    resolver.insert_full(0x1004, "f", "f.c", 10);
    resolver.insert_full(0x1008, "f", "f.c", 12);
    resolver.insert_full(0x100c, "f", "f.c", 10);
    resolver.insert_full(0x1010, "f", "f.c", 20);
    (record("f", "f.c", 0x1000, 0x1014, 5), instrs, resolver)
}

/// entry branching into a two-entry cycle: an irreducible region.
fn irreducible_module() -> (ProcedureRecord, Vec<Instruction>, MapResolver) {
    let instrs = vec![
        Instruction::branch(0x1000, 4, BranchKind::CondRelative, 0x1008),
        Instruction::branch(0x1004, 4, BranchKind::UncondRelative, 0x1008),
        Instruction::branch(0x1008, 4, BranchKind::UncondRelative, 0x1004),
    ];
    let mut resolver = MapResolver::new();
    resolver.insert_full(0x1000, "f", "f.c", 5);
    resolver.insert_full(0x1004, "f", "f.c", 8);
    resolver.insert_full(0x1008, "f", "f.c", 9);
    (record("f", "f.c", 0x1000, 0x100c, 5), instrs, resolver)
}

fn loops_under(tree: &ScopeTree, scope: ScopeId) -> Vec<ScopeId> {
    tree.children(scope)
        .iter()
        .copied()
        .filter(|&c| tree.node(c).kind.is_loop())
        .collect()
}

fn all_loops(tree: &ScopeTree) -> Vec<ScopeId> {
    tree.preorder()
        .into_iter()
        .filter(|&n| tree.node(n).kind.is_loop())
        .collect()
}

fn find_procedure(tree: &ScopeTree, name: &str) -> ScopeId {
    tree.preorder()
        .into_iter()
        .find(|&n| tree.node(n).kind.is_procedure() && tree.node(n).kind.name() == Some(name))
        .expect("procedure present")
}

#[test]
fn nested_intervals_produce_two_level_loops() {
    let (rec, instrs, resolver) = nested_loop_module();
    let config = StructureConfig {
        normalize: false,
        ..StructureConfig::default()
    };
    let tree = build_and_normalize(&config, &resolver, "a.out", &[(rec, instrs)]).unwrap();

    let proc_ = find_procedure(&tree, "f");
    let outer = loops_under(&tree, proc_);
    assert_eq!(outer.len(), 1, "exactly one outer loop");
    let inner = loops_under(&tree, outer[0]);
    assert_eq!(inner.len(), 1, "exactly one nested loop");
    assert!(loops_under(&tree, inner[0]).is_empty());

    // Statements sit at their nesting depth.
    assert!(tree.find_statement(outer[0], 10).is_some());
    assert!(tree.find_statement(inner[0], 12).is_some());
    assert!(tree.find_statement(proc_, 5).is_some());
}

#[test]
fn irreducible_region_respects_the_mode_flag() {
    let (rec, instrs, resolver) = irreducible_module();

    let transparent = StructureConfig {
        normalize: false,
        irreducible_is_loop: false,
        ..StructureConfig::default()
    };
    let tree = build_and_normalize(
        &transparent,
        &resolver,
        "a.out",
        &[(rec.clone(), instrs.clone())],
    )
    .unwrap();
    assert!(all_loops(&tree).is_empty(), "transparent mode hoists statements");
    let proc_ = find_procedure(&tree, "f");
    assert!(tree.find_statement(proc_, 8).is_some());
    assert!(tree.find_statement(proc_, 9).is_some());

    let inclusive = StructureConfig {
        normalize: false,
        irreducible_is_loop: true,
        ..StructureConfig::default()
    };
    let tree = build_and_normalize(&inclusive, &resolver, "a.out", &[(rec, instrs)]).unwrap();
    let loops = all_loops(&tree);
    assert_eq!(loops.len(), 1, "inclusive mode makes one loop scope");
    assert!(tree.find_statement(loops[0], 9).is_some());
}

#[test]
fn every_extent_is_zero_or_ordered() {
    let (rec, instrs, resolver) = nested_loop_module();
    let config = StructureConfig::default();
    let tree = build_and_normalize(&config, &resolver, "a.out", &[(rec, instrs)]).unwrap();
    for node in tree.preorder() {
        let lines = tree.node(node).lines;
        assert_eq!(lines.begin() == 0, lines.end() == 0, "node {node}");
        assert!(lines.begin() <= lines.end(), "node {node}");
    }
}

#[test]
fn relocation_keeps_procedure_footprints_disjoint_and_conserved() {
    // The loop body resolves into a different translation unit, forcing
    // relocation of its footprint out of `f`.
    let instrs = vec![
        Instruction::simple(0x1000, 4),
        Instruction::branch(0x1004, 4, BranchKind::CondRelative, 0x1004),
        Instruction::ret(0x1008, 4),
    ];
    let mut resolver = MapResolver::new();
    resolver.insert_full(0x1000, "f", "f.c", 10);
    resolver.insert_full(0x1004, "helper", "helper.h", 90);
    resolver.insert_full(0x1008, "f", "f.c", 12);
    let rec = record("f", "f.c", 0x1000, 0x100c, 10);
    let total_bytes = rec.end_vma - rec.begin_vma;

    let config = StructureConfig {
        normalize: false,
        ..StructureConfig::default()
    };
    let tree = build_and_normalize(&config, &resolver, "a.out", &[(rec, instrs)]).unwrap();

    let procs: Vec<ScopeId> = tree
        .preorder()
        .into_iter()
        .filter(|&n| tree.node(n).kind.is_procedure())
        .collect();
    assert!(procs.len() >= 2, "relocation created a second procedure");

    let mut covered = 0;
    for (i, &a) in procs.iter().enumerate() {
        covered += tree.node(a).vmas.coverage();
        for &b in &procs[i + 1..] {
            assert!(
                !tree.node(a).vmas.overlaps(&tree.node(b).vmas),
                "procedures {a} and {b} overlap"
            );
        }
    }
    assert_eq!(covered, total_bytes, "relocation moved ranges, never lost them");
}

#[test]
fn no_parent_holds_two_statements_on_one_line() {
    let (rec, instrs, resolver) = nested_loop_module();
    let config = StructureConfig {
        unsafe_normalization: true,
        ..StructureConfig::default()
    };
    let tree = build_and_normalize(&config, &resolver, "a.out", &[(rec, instrs)]).unwrap();

    for parent in tree.preorder() {
        let mut lines: Vec<u32> = tree
            .children(parent)
            .iter()
            .filter(|&&c| tree.node(c).kind.is_statement())
            .map(|&c| tree.node(c).lines.begin())
            .collect();
        lines.sort_unstable();
        let before = lines.len();
        lines.dedup();
        assert_eq!(before, lines.len(), "duplicate line under {parent}");
    }
}

#[test]
fn normalization_is_idempotent() {
    let (rec, instrs, resolver) = nested_loop_module();
    let config = StructureConfig {
        unsafe_normalization: true,
        ..StructureConfig::default()
    };
    let mut tree = build_and_normalize(&config, &resolver, "a.out", &[(rec, instrs)]).unwrap();
    assert!(
        !normalize(&mut tree, &config),
        "second pipeline run must be a fixed point"
    );
}

#[test]
fn perfect_nest_fuses_into_one_loop() {
    // Synthetic raw tree: loop [10,20] containing only loop [10,20]
    // containing two statements.
    let mut tree = ScopeTree::new();
    let lm = tree.add_load_module("a.out");
    let file = tree.add_file(lm, "main.c", false);
    let proc_ = tree.add_procedure(file, "main", "main", false, LineRange::new(1, 99));
    tree.node_mut(proc_).vmas.insert(0x1000, 0x1100);
    let outer = tree.add_loop(proc_, 0x100, 10);
    tree.node_mut(outer).lines.widen(LineRange::new(10, 20));
    let inner = tree.add_loop(outer, 0x104, 10);
    tree.node_mut(inner).lines.widen(LineRange::new(10, 20));
    let s1 = tree.add_statement(inner, 12, VmaInterval::new(0x1000, 0x1004));
    let s2 = tree.add_statement(inner, 15, VmaInterval::new(0x1004, 0x1008));

    let config = StructureConfig::default();
    assert!(normalize(&mut tree, &config));
    assert!(!tree.is_live(inner));
    assert_eq!(tree.children(outer), &[s1, s2]);
    assert_eq!(tree.node(outer).lines, LineRange::new(10, 20));
}

#[test]
fn pruning_distinguishes_footprint_from_children() {
    let mut tree = ScopeTree::new();
    let lm = tree.add_load_module("a.out");
    let empty_file = tree.add_file(lm, "dead.c", false);
    let file = tree.add_file(lm, "main.c", false);
    let proc_ = tree.add_procedure(file, "main", "main", false, LineRange::new(1, 99));
    tree.node_mut(proc_).vmas.insert(0x1000, 0x1100);
    let bare_loop = tree.add_loop(proc_, 0x100, 10);
    let covered_loop = tree.add_loop(proc_, 0x200, 20);
    tree.node_mut(covered_loop).vmas.insert(0x1040, 0x1080);

    let config = StructureConfig::default();
    assert!(normalize(&mut tree, &config));
    assert!(!tree.is_live(empty_file), "childless file removed");
    assert!(!tree.is_live(bare_loop), "footprint-free childless loop removed");
    assert!(tree.is_live(covered_loop), "loop with code kept");
}

#[test]
fn multiple_procedures_share_one_file_scope() {
    let f = record("f", "common.c", 0x1000, 0x1008, 3);
    let g = record("g", "common.c", 0x2000, 0x2008, 30);
    let f_instrs = vec![Instruction::simple(0x1000, 4), Instruction::ret(0x1004, 4)];
    let g_instrs = vec![Instruction::simple(0x2000, 4), Instruction::ret(0x2004, 4)];
    let mut resolver = MapResolver::new();
    resolver.insert_full(0x1000, "f", "common.c", 3);
    resolver.insert_full(0x2000, "g", "common.c", 30);

    let config = StructureConfig::default();
    let tree = build_and_normalize(
        &config,
        &resolver,
        "a.out",
        &[(f, f_instrs), (g, g_instrs)],
    )
    .unwrap();

    let lm = tree.children(tree.root())[0];
    let files: Vec<ScopeId> = tree.children(lm).to_vec();
    assert_eq!(files.len(), 1);
    assert_eq!(tree.children(files[0]).len(), 2);
}

#[test]
fn empty_procedure_is_rejected() {
    let rec = record("f", "f.c", 0x1000, 0x1000, 0);
    let resolver = MapResolver::new();
    let config = StructureConfig::default();
    let err = build_and_normalize(&config, &resolver, "a.out", &[(rec, vec![])]).unwrap_err();
    assert!(matches!(err, Error::Empty));
}
