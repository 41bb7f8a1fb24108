
use super::*;

use crate::alias::{ AliasResult, DeclaredAlias, StructuralAlias };
use crate::diag::{ Capture };
use crate::ir::{ Builder, Reg };

// ------------------------------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------------------------------

#[track_caller]
fn check_dead(func: &Function, oracle: &dyn AliasOracle, expected: &[InstId]) {
	let mssa = MemorySsa::build(func);
	let mut sink = Capture::new();
	let dead = find_dead_stores(func, &mssa, oracle, &mut sink);

	let mut found = dead.to_vec();
	let mut expected = expected.to_vec();
	found.sort();
	expected.sort();

	assert_eq!(found, expected);
	assert_eq!(sink.lines().len(), dead.len());
}

#[track_caller]
fn check_none_dead(func: &Function, oracle: &dyn AliasOracle) {
	check_dead(func, oracle, &[]);
}

// ------------------------------------------------------------------------------------------------
// Straight-line pairs
// ------------------------------------------------------------------------------------------------

#[test]
fn overwritten_store_is_dead() {
	let mut b = Builder::new("f");
	let s0 = b.store(Reg(0), 1);
	let s1 = b.store(Reg(0), 2);
	b.ret(None);
	let mut f = b.finish().unwrap();

	check_dead(&f, &StructuralAlias, &[s0]);

	let mut sink = Capture::new();
	assert_eq!(eliminate_dead_stores(&mut f, &StructuralAlias, &mut sink), 1);
	assert!(!f.contains(s0));
	assert!(f.contains(s1));
	assert_eq!(f.num_insts(), 1);
}

#[test]
fn intervening_load_blocks() {
	let mut b = Builder::new("f");
	b.store(Reg(0), 1);
	b.load(Reg(1), Reg(0));
	b.store(Reg(0), 2);
	b.ret(None);
	let f = b.finish().unwrap();

	check_none_dead(&f, &StructuralAlias);
}

#[test]
fn load_of_unrelated_location_still_blocks() {
	// the window scan doesn't ask the oracle about loads; any read in the window blocks.
	let mut b = Builder::new("f");
	b.store(Reg(0), 1);
	b.load(Reg(1), Reg(2));
	b.store(Reg(0), 2);
	b.ret(None);
	let f = b.finish().unwrap();

	check_none_dead(&f, &StructuralAlias);
}

#[test]
fn call_shields_earlier_store() {
	let mut b = Builder::new("f");
	b.store(Reg(0), 1);
	b.call(None, "ext");
	b.store(Reg(0), 2);
	b.ret(None);
	let f = b.finish().unwrap();

	check_none_dead(&f, &StructuralAlias);
}

#[test]
fn chain_removed_in_one_pass() {
	let mut b = Builder::new("f");
	let s0 = b.store(Reg(0), 1);
	let s1 = b.store(Reg(0), 2);
	let s2 = b.store(Reg(0), 3);
	b.ret(None);
	let mut f = b.finish().unwrap();

	// each pair is judged independently, so (s0, s1) and (s1, s2) both land in one pass.
	check_dead(&f, &StructuralAlias, &[s0, s1]);

	let mut sink = Capture::new();
	assert_eq!(eliminate_dead_stores(&mut f, &StructuralAlias, &mut sink), 2);
	assert!(f.contains(s2));
	assert_eq!(f.num_insts(), 1);
}

// ------------------------------------------------------------------------------------------------
// The oracle's say
// ------------------------------------------------------------------------------------------------

#[test]
fn distinct_registers_are_left_alone() {
	let mut b = Builder::new("f");
	b.store(Reg(0), 1);
	b.store(Reg(1), 2);
	b.ret(None);
	let f = b.finish().unwrap();

	// structurally these only may-alias, and may isn't enough.
	check_none_dead(&f, &StructuralAlias);
}

#[test]
fn declared_no_alias_is_left_alone() {
	let mut b = Builder::new("f");
	b.store(Reg(0), 1);
	b.store(Reg(1), 2);
	b.ret(None);
	let f = b.finish().unwrap();

	let mut oracle = DeclaredAlias::new();
	oracle.declare(Reg(0), Reg(1), AliasResult::No);
	check_none_dead(&f, &oracle);
}

#[test]
fn declared_must_alias_is_eliminated() {
	let mut b = Builder::new("f");
	let s0 = b.store(Reg(0), 1);
	b.store(Reg(1), 2);
	b.ret(None);
	let f = b.finish().unwrap();

	let mut oracle = DeclaredAlias::new();
	oracle.declare(Reg(0), Reg(1), AliasResult::Must);
	check_dead(&f, &oracle, &[s0]);
}

// ------------------------------------------------------------------------------------------------
// Control flow
// ------------------------------------------------------------------------------------------------

#[test]
fn merge_blocks_are_conservative() {
	// bb0: cbranch; bb1/bb2 each store; bb3 stores again. the merge store's last write is a
	// phi, so no pair forms even though every path overwrites.
	let mut b = Builder::new("f");
	b.cond(Reg(9), 1, 2);
	b.block();
	b.store(Reg(0), 1);
	b.jump(3);
	b.block();
	b.store(Reg(0), 2);
	b.jump(3);
	b.block();
	b.store(Reg(0), 3);
	b.ret(None);
	let f = b.finish().unwrap();

	check_none_dead(&f, &StructuralAlias);
}

#[test]
fn shared_clobber_recorded_once() {
	// both branch stores overwrite the entry store; it must be recorded (and later deleted)
	// exactly once.
	let mut b = Builder::new("f");
	let s0 = b.store(Reg(0), 1);
	b.cond(Reg(9), 1, 2);
	b.block();
	b.store(Reg(0), 2);
	b.ret(None);
	b.block();
	b.store(Reg(0), 3);
	b.ret(None);
	let mut f = b.finish().unwrap();

	let mssa = MemorySsa::build(&f);
	let mut sink = Capture::new();
	let dead = find_dead_stores(&f, &mssa, &StructuralAlias, &mut sink);

	assert_eq!(dead.to_vec(), vec![s0]);
	assert_eq!(sink.lines().len(), 1);

	let mut sink = Capture::new();
	assert_eq!(eliminate_dead_stores(&mut f, &StructuralAlias, &mut sink), 1);
	assert!(!f.contains(s0));
}

#[test]
fn loop_store_overwritten_after_exit() {
	// bb1 is a loop body whose store's last write is the header phi, so the in-loop store
	// can't be a candidate's previous half from inside the loop. the store after the exit
	// still kills it: no read can run between any execution of it and the overwrite.
	let mut b = Builder::new("f");
	b.jump(1);
	b.block();
	let s0 = b.store(Reg(0), 1);
	b.cond(Reg(9), 1, 2);
	b.block();
	b.store(Reg(0), 2);
	b.ret(None);
	let f = b.finish().unwrap();

	check_dead(&f, &StructuralAlias, &[s0]);
}

#[test]
fn window_out_of_layout_order_is_skipped() {
	// flow runs bb0 -> bb2 -> bb1, so bb2's store is the last write of bb1's store while
	// sitting after it in layout. the window scan can't close the window and must give up.
	let mut b = Builder::new("f");
	b.jump(2);
	b.block();
	b.store(Reg(0), 2);
	b.ret(None);
	b.block();
	b.store(Reg(0), 1);
	b.jump(1);
	let f = b.finish().unwrap();

	check_none_dead(&f, &StructuralAlias);
}

// ------------------------------------------------------------------------------------------------
// Whole-pass behavior
// ------------------------------------------------------------------------------------------------

#[test]
fn idempotent() {
	let mut b = Builder::new("f");
	b.store(Reg(0), 1);
	b.store(Reg(0), 2);
	b.load(Reg(1), Reg(0));
	b.ret(Some(Reg(1).into()));
	let mut f = b.finish().unwrap();

	let mut sink = Capture::new();
	assert_eq!(eliminate_dead_stores(&mut f, &StructuralAlias, &mut sink), 1);
	assert_eq!(eliminate_dead_stores(&mut f, &StructuralAlias, &mut sink), 0);
	assert_eq!(f.num_insts(), 2);
}

#[test]
fn fixpoint_runs_until_clean() {
	let mut b = Builder::new("f");
	let s0 = b.store(Reg(0), 1);
	let s1 = b.store(Reg(0), 2);
	let s2 = b.store(Reg(0), 3);
	b.ret(None);
	let mut f = b.finish().unwrap();

	let mut sink = Capture::new();
	assert_eq!(eliminate_dead_stores_to_fixpoint(&mut f, &StructuralAlias, &mut sink), 2);
	assert!(!f.contains(s0));
	assert!(!f.contains(s1));
	assert!(f.contains(s2));
}

#[test]
fn diagnostics_name_both_stores() {
	let mut b = Builder::new("victim");
	b.store(Reg(0), 1);
	b.store(Reg(0), 2);
	b.ret(None);
	let f = b.finish().unwrap();

	let mssa = MemorySsa::build(&f);
	let mut sink = Capture::new();
	find_dead_stores(&f, &mssa, &StructuralAlias, &mut sink);

	assert_eq!(sink.lines().len(), 1);
	let line = &sink.lines()[0];
	assert!(line.starts_with("victim: dead store:"));
	assert!(line.contains("store     [r0], #1"));
	assert!(line.contains("store     [r0], #2"));
}
