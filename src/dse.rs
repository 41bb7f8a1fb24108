
use log::*;
use smallvec::{ SmallVec };

use crate::alias::{ AliasOracle };
use crate::diag::{ DiagSink };
use crate::ir::{ Function, InstId };
use crate::memssa::{ Access, AccessId, MemorySsa };

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// find_dead_stores
// ------------------------------------------------------------------------------------------------

/// The record of one pass's findings. Most functions have only a handful of dead stores, so the
/// record stays on the stack until it has more than 16.
pub type DeadStores = SmallVec<[InstId; 16]>;

/// Find every store in `func` that is provably dead: overwritten by a later store to the same
/// location with no possible read in between. Reports one line per finding to `sink` and
/// returns the dead stores. Does not modify the function.
///
/// A store S is dead when some later store T has S as its clobbering access in the memory
/// dependence graph, the oracle proves their pointer operands must alias, and no memory read
/// can execute between them. Anything short of that proof leaves S alone: `May` aliasing,
/// a call in between (its def breaks the clobber chain), a phi (some path disagrees about the
/// last write), or an intervening load.
pub fn find_dead_stores(func: &Function, mssa: &MemorySsa, oracle: &dyn AliasOracle,
sink: &mut dyn DiagSink) -> DeadStores {
	let mut dead = DeadStores::new();

	for iid in func.insts_reverse() {
		let inst = func.inst(iid);

		// only stores are candidates.
		let cur_addr = match inst.store_addr() {
			Some(a) => a,
			None    => continue,
		};

		// every store writes memory, so it has a def, and every def has a clobber.
		let cur_acc  = mssa.access(iid).expect("store without a memory access");
		let prev_acc = mssa.clobbering_access(cur_acc).expect("def without a clobbering access");

		// the chain has to bottom out at another store. liveOnEntry means there is no prior
		// write; a phi means the paths disagree about the last write.
		let prev_inst = match mssa.get(prev_acc) {
			Access::Def { inst, .. } => *inst,
			_                        => continue,
		};

		let prev = func.inst(prev_inst);

		// a call def might write anything, so it can't be removed and shields whatever came
		// before it.
		let prev_addr = match prev.store_addr() {
			Some(a) => a,
			None    => continue,
		};

		if !oracle.must_alias(prev_addr, cur_addr) {
			continue;
		}

		if has_intervening_use(func, mssa, prev_acc, cur_acc) {
			continue;
		}

		// two stores can share one clobbering store (e.g. on sibling branches); record it once.
		if dead.contains(&prev_inst) {
			continue;
		}

		debug!("{}: {:?} killed by {:?}", func.name(), prev, inst);
		sink.line(&format!("{}: dead store: {:?} (overwritten by {:?})", func.name(), prev,
			inst));
		dead.push(prev_inst);
	}

	dead
}

/// Can a memory read execute after `prev` but before `cur`? Scans forward in program order over
/// the window bounded by the two accesses. If the window never closes properly (`cur` shows up
/// first, or the end of the function is reached), answers `true`; an unclear window is treated
/// the same as a read.
fn has_intervening_use(func: &Function, mssa: &MemorySsa, prev: AccessId, cur: AccessId) -> bool {
	let mut reached_prev = false;

	for iid in func.insts_forward() {
		let acc = match mssa.access(iid) {
			Some(a) => a,
			None    => continue,
		};

		if acc == prev {
			reached_prev = true;
			continue;
		}

		if !reached_prev {
			if acc == cur {
				return true;
			}
			continue;
		}

		if acc == cur {
			return false;
		}

		if mssa.is_use(acc) {
			return true;
		}
	}

	true
}

// ------------------------------------------------------------------------------------------------
// eliminate_dead_stores
// ------------------------------------------------------------------------------------------------

/// Run one pass over `func`: build its memory dependence graph, find the dead stores, and
/// delete them. Returns how many stores were deleted.
pub fn eliminate_dead_stores(func: &mut Function, oracle: &dyn AliasOracle,
sink: &mut dyn DiagSink) -> usize {
	let mssa = MemorySsa::build(func);
	let dead = find_dead_stores(func, &mssa, oracle, sink);

	for &iid in dead.iter() {
		func.remove_inst(iid);
	}

	dead.len()
}

/// Run [`eliminate_dead_stores`] repeatedly until a pass deletes nothing. Deleting a store can
/// expose a new dead pair whose members were separated by it, so one pass is not always enough;
/// each round rebuilds the graph, so this costs a full pass per round.
pub fn eliminate_dead_stores_to_fixpoint(func: &mut Function, oracle: &dyn AliasOracle,
sink: &mut dyn DiagSink) -> usize {
	let mut total = 0;

	loop {
		let n = eliminate_dead_stores(func, oracle, sink);

		if n == 0 {
			return total;
		}

		total += n;
	}
}
