
use std::collections::{ BTreeMap, HashMap };

use petgraph::Direction;
use petgraph::dot::{ Config as DotConfig, Dot };
use petgraph::graph::Graph;

use crate::ir::{ BlockId, Function, InstId };

// ------------------------------------------------------------------------------------------------
// Access
// ------------------------------------------------------------------------------------------------

/// Identifies a node of the memory dependence graph within its [`MemorySsa`].
pub type AccessId = usize;

/// The id of the distinguished entry node. Always present, always first.
pub const LIVE_ON_ENTRY: AccessId = 0;

/// A node of the memory dependence graph. Memory is modeled as one abstract state threaded
/// through the function; every instruction that touches memory gets exactly one node, and every
/// `Def` and `Use` names exactly one clobbering access (the nearest dominating write).
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Access {
	/// The memory state on entry to the function.
	LiveOnEntry,

	/// An instruction that (possibly) writes memory. Produces a new memory state.
	Def { inst: InstId, clobber: AccessId },

	/// An instruction that reads memory. Does not change the memory state.
	Use { inst: InstId, clobber: AccessId },

	/// A merge of memory states at a join block, one incoming state per predecessor.
	Phi { block: BlockId, incoming: Vec<(BlockId, AccessId)> },
}

// ------------------------------------------------------------------------------------------------
// MemorySsa
// ------------------------------------------------------------------------------------------------

/// The memory dependence graph of one function. Built once from a function and then queried
/// read-only; mutating the function invalidates it.
pub struct MemorySsa {
	accesses: Vec<Access>,
	by_inst:  HashMap<InstId, AccessId>,
	phis:     BTreeMap<BlockId, AccessId>,
}

impl MemorySsa {
	/// Construct the graph for `func`. Phi nodes are placed at every join (any block with two
	/// or more predecessors), then one sweep over the blocks in reverse postorder threads the
	/// memory state through each block's instructions.
	pub fn build(func: &Function) -> Self {
		let mut ret = Self {
			accesses: vec![Access::LiveOnEntry],
			by_inst:  HashMap::new(),
			phis:     BTreeMap::new(),
		};

		for bb in func.blocks() {
			if preds_of(func, bb.id()).len() >= 2 {
				let id = ret.accesses.len();
				ret.accesses.push(Access::Phi { block: bb.id(), incoming: vec![] });
				ret.phis.insert(bb.id(), id);
			}
		}

		let order = reverse_postorder(func);
		let mut exit_states = HashMap::new();

		for &bbid in order.iter() {
			let mut cur = match ret.phis.get(&bbid) {
				Some(&phi) => phi,
				None if bbid == func.entry() => LIVE_ON_ENTRY,
				None => {
					// exactly one predecessor, or none (unreachable).
					let preds = preds_of(func, bbid);
					preds.first()
						.and_then(|p| exit_states.get(p).copied())
						.unwrap_or(LIVE_ON_ENTRY)
				}
			};

			for &iid in func.block(bbid).insts() {
				let inst = func.inst(iid);

				if inst.writes_memory() {
					let id = ret.accesses.len();
					ret.accesses.push(Access::Def { inst: iid, clobber: cur });
					ret.by_inst.insert(iid, id);
					cur = id;
				} else if inst.reads_memory() {
					let id = ret.accesses.len();
					ret.accesses.push(Access::Use { inst: iid, clobber: cur });
					ret.by_inst.insert(iid, id);
				}
			}

			exit_states.insert(bbid, cur);
		}

		for (&bbid, &phi) in ret.phis.iter() {
			let incoming = preds_of(func, bbid).into_iter()
				.map(|p| (p, exit_states.get(&p).copied().unwrap_or(LIVE_ON_ENTRY)))
				.collect();

			match &mut ret.accesses[phi] {
				Access::Phi { incoming: slot, .. } => *slot = incoming,
				_ => unreachable!("phi id does not name a phi"),
			}
		}

		ret
	}
}

/// A block's predecessors, in ascending id order.
fn preds_of(func: &Function, bbid: BlockId) -> Vec<BlockId> {
	let mut ret = func.cfg().neighbors_directed(bbid, Direction::Incoming).collect::<Vec<_>>();
	ret.sort_unstable();
	ret
}

/// The block ids in reverse postorder from the entry. Unreachable blocks, if any, come last in
/// layout order.
fn reverse_postorder(func: &Function) -> Vec<BlockId> {
	let mut post    = Vec::with_capacity(func.blocks().len());
	let mut visited = vec![false; func.blocks().len()];

	visit(func, func.entry(), &mut visited, &mut post);
	post.reverse();

	for bb in func.blocks() {
		if !visited[bb.id()] {
			post.push(bb.id());
		}
	}

	post
}

fn visit(func: &Function, bbid: BlockId, visited: &mut Vec<bool>, post: &mut Vec<BlockId>) {
	visited[bbid] = true;

	for &succ in func.block(bbid).term().successors() {
		if !visited[succ] {
			visit(func, succ, visited, post);
		}
	}

	post.push(bbid);
}

// ------------------------------------------------------------------------------------------------
// Queries
// ------------------------------------------------------------------------------------------------

impl MemorySsa {
	/// The access for an instruction, if it touches memory.
	pub fn access(&self, inst: InstId) -> Option<AccessId> {
		self.by_inst.get(&inst).copied()
	}

	/// Get the access with the given id.
	pub fn get(&self, a: AccessId) -> &Access {
		&self.accesses[a]
	}

	/// The clobbering access of a `Def` or `Use`, or `None` for the entry node and phis.
	pub fn clobbering_access(&self, a: AccessId) -> Option<AccessId> {
		match self.get(a) {
			Access::Def { clobber, .. } | Access::Use { clobber, .. } => Some(*clobber),
			_ => None,
		}
	}

	/// The instruction behind a `Def` or `Use`.
	pub fn inst(&self, a: AccessId) -> Option<InstId> {
		match self.get(a) {
			Access::Def { inst, .. } | Access::Use { inst, .. } => Some(*inst),
			_ => None,
		}
	}

	///
	pub fn is_def(&self, a: AccessId) -> bool {
		matches!(self.get(a), Access::Def { .. })
	}

	///
	pub fn is_use(&self, a: AccessId) -> bool {
		matches!(self.get(a), Access::Use { .. })
	}

	///
	pub fn is_phi(&self, a: AccessId) -> bool {
		matches!(self.get(a), Access::Phi { .. })
	}

	/// The phi at a join block, if there is one.
	pub fn phi_for_block(&self, bbid: BlockId) -> Option<AccessId> {
		self.phis.get(&bbid).copied()
	}

	/// How many accesses there are, the entry node included.
	pub fn num_accesses(&self) -> usize {
		self.accesses.len()
	}
}

// ------------------------------------------------------------------------------------------------
// Graphviz output
// ------------------------------------------------------------------------------------------------

impl MemorySsa {
	/// Render the graph in Graphviz dot format. One node per access, labeled with the access
	/// kind and its instruction; one edge per clobber link and per phi incoming.
	pub fn to_dot(&self, func: &Function) -> String {
		let mut g = Graph::<String, &str>::new();
		let mut nodes = Vec::with_capacity(self.accesses.len());

		for (id, acc) in self.accesses.iter().enumerate() {
			let label = match acc {
				Access::LiveOnEntry =>
					"liveOnEntry".into(),
				Access::Def { inst, .. } =>
					format!("MemoryDef({}): {:?}", id, func.inst(*inst)),
				Access::Use { inst, .. } =>
					format!("MemoryUse({}): {:?}", id, func.inst(*inst)),
				Access::Phi { block, .. } =>
					format!("MemoryPhi(bb{})", block),
			};

			nodes.push(g.add_node(label));
		}

		for (id, acc) in self.accesses.iter().enumerate() {
			match acc {
				Access::LiveOnEntry => {}
				Access::Def { clobber, .. } | Access::Use { clobber, .. } =>
					{ g.add_edge(nodes[*clobber], nodes[id], ""); }
				Access::Phi { incoming, .. } =>
					for (_, from) in incoming.iter() {
						g.add_edge(nodes[*from], nodes[id], "");
					}
			}
		}

		format!("{:?}", Dot::with_config(&g, &[DotConfig::EdgeNoLabel]))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ir::{ Builder, Reg };

	#[test]
	fn straight_line_chain() {
		let mut b = Builder::new("f");
		let s0 = b.store(Reg(0), 1);
		let l0 = b.load(Reg(1), Reg(0));
		let s1 = b.store(Reg(0), 2);
		b.ret(None);
		let f = b.finish().unwrap();

		let mssa = MemorySsa::build(&f);

		let a0 = mssa.access(s0).unwrap();
		let a1 = mssa.access(l0).unwrap();
		let a2 = mssa.access(s1).unwrap();

		assert!(mssa.is_def(a0));
		assert!(mssa.is_use(a1));
		assert!(mssa.is_def(a2));

		assert_eq!(mssa.clobbering_access(a0), Some(LIVE_ON_ENTRY));
		assert_eq!(mssa.clobbering_access(a1), Some(a0));
		// uses don't advance the memory state, so the second store's clobber is still the
		// first store's def, load or not.
		assert_eq!(mssa.clobbering_access(a2), Some(a0));
	}

	#[test]
	fn call_is_a_def() {
		let mut b = Builder::new("f");
		let s0 = b.store(Reg(0), 1);
		let c0 = b.call(None, "ext");
		let s1 = b.store(Reg(0), 2);
		b.ret(None);
		let f = b.finish().unwrap();

		let mssa = MemorySsa::build(&f);

		let a0 = mssa.access(s0).unwrap();
		let a1 = mssa.access(c0).unwrap();
		let a2 = mssa.access(s1).unwrap();

		assert!(mssa.is_def(a1));
		assert_eq!(mssa.clobbering_access(a1), Some(a0));
		assert_eq!(mssa.clobbering_access(a2), Some(a1));
	}

	#[test]
	fn diamond_phi() {
		// bb0: cbranch -> bb1, bb2; both store, both jump to bb3; bb3 stores.
		let mut b = Builder::new("f");
		b.cond(Reg(9), 1, 2);
		b.block();
		let st = b.store(Reg(0), 1);
		b.jump(3);
		b.block();
		let sf = b.store(Reg(0), 2);
		b.jump(3);
		b.block();
		let sm = b.store(Reg(0), 3);
		b.ret(None);
		let f = b.finish().unwrap();

		let mssa = MemorySsa::build(&f);

		let phi = mssa.phi_for_block(3).unwrap();
		assert!(mssa.is_phi(phi));

		let at = mssa.access(st).unwrap();
		let af = mssa.access(sf).unwrap();
		let am = mssa.access(sm).unwrap();

		match mssa.get(phi) {
			Access::Phi { block, incoming } => {
				assert_eq!(*block, 3);
				assert_eq!(incoming.clone(), vec![(1, at), (2, af)]);
			}
			_ => panic!("not a phi"),
		}

		// the merge block's store is clobbered by the phi, not by either branch store.
		assert_eq!(mssa.clobbering_access(am), Some(phi));
	}

	#[test]
	fn dot_output() {
		let mut b = Builder::new("f");
		b.store(Reg(0), 1);
		b.load(Reg(1), Reg(0));
		b.ret(None);
		let f = b.finish().unwrap();

		let mssa = MemorySsa::build(&f);
		let dot = mssa.to_dot(&f);

		assert!(dot.starts_with("digraph"));
		assert!(dot.contains("liveOnEntry"));
		assert!(dot.contains("MemoryDef(1)"));
		assert!(dot.contains("MemoryUse(2)"));
	}
}
