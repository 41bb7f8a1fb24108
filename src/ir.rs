
use std::fmt::{ Debug, Formatter, Result as FmtResult };
use std::iter::Chain;
use std::option;
use std::slice;

use generational_arena::{ Arena, Index };
use petgraph::graphmap::{ DiGraphMap };

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod builder;

pub use builder::*;

// ------------------------------------------------------------------------------------------------
// Reg
// ------------------------------------------------------------------------------------------------

/// A virtual register. Registers are value names; the only way to touch memory is through
/// [`InstKind::Load`] and [`InstKind::Store`].
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Reg(pub u16);

impl Debug for Reg {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "r{}", self.0)
	}
}

// ------------------------------------------------------------------------------------------------
// Src
// ------------------------------------------------------------------------------------------------

/// The source of a value: either a register or an integer constant.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum Src {
	Reg(Reg),
	Const(i64),
}

impl Debug for Src {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Src::Reg(r)   => write!(f, "{:?}", r),
			Src::Const(c) => write!(f, "#{}", c),
		}
	}
}

impl From<Reg> for Src {
	fn from(r: Reg) -> Self {
		Src::Reg(r)
	}
}

impl From<i64> for Src {
	fn from(c: i64) -> Self {
		Src::Const(c)
	}
}

// so integer literals work as operands without a suffix.
impl From<i32> for Src {
	fn from(c: i32) -> Self {
		Src::Const(c.into())
	}
}

// ------------------------------------------------------------------------------------------------
// BinOp
// ------------------------------------------------------------------------------------------------

/// Binary operations. A small set; the dead store pass never interprets these.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinOp {
	Add, // dst = s1 + s2
	Sub, // dst = s1 - s2
	Mul, // dst = s1 * s2
	Eq,  // dst = s1 == s2
	Lt,  // dst = s1 < s2
}

impl BinOp {
	fn name(&self) -> &'static str {
		match self {
			BinOp::Add => "add",
			BinOp::Sub => "sub",
			BinOp::Mul => "mul",
			BinOp::Eq  => "eq",
			BinOp::Lt  => "lt",
		}
	}
}

// ------------------------------------------------------------------------------------------------
// InstId
// ------------------------------------------------------------------------------------------------

/// Uniquely identifies an instruction within its [`Function`]. Identities are generational, so
/// an id for a removed instruction is stale and detectably invalid rather than silently reused.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub struct InstId(pub Index);

impl Debug for InstId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let (index, generation) = self.0.into_raw_parts();
		write!(f, "InstId({}, {})", index, generation)
	}
}

// ------------------------------------------------------------------------------------------------
// InstKind
// ------------------------------------------------------------------------------------------------

/// The kinds of instructions.
#[derive(PartialEq, Eq, Clone)]
pub enum InstKind {
	Assign { dst: Reg, src: Src },                       // dst = src
	Binary { dst: Reg, op: BinOp, src1: Src, src2: Src }, // dst = src1 op src2
	Load   { dst: Reg, addr: Src },                      // dst = *addr
	Store  { addr: Src, src: Src },                      // *addr = src
	Call   { dst: Option<Reg>, callee: String },         // dst = callee(); clobbers memory
}

impl Debug for InstKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		use InstKind::*;

		match self {
			Assign { dst, src } =>
				write!(f, "mov       {:?}, {:?}", dst, src),
			Binary { dst, op, src1, src2 } =>
				write!(f, "{:<9} {:?}, {:?}, {:?}", op.name(), dst, src1, src2),
			Load { dst, addr } =>
				write!(f, "load      {:?}, [{:?}]", dst, addr),
			Store { addr, src } =>
				write!(f, "store     [{:?}], {:?}", addr, src),
			Call { dst: Some(dst), callee } =>
				write!(f, "call      {:?}, {}", dst, callee),
			Call { dst: None, callee } =>
				write!(f, "call      {}", callee),
		}
	}
}

impl InstKind {
	/// Is this a store instruction?
	pub fn is_store(&self) -> bool {
		matches!(self, InstKind::Store { .. })
	}

	/// The pointer operand of a store, or `None` for anything else.
	pub fn store_addr(&self) -> Option<&Src> {
		match self {
			InstKind::Store { addr, .. } => Some(addr),
			_                            => None,
		}
	}

	/// The stored value of a store, or `None` for anything else.
	pub fn store_src(&self) -> Option<&Src> {
		match self {
			InstKind::Store { src, .. } => Some(src),
			_                           => None,
		}
	}

	/// `true` if executing this instruction can read memory.
	pub fn reads_memory(&self) -> bool {
		matches!(self, InstKind::Load { .. })
	}

	/// `true` if executing this instruction can write memory. Calls count: a callee can write
	/// anything, so they clobber the whole memory state.
	pub fn writes_memory(&self) -> bool {
		matches!(self, InstKind::Store { .. } | InstKind::Call { .. })
	}
}

// ------------------------------------------------------------------------------------------------
// Term
// ------------------------------------------------------------------------------------------------

/// A block id. Blocks are numbered densely in layout order; block 0 is the entry.
pub type BlockId = usize;

/// The kinds of terminators for a [`Block`].
#[derive(Clone, PartialEq, Eq)]
pub enum Term {
	/// Unconditional jump.
	Jump(BlockId),
	/// Conditional branch.
	Cond { cond: Src, t: BlockId, f: BlockId },
	/// Return, with an optional value.
	Ret(Option<Src>),
}

/// Iterator type of `Term`'s successors.
pub type Successors<'a> = Chain<option::IntoIter<&'a BlockId>, slice::Iter<'a, BlockId>>;

impl Term {
	/// An iterator over the owning block's successors.
	pub fn successors(&'_ self) -> Successors<'_> {
		use Term::*;

		match self {
			Ret(..)           => None   .into_iter().chain(&[]),
			Jump(dst)         => Some(dst).into_iter().chain(&[]),
			Cond { t, f, .. } => Some(t).into_iter().chain(slice::from_ref(f)),
		}
	}
}

impl Debug for Term {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Term::Jump(dst)               => write!(f, "jump      bb{}", dst),
			Term::Cond { cond, t, f: ff } => write!(f, "cbranch   {:?}, bb{}, bb{}", cond, t, ff),
			Term::Ret(Some(val))          => write!(f, "ret       {:?}", val),
			Term::Ret(None)               => write!(f, "ret"),
		}
	}
}

// ------------------------------------------------------------------------------------------------
// Block
// ------------------------------------------------------------------------------------------------

/// A basic block: an ordered list of instruction ids and a terminator.
#[derive(Clone)]
pub struct Block {
	id:    BlockId,
	insts: Vec<InstId>,
	term:  Term,
}

impl Block {
	pub(crate) fn new(id: BlockId, insts: Vec<InstId>, term: Term) -> Self {
		Self { id, insts, term }
	}

	/// Its id.
	pub fn id(&self) -> BlockId {
		self.id
	}

	/// Its instructions, in program order.
	pub fn insts(&self) -> &[InstId] {
		&self.insts
	}

	/// How it ends.
	pub fn term(&self) -> &Term {
		&self.term
	}
}

// ------------------------------------------------------------------------------------------------
// Function
// ------------------------------------------------------------------------------------------------

/// The control-flow graph of a function.
pub type Cfg = DiGraphMap<BlockId, ()>;

/// A single function: instruction storage, blocks in layout order, and the CFG derived from
/// the block terminators. The first block is the entry.
pub struct Function {
	name:   String,
	arena:  Arena<InstKind>,
	blocks: Vec<Block>,
	cfg:    Cfg,
}

impl Function {
	pub(crate) fn new(name: String, arena: Arena<InstKind>, blocks: Vec<Block>) -> Self {
		let mut cfg = Cfg::new();

		for bb in blocks.iter() {
			cfg.add_node(bb.id());
		}

		for bb in blocks.iter() {
			for &succ in bb.term().successors() {
				cfg.add_edge(bb.id(), succ, ());
			}
		}

		Self { name, arena, blocks, cfg }
	}

	/// Its name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The entry block's id.
	pub fn entry(&self) -> BlockId {
		0
	}

	/// Its blocks, in layout order.
	pub fn blocks(&self) -> &[Block] {
		&self.blocks
	}

	/// Get the block with the given id.
	pub fn block(&self, id: BlockId) -> &Block {
		&self.blocks[id]
	}

	/// The CFG over its blocks.
	pub fn cfg(&self) -> &Cfg {
		&self.cfg
	}

	/// How many instructions it currently has.
	pub fn num_insts(&self) -> usize {
		self.arena.len()
	}

	/// Gets the instruction with the given id. Panics on a stale id.
	pub fn inst(&self, id: InstId) -> &InstKind {
		self.arena.get(id.0).expect("stale InstId")
	}

	/// `true` if the id refers to a live instruction of this function.
	pub fn contains(&self, id: InstId) -> bool {
		self.arena.contains(id.0)
	}

	/// Iterator over all instruction ids in forward program order (layout order of blocks,
	/// then instruction order within each block).
	pub fn insts_forward(&self) -> impl Iterator<Item = InstId> + '_ {
		self.blocks.iter().flat_map(|bb| bb.insts.iter().copied())
	}

	/// Iterator over all instruction ids in reverse program order (block layout order reversed,
	/// instruction order within each block reversed).
	pub fn insts_reverse(&self) -> impl Iterator<Item = InstId> + '_ {
		self.blocks.iter().rev().flat_map(|bb| bb.insts.iter().rev().copied())
	}

	/// Remove the instruction with the given id from its block and free its slot. Panics on a
	/// stale id; removing the same instruction twice is a contract violation, not an error to
	/// be handled.
	pub fn remove_inst(&mut self, id: InstId) {
		self.arena.remove(id.0).expect("removing instruction twice");

		// linear over the blocks, but removal happens once per dead store at the very end
		// of a pass.
		for bb in self.blocks.iter_mut() {
			if let Some(pos) = bb.insts.iter().position(|&i| i == id) {
				bb.insts.remove(pos);
				return;
			}
		}

		unreachable!("live instruction not owned by any block");
	}
}

impl Debug for Function {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		writeln!(f, "fn {}:", self.name)?;

		for bb in self.blocks.iter() {
			writeln!(f, "bb{}:", bb.id())?;

			for &iid in bb.insts() {
				writeln!(f, "    {:?}", self.inst(iid))?;
			}

			writeln!(f, "    {:?}", bb.term())?;
		}

		Ok(())
	}
}
