
use std::error::Error;

use generational_arena::{ Arena };
use parse_display::Display;

use crate::ir::{ BinOp, Block, BlockId, Function, InstId, InstKind, Reg, Src, Term };

// ------------------------------------------------------------------------------------------------
// BuildError
// ------------------------------------------------------------------------------------------------

/// The function-building error type.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum BuildError {
	/// A block was never given a terminator.
	#[display("block bb{bb} has no terminator")]
	Unterminated { bb: BlockId },

	/// A terminator names a block that doesn't exist.
	#[display("block bb{bb} branches to nonexistent block bb{target}")]
	BadTarget { bb: BlockId, target: BlockId },
}

impl Error for BuildError {}

/// Alias for a `Result` with a `BuildError` as its error type.
pub type BuildResult<T> = Result<T, BuildError>;

// ------------------------------------------------------------------------------------------------
// Builder
// ------------------------------------------------------------------------------------------------

struct ProtoBlock {
	insts: Vec<InstId>,
	term:  Option<Term>,
}

/// Helper for building a [`Function`] one instruction at a time. Blocks are numbered in the
/// order they are started; terminators may name blocks that haven't been started yet, and
/// `finish` checks that every named block exists.
pub struct Builder {
	name:   String,
	arena:  Arena<InstKind>,
	blocks: Vec<ProtoBlock>,
	cur:    BlockId,
}

impl Builder {
	/// Constructor. The entry block (bb0) is started automatically.
	pub fn new(name: &str) -> Self {
		Self {
			name:   name.into(),
			arena:  Arena::new(),
			blocks: vec![ProtoBlock { insts: vec![], term: None }],
			cur:    0,
		}
	}

	/// Start a new block and make it current. Returns its id.
	pub fn block(&mut self) -> BlockId {
		let id = self.blocks.len();
		self.blocks.push(ProtoBlock { insts: vec![], term: None });
		self.cur = id;
		id
	}

	/// Finish building. Validates that every block is terminated and every branch target
	/// exists, then derives the CFG.
	pub fn finish(self) -> BuildResult<Function> {
		let num_blocks = self.blocks.len();
		let mut blocks = Vec::with_capacity(num_blocks);

		for (id, proto) in self.blocks.into_iter().enumerate() {
			let term = proto.term.ok_or(BuildError::Unterminated { bb: id })?;

			for &target in term.successors() {
				if target >= num_blocks {
					return Err(BuildError::BadTarget { bb: id, target });
				}
			}

			blocks.push(Block::new(id, proto.insts, term));
		}

		Ok(Function::new(self.name, self.arena, blocks))
	}
}

// ------------------------------------------------------------------------------------------------
// Instructions
// ------------------------------------------------------------------------------------------------

impl Builder {
	///
	pub fn assign(&mut self, dst: Reg, src: impl Into<Src>) -> InstId {
		self.inst(InstKind::Assign { dst, src: src.into() })
	}

	///
	pub fn binary(&mut self, dst: Reg, op: BinOp, src1: impl Into<Src>, src2: impl Into<Src>)
	-> InstId {
		self.inst(InstKind::Binary { dst, op, src1: src1.into(), src2: src2.into() })
	}

	///
	pub fn load(&mut self, dst: Reg, addr: impl Into<Src>) -> InstId {
		self.inst(InstKind::Load { dst, addr: addr.into() })
	}

	///
	pub fn store(&mut self, addr: impl Into<Src>, src: impl Into<Src>) -> InstId {
		self.inst(InstKind::Store { addr: addr.into(), src: src.into() })
	}

	///
	pub fn call(&mut self, dst: Option<Reg>, callee: &str) -> InstId {
		self.inst(InstKind::Call { dst, callee: callee.into() })
	}

	fn inst(&mut self, kind: InstKind) -> InstId {
		let bb = &mut self.blocks[self.cur];
		assert!(bb.term.is_none(), "appending to terminated block bb{}", self.cur);

		let id = InstId(self.arena.insert(kind));
		bb.insts.push(id);
		id
	}
}

// ------------------------------------------------------------------------------------------------
// Terminators
// ------------------------------------------------------------------------------------------------

impl Builder {
	///
	pub fn jump(&mut self, target: BlockId) {
		self.term(Term::Jump(target));
	}

	///
	pub fn cond(&mut self, cond: impl Into<Src>, t: BlockId, f: BlockId) {
		self.term(Term::Cond { cond: cond.into(), t, f });
	}

	///
	pub fn ret(&mut self, val: Option<Src>) {
		self.term(Term::Ret(val));
	}

	fn term(&mut self, term: Term) {
		let bb = &mut self.blocks[self.cur];
		assert!(bb.term.is_none(), "block bb{} already terminated", self.cur);
		bb.term = Some(term);
	}
}
