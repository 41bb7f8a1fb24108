
use std::collections::BTreeMap;

use crate::ir::{ Reg, Src };

// ------------------------------------------------------------------------------------------------
// AliasResult
// ------------------------------------------------------------------------------------------------

/// What an oracle knows about two pointer values.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum AliasResult {
	/// Provably different locations.
	No,
	/// Might be the same location. The conservative answer.
	May,
	/// Provably the same location.
	Must,
}

// ------------------------------------------------------------------------------------------------
// AliasOracle
// ------------------------------------------------------------------------------------------------

/// Answers aliasing queries about pointer operands. The dead store pass only ever acts on a
/// `Must` answer; everything else makes it leave the code alone.
pub trait AliasOracle {
	/// What is the relationship between the locations `a` and `b` point at?
	fn alias(&self, a: &Src, b: &Src) -> AliasResult;

	/// Do `a` and `b` provably point at the same location?
	fn must_alias(&self, a: &Src, b: &Src) -> bool {
		self.alias(a, b) == AliasResult::Must
	}
}

// ------------------------------------------------------------------------------------------------
// StructuralAlias
// ------------------------------------------------------------------------------------------------

/// The baseline oracle: syntactically identical operands must alias, two different constant
/// addresses cannot, and anything else may.
pub struct StructuralAlias;

impl AliasOracle for StructuralAlias {
	fn alias(&self, a: &Src, b: &Src) -> AliasResult {
		match (a, b) {
			_ if a == b                    => AliasResult::Must,
			(Src::Const(_), Src::Const(_)) => AliasResult::No,
			_                              => AliasResult::May,
		}
	}
}

// ------------------------------------------------------------------------------------------------
// DeclaredAlias
// ------------------------------------------------------------------------------------------------

/// An oracle with explicit pairwise facts about registers, for hosts (and tests) that know more
/// than the structure of the code shows. Pairs without a declared fact fall back to
/// [`StructuralAlias`].
#[derive(Default)]
pub struct DeclaredAlias {
	facts: BTreeMap<(Reg, Reg), AliasResult>,
}

impl DeclaredAlias {
	///
	pub fn new() -> Self {
		Self::default()
	}

	/// Declare the relationship between two registers. Symmetric; declaring (a, b) also
	/// declares (b, a).
	pub fn declare(&mut self, a: Reg, b: Reg, res: AliasResult) {
		self.facts.insert((a, b), res);
		self.facts.insert((b, a), res);
	}
}

impl AliasOracle for DeclaredAlias {
	fn alias(&self, a: &Src, b: &Src) -> AliasResult {
		if let (Src::Reg(ra), Src::Reg(rb)) = (a, b) {
			if let Some(&res) = self.facts.get(&(*ra, *rb)) {
				return res;
			}
		}

		StructuralAlias.alias(a, b)
	}
}
