mod alias;
mod diag;
mod dse;
mod ir;
mod memssa;

pub use alias::*;
pub use diag::*;
pub use dse::*;
pub use ir::*;
pub use memssa::*;
