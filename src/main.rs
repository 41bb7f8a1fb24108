
use simplelog::*;

use dselim::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
	SimpleLogger::init(LevelFilter::Debug, Config::default())?;

	demo("straight_line", straight_line()?)?;
	demo("diamond", diamond()?)?;
	Ok(())
}

fn demo(what: &str, mut func: Function) -> Result<(), Box<dyn std::error::Error>> {
	println!("==================== {} ====================", what);
	println!();
	println!("{:?}", func);

	let mssa = MemorySsa::build(&func);
	println!("memory dependence graph:");
	println!("{}", mssa.to_dot(&func));

	let n = eliminate_dead_stores_to_fixpoint(&mut func, &StructuralAlias, &mut LogSink);

	println!("eliminated {} dead store(s):", n);
	println!();
	println!("{:?}", func);
	Ok(())
}

/// A run of stores to one location with a read in the middle. The first store dies; the pair
/// around the load survives.
fn straight_line() -> BuildResult<Function> {
	let mut b = Builder::new("straight_line");
	b.assign(Reg(0), 0x100);
	b.store(Reg(0), 1);
	b.store(Reg(0), 2);
	b.load(Reg(1), Reg(0));
	b.store(Reg(0), 3);
	b.ret(Some(Reg(1).into()));
	b.finish()
}

/// Stores on both sides of a branch plus one after the join. Nothing dies: the join store's
/// last write is a merge of the two branch stores.
fn diamond() -> BuildResult<Function> {
	let mut b = Builder::new("diamond");
	b.assign(Reg(0), 0x200);
	b.binary(Reg(2), BinOp::Lt, Reg(1), 10);
	b.cond(Reg(2), 1, 2);
	b.block();
	b.store(Reg(0), 1);
	b.jump(3);
	b.block();
	b.store(Reg(0), 2);
	b.jump(3);
	b.block();
	b.store(Reg(0), 3);
	b.ret(None);
	b.finish()
}
