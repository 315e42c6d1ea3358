//! Two phases over two stacks: every lane pushes its index into `in`, then
//! every lane pops one value from `in` and pushes `lane * 100 + value` into
//! `out`. `out` is drained and printed at the end.
//!
//! ```bash
//! RUST_LOG=lane_stack=debug cargo run --example in_out -- --lanes 16 --allocator pool
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use lane_stack::{lanes::parallel_for, AtomicCursorStack, Allocator, HostAllocator, MemoryPool};
use tracing_subscriber::EnvFilter;

const POOL_WORDS_PER_BLOCK: usize = 128;
static POOL: MemoryPool<{ 2 * POOL_WORDS_PER_BLOCK }> = MemoryPool::new(POOL_WORDS_PER_BLOCK);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Region {
    /// Process heap.
    Host,
    /// Static memory pool of two blocks.
    Pool,
}

#[derive(Debug, Parser)]
#[command(about = "Run the in/out lane demonstration")]
struct Args {
    /// Number of lanes, which is also the capacity of both stacks.
    #[arg(long, env = "LANE_STACK_LANES", default_value_t = 10)]
    lanes: usize,

    /// Where the stack buffers live.
    #[arg(long, value_enum, default_value_t = Region::Host)]
    allocator: Region,
}

fn run<A: Allocator + Sync>(lanes: usize, input: A, output: A) -> anyhow::Result<Vec<usize>> {
    let stack_in = AtomicCursorStack::<usize, A>::new_in(lanes, input).context("allocating `in`")?;
    let mut stack_out =
        AtomicCursorStack::<usize, A>::new_in(lanes, output).context("allocating `out`")?;

    // SAFETY: each phase issues exactly `lanes` pushes or pops against
    // `lanes` slots, and `parallel_for` returns only after every lane is done.
    parallel_for(lanes, |lane| unsafe { stack_in.push(lane) });
    parallel_for(lanes, |lane| unsafe { stack_out.push(lane * 100 + stack_in.pop()) });

    Ok(stack_out.drain().collect())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::info!(lanes = args.lanes, allocator = ?args.allocator, "starting");

    let out = match args.allocator {
        Region::Host => run(args.lanes, HostAllocator, HostAllocator)?,
        Region::Pool => run(args.lanes, &POOL, &POOL)?,
    };

    println!("Out");
    for value in out {
        println!("{value}");
    }
    Ok(())
}
