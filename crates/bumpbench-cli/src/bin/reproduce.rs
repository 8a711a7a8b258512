//! `bumpbench-reproduce` binary: the `reproduce` subcommand.
//!
//! Deliberately a plain, non-async `main`: `reproduce_candidate` bridges its
//! own async calls onto a `tokio::runtime::Handle`, which panics if invoked
//! from a thread already driving that runtime's `block_on`.

use miette::Result;

fn main() -> Result<()> {
    bumpbench_util::logging::init();

    let runtime = tokio::runtime::Runtime::new().map_err(bumpbench_util::errors::BumpbenchError::Io)?;
    let args = bumpbench_cli::reproduce_cli::parse();
    bumpbench_cli::commands::reproduce::dispatch(args, runtime.handle())
}
