//! `bumpbench-miner` binary: `find` and `mine` subcommands.

use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    bumpbench_util::logging::init();

    let args = bumpbench_cli::miner_cli::parse();
    bumpbench_cli::commands::miner::dispatch(args).await
}
