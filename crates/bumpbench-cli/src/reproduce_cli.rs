//! CLI argument definitions for the reproducer binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bumpbench-reproduce",
    version,
    about = "Verify, classify, and publish reproductions of mined breaking dependency updates"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reproduce every candidate awaiting reproduction, or one explicit candidate file
    Reproduce {
        /// Path to the Forge API token file
        #[arg(long)]
        api_tokens: PathBuf,
        /// Directory reproduced records are moved into
        #[arg(long)]
        benchmark_dir: PathBuf,
        /// Directory attempted-but-not-reproduced records are moved into
        #[arg(long)]
        unsuccessful_reproductions_dir: PathBuf,
        /// Directory candidates awaiting reproduction are read from
        #[arg(long)]
        in_progress_reproductions_dir: PathBuf,
        /// Directory for `successfulReproductionLogs/` and `unsuccessfulReproductionLogs/`
        #[arg(long)]
        log_dir: PathBuf,
        /// Directory for extracted dependency jars/poms
        #[arg(long)]
        jar_dir: PathBuf,
        /// Registry credentials JSON (`{ userName, identityToken, repository }`)
        #[arg(long)]
        github_packages_credentials: PathBuf,
        /// Reproduce a single candidate file instead of the whole in-progress directory
        #[arg(long)]
        file: Option<PathBuf>,
        /// Forge repository (`owner/name`) to mirror reproduction logs into, append-only
        #[arg(long)]
        cache_repository: Option<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
