//! CLI argument definitions for the miner binary: `find` discovers
//! candidate repositories, `mine` walks their pull requests for breaking
//! updates.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bumpbench-miner",
    version,
    about = "Discover and mine Java/Maven repositories for breaking dependency updates"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover repositories matching a search config into the repository index
    Find {
        /// Path to the Forge API token file
        #[arg(long)]
        api_tokens: PathBuf,
        /// Root directory for `repositoryIndex.json`
        #[arg(long)]
        output_directory: PathBuf,
        /// Path to the search config JSON (`minNumberOfStars`, `earliestCreationDate`)
        #[arg(long)]
        search_config: PathBuf,
        /// Pre-existing repository index to resume from, if not under `output-directory`
        #[arg(long)]
        repos: Option<PathBuf>,
        /// Resume the backwards day-by-day walk from this timestamp instead of today (`yyyy-MM-dd HH:mm:ss`)
        #[arg(long)]
        last: Option<String>,
    },

    /// Walk every repository in the index for candidate breaking updates
    Mine {
        /// Path to the Forge API token file
        #[arg(long)]
        api_tokens: PathBuf,
        /// Root directory candidates are written under (`candidates/<commit>.json`)
        #[arg(long)]
        output_directory: PathBuf,
        /// Repository index to mine
        #[arg(long)]
        repos: PathBuf,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
