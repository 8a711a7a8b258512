//! Handlers for the `bumpbench-miner` binary's `find`/`mine` subcommands.

use std::path::{Path, PathBuf};

use tracing::info;

use bumpbench_core::repository_index::{default_path, RepositoryIndex};
use bumpbench_core::store::{parse_timestamp, JsonStore};
use bumpbench_forge::client::ForgeClient;
use bumpbench_forge::config::{load_tokens, SearchConfig};
use bumpbench_forge::token_pool::TokenPool;
use bumpbench_miner::miner::Miner;
use bumpbench_util::errors::BumpResult;

use crate::miner_cli::{Cli, Command};
use crate::FORGE_BASE_URL;

pub async fn dispatch(cli: Cli) -> BumpResult<()> {
    match cli.command {
        Command::Find {
            api_tokens,
            output_directory,
            search_config,
            repos,
            last,
        } => find(&api_tokens, &output_directory, &search_config, repos.as_deref(), last.as_deref()).await,
        Command::Mine {
            api_tokens,
            output_directory,
            repos,
        } => mine(&api_tokens, &output_directory, &repos).await,
    }
}

async fn build_miner(api_tokens: &Path, output_directory: &Path, index_path: PathBuf) -> BumpResult<Miner> {
    let tokens = load_tokens(api_tokens)?;
    let client = ForgeClient::new(FORGE_BASE_URL)?;
    let pool = TokenPool::new(&client, tokens).await?;
    let store = JsonStore::new(output_directory);
    Ok(Miner::new(client, pool, store, index_path))
}

async fn find(
    api_tokens: &Path,
    output_directory: &Path,
    search_config: &Path,
    repos: Option<&Path>,
    last: Option<&str>,
) -> BumpResult<()> {
    let index_path = repos.map(Path::to_path_buf).unwrap_or_else(|| default_path(output_directory));
    let miner = build_miner(api_tokens, output_directory, index_path.clone()).await?;
    let search = SearchConfig::load(search_config)?;
    let mut index = RepositoryIndex::load(&index_path)?;

    let resume_from = last.map(parse_timestamp).transpose()?.map(|dt| dt.date_naive());

    miner.find(&mut index, &search, resume_from).await?;
    index.save(&index_path)?;
    info!(repos = index.len(), "discovery complete");
    Ok(())
}

async fn mine(api_tokens: &Path, output_directory: &Path, repos: &Path) -> BumpResult<()> {
    let miner = build_miner(api_tokens, output_directory, repos.to_path_buf()).await?;
    let mut index = RepositoryIndex::load(repos)?;

    let found = miner.mine(&mut index).await?;
    info!(found, "mining pass complete");
    Ok(())
}
