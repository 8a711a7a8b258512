//! Handler for the `bumpbench-reproduce` binary's `reproduce` subcommand.
//!
//! Runs outside an active `tokio` runtime so `reproduce_candidate` can bridge
//! its Forge-enrichment calls onto a `Handle` without panicking on a nested
//! `block_on`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use bumpbench_container::runner::DockerRunner;
use bumpbench_core::model::BreakingUpdate;
use bumpbench_core::store::JsonStore;
use bumpbench_forge::client::ForgeClient;
use bumpbench_forge::config::{load_tokens, RegistryCredentials};
use bumpbench_forge::token_pool::TokenPool;
use bumpbench_reproducer::reproduce::{reproduce_candidate, ReproductionOutcome};
use bumpbench_reproducer::result_manager::{CacheRepo, ResultManager};
use bumpbench_util::errors::{BumpResult, BumpbenchError};

use crate::reproduce_cli::{Cli, Command};
use crate::FORGE_BASE_URL;

pub fn dispatch(cli: Cli, rt: &tokio::runtime::Handle) -> BumpResult<()> {
    match cli.command {
        Command::Reproduce {
            api_tokens,
            benchmark_dir,
            unsuccessful_reproductions_dir,
            in_progress_reproductions_dir,
            log_dir,
            jar_dir,
            github_packages_credentials,
            file,
            cache_repository,
        } => reproduce(
            &api_tokens,
            &benchmark_dir,
            &unsuccessful_reproductions_dir,
            &in_progress_reproductions_dir,
            &log_dir,
            &jar_dir,
            &github_packages_credentials,
            file.as_deref(),
            cache_repository.as_deref(),
            rt,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn reproduce(
    api_tokens: &Path,
    benchmark_dir: &Path,
    unsuccessful_dir: &Path,
    in_progress_dir: &Path,
    log_dir: &Path,
    jar_dir: &Path,
    registry_credentials: &Path,
    file: Option<&Path>,
    cache_repository: Option<&str>,
    rt: &tokio::runtime::Handle,
) -> BumpResult<()> {
    let tokens = load_tokens(api_tokens)?;
    let registry = RegistryCredentials::load(registry_credentials)?;
    let client = ForgeClient::new(FORGE_BASE_URL)?;
    let pool = rt.block_on(TokenPool::new(&client, tokens))?;

    let store = JsonStore::with_partition_dirs(in_progress_dir, benchmark_dir, unsuccessful_dir);
    let result_manager = ResultManager::new(store, log_dir.to_path_buf(), jar_dir.to_path_buf());
    let runner = DockerRunner::new();
    let cache_repo = cache_repository.map(CacheRepo::new);

    let candidate_paths = match file {
        Some(path) => vec![path.to_path_buf()],
        None => list_candidate_files(in_progress_dir)?,
    };

    let progress = ProgressBar::new(candidate_paths.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("reproducing [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("=> "),
    );

    // One worker per credential: each candidate is processed end-to-end on
    // one thread, pulling the next path off a shared queue.
    let queue: Mutex<VecDeque<PathBuf>> = Mutex::new(candidate_paths.into());
    let workers = pool.size().max(1);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let path = match queue.lock().expect("work queue mutex poisoned").pop_front() {
                    Some(path) => path,
                    None => break,
                };
                reproduce_one(&path, &pool, &client, &registry, &runner, &result_manager, cache_repo.as_ref(), rt);
                progress.inc(1);
            });
        }
    });
    progress.finish_and_clear();

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn reproduce_one(
    path: &Path,
    pool: &TokenPool,
    client: &ForgeClient,
    registry: &RegistryCredentials,
    runner: &DockerRunner,
    result_manager: &ResultManager,
    cache_repo: Option<&CacheRepo>,
    rt: &tokio::runtime::Handle,
) {
    let candidate = match load_candidate(path) {
        Ok(candidate) => candidate,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable candidate");
            return;
        }
    };
    let commit = candidate.breaking_commit.clone();
    let credential = pool.acquire();
    let clone_url = format!(
        "https://github.com/{}/{}.git",
        candidate.project_organisation, candidate.project
    );

    match reproduce_candidate(runner, result_manager, client, &credential, registry, rt, candidate, &clone_url) {
        Ok(ReproductionOutcome::Success(_)) => {
            info!(commit, "reproduced");
            if let Some(cache) = cache_repo {
                push_log_to_cache(cache, client, &credential, result_manager, &commit, rt);
            }
        }
        Ok(ReproductionOutcome::Unsuccessful(_)) => info!(commit, "attempted, not reproduced"),
        Ok(ReproductionOutcome::Irrecoverable { reason }) => {
            warn!(commit, reason, "candidate discarded as irrecoverable");
            if let Err(e) = result_manager.remove_candidate_file(&commit) {
                warn!(commit, error = %e, "failed to remove irrecoverable candidate file");
            }
        }
        Err(e) => warn!(commit, error = %e, "reproduction task failed"),
    }
}

/// Mirror the successful-reproduction log into the cache repository.
/// Logged-only on failure.
fn push_log_to_cache(
    cache: &CacheRepo,
    client: &ForgeClient,
    credential: &bumpbench_forge::config::Credential,
    result_manager: &ResultManager,
    commit: &str,
    rt: &tokio::runtime::Handle,
) {
    let log_path = result_manager.log_path(commit, true);
    match std::fs::read(&log_path) {
        Ok(bytes) => {
            let name = format!("{commit}.log");
            if let Err(e) = rt.block_on(cache.push_file(client, credential, &name, &bytes)) {
                warn!(commit, error = %e, "cache-repository push failed");
            }
        }
        Err(e) => warn!(commit, error = %e, "could not read reproduction log for cache push"),
    }
}

fn list_candidate_files(dir: &Path) -> Result<Vec<PathBuf>, BumpbenchError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}

fn load_candidate(path: &Path) -> Result<BreakingUpdate, BumpbenchError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| BumpbenchError::Parse {
        message: format!("failed to parse candidate {}: {e}", path.display()),
    })
}
