//! The Miner's two public operations, `find` and `mine`, run at parallelism
//! equal to the token pool's size, one `tokio` task per repo.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::{info, warn};

use bumpbench_core::model::BreakingUpdate;
use bumpbench_core::repository_index::RepositoryIndex;
use bumpbench_core::store::{JsonStore, Partition};
use bumpbench_forge::client::ForgeClient;
use bumpbench_forge::config::SearchConfig;
use bumpbench_forge::filters::{breaks_build, changes_only_dependency_version_in_pom_xml, created_before};
use bumpbench_forge::patch_cache::PatchCache;
use bumpbench_forge::token_pool::TokenPool;
use bumpbench_util::errors::BumpbenchError;

use crate::candidate::{build_candidate, split_full_name};

/// Shared, cloneable handle to everything a mining task needs. Cheap to
/// clone: every field is an `Arc` or a plain owned value.
#[derive(Clone)]
pub struct Miner {
    client: Arc<ForgeClient>,
    tokens: Arc<TokenPool>,
    patch_cache: Arc<PatchCache>,
    store: Arc<JsonStore>,
    index_path: Arc<PathBuf>,
}

impl Miner {
    pub fn new(client: ForgeClient, tokens: TokenPool, store: JsonStore, index_path: impl Into<PathBuf>) -> Self {
        Self {
            client: Arc::new(client),
            tokens: Arc::new(tokens),
            patch_cache: Arc::new(PatchCache::new()),
            store: Arc::new(store),
            index_path: Arc::new(index_path.into()),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Populate `index` with repositories matching the search config, one
    /// day at a time, walking backwards from `resume_from` (default: today)
    /// until `earliestCreationDate`. Day-sharding keeps every query under
    /// the Forge's 1000-result search cap; the index is checkpointed after
    /// every day so an interrupted walk can resume where it stopped.
    pub async fn find(
        &self,
        index: &mut RepositoryIndex,
        search: &SearchConfig,
        resume_from: Option<NaiveDate>,
    ) -> Result<(), BumpbenchError> {
        let earliest = NaiveDate::parse_from_str(
            search.earliest_creation_date.split_whitespace().next().unwrap_or(&search.earliest_creation_date),
            "%Y-%m-%d",
        )
        .map_err(|e| BumpbenchError::Config {
            message: format!("invalid earliestCreationDate {}: {e}", search.earliest_creation_date),
        })?;

        let mut day = resume_from.unwrap_or_else(|| Utc::now().date_naive());
        while day >= earliest {
            let credential = self.tokens.acquire();
            let query = search_query(search.min_number_of_stars, day);

            let mut page: u32 = 1;
            loop {
                let response = self.client.search_repositories(&query, page, &credential).await?;
                if response.items.is_empty() {
                    break;
                }
                for hit in &response.items {
                    if index.contains(&hit.full_name) {
                        continue;
                    }
                    let has_pom = self
                        .client
                        .has_pom_xml(&hit.full_name, &hit.default_branch, &credential)
                        .await
                        .unwrap_or(false);
                    if !has_pom {
                        continue;
                    }
                    let has_pr_workflow = self
                        .client
                        .has_pull_request_workflow_runs(&hit.full_name, &credential)
                        .await
                        .unwrap_or(false);
                    if !has_pr_workflow {
                        continue;
                    }
                    index.insert_discovered(hit.full_name.clone(), hit.html_url.clone());
                    info!(repo = %hit.full_name, "discovered repository");
                }
                if response.items.len() < 100 {
                    break;
                }
                page += 1;
            }

            index.save(&self.index_path)?;
            day = day - ChronoDuration::days(1);
        }
        Ok(())
    }

    /// Mine every repository in `index` for candidate breaking updates, one
    /// `tokio` task per repo, at parallelism equal to the token pool's
    /// size.
    pub async fn mine(&self, index: &mut RepositoryIndex) -> Result<usize, BumpbenchError> {
        let repos: Vec<(String, DateTime<Utc>)> = index
            .iter()
            .map(|(full_name, entry)| Ok((full_name.clone(), entry.last_checked_at_instant()?)))
            .collect::<Result<_, BumpbenchError>>()?;

        let mut pending = repos.into_iter();
        let concurrency = self.tokens.size().max(1);
        let mut joinset: JoinSet<Result<(String, usize), BumpbenchError>> = JoinSet::new();
        let mut total_candidates = 0;

        let progress = ProgressBar::new(pending.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("mining [{bar:40.cyan/blue}] {pos}/{len} repos")
                .expect("valid template")
                .progress_chars("=> "),
        );

        for _ in 0..concurrency {
            if let Some((full_name, since)) = pending.next() {
                joinset.spawn(mine_one(self.clone(), full_name, since));
            }
        }

        while let Some(result) = joinset.join_next().await {
            progress.inc(1);
            match result {
                Ok(Ok((full_name, found))) => {
                    total_candidates += found;
                    index.mark_checked(&full_name, Utc::now());
                    index.save(&self.index_path)?;
                }
                Ok(Err(e)) => warn!(error = %e, "mining task failed for a repository"),
                Err(e) => warn!(error = %e, "mining task panicked"),
            }
            if let Some((full_name, since)) = pending.next() {
                joinset.spawn(mine_one(self.clone(), full_name, since));
            }
        }
        progress.finish_and_clear();

        Ok(total_candidates)
    }
}

async fn mine_one(miner: Miner, full_name: String, since: DateTime<Utc>) -> Result<(String, usize), BumpbenchError> {
    let credential = miner.tokens.acquire();
    let (org, project) = split_full_name(&full_name);
    let mut found = 0;
    let mut page: u32 = 1;

    'paging: loop {
        let prs = miner
            .client
            .get_json::<Vec<bumpbench_forge::pr::PullRequest>>(
                &format!("/repos/{full_name}/pulls?state=closed&sort=created&direction=desc&per_page=100&page={page}"),
                &credential,
            )
            .await?;
        if prs.is_empty() {
            break;
        }

        for pr in &prs {
            if created_before(pr, since) {
                break 'paging;
            }

            let diff = match miner
                .patch_cache
                .get_or_fetch(&miner.client, &credential, &full_name, pr.number)
                .await
            {
                Ok(diff) => diff,
                Err(_) => continue,
            };

            let bump = match changes_only_dependency_version_in_pom_xml(&diff) {
                Some(bump) => bump,
                None => {
                    miner.patch_cache.remove(&full_name, pr.number);
                    continue;
                }
            };

            let runs = miner
                .client
                .failed_pr_workflow_runs(&full_name, &pr.head.ref_name, &credential)
                .await
                .unwrap_or_default();

            if !breaks_build(&runs, &pr.head.sha) {
                miner.patch_cache.remove(&full_name, pr.number);
                continue;
            }

            let pom = miner
                .patch_cache
                .get_or_fetch_file(&miner.client, &credential, &full_name, &pr.head.sha, &bump.file_path)
                .await
                .ok()
                .and_then(|xml| bumpbench_pom::parse_pom(&xml).ok());

            let breaking_commit = miner.client.get_commit(&full_name, &pr.head.sha, &credential).await.ok();
            let (breaking_commit_author_is_bot, breaking_commit_author_login) = author_fields(breaking_commit.as_ref());

            let pre_commit = match breaking_commit.as_ref().and_then(|c| c.parents.first()) {
                Some(parent) => miner.client.get_commit(&full_name, &parent.sha, &credential).await.ok(),
                None => None,
            };
            let (pre_commit_author_is_bot, pre_commit_author_login) = author_fields(pre_commit.as_ref());

            let candidate = build_candidate(
                format!("https://github.com/{full_name}/pull/{}", pr.number),
                project.clone(),
                org.clone(),
                pr.head.sha.clone(),
                &bump,
                pom.as_ref(),
                pr.user.is_bot_account(),
                Some(pr.user.login.as_str()),
                pre_commit_author_is_bot,
                pre_commit_author_login.as_deref(),
                breaking_commit_author_is_bot,
                breaking_commit_author_login.as_deref(),
            );
            match write_candidate(&miner, &candidate) {
                Ok(()) => found += 1,
                Err(e) => warn!(
                    repo = %full_name,
                    pr = pr.number,
                    error = %e,
                    "skipping candidate that failed validation or persistence"
                ),
            }
        }

        if prs.len() < 100 {
            break;
        }
        page += 1;
    }

    Ok((full_name, found))
}

/// Pull the `(is_bot, login)` pair the authorship classification needs out
/// of a commit lookup, or `(None, None)` when the commit couldn't be
/// fetched or has no linked Forge account.
fn author_fields(commit: Option<&bumpbench_forge::pr::CommitResponse>) -> (Option<bool>, Option<String>) {
    match commit.and_then(|c| c.author.as_ref()) {
        Some(author) => (Some(author.is_bot_account()), Some(author.login.clone())),
        None => (None, None),
    }
}

fn write_candidate(miner: &Miner, candidate: &BreakingUpdate) -> Result<(), BumpbenchError> {
    candidate.validate()?;
    miner.store.write_record(Partition::Candidates, candidate)
}

/// The repository-search query for one day of `find`'s backwards walk:
/// Java repositories, no forks, at least `min_stars` stars, created on
/// `day`.
fn search_query(min_stars: u32, day: chrono::NaiveDate) -> String {
    format!("language:Java fork:false stars:>={min_stars} created:{day}")
}
