//! Wire types for the slice of the Forge's pull-request and workflow-run
//! APIs this system actually reads.

use serde::Deserialize;

/// A pull request as returned by `GET /repos/{owner}/{repo}/pulls/{number}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub merged_at: Option<String>,
    pub created_at: String,
    pub user: PullRequestAuthor,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestAuthor {
    pub login: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl PullRequestAuthor {
    /// The Forge marks automation accounts with `"type": "Bot"`.
    pub fn is_bot_account(&self) -> bool {
        self.kind.eq_ignore_ascii_case("bot")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    pub sha: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
}

/// A CI workflow run associated with a commit, as returned by
/// `GET /repos/{owner}/{repo}/actions/runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub head_sha: String,
    pub event: String,
    pub status: String,
    pub conclusion: Option<String>,
}

impl WorkflowRun {
    pub fn is_complete(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }

    pub fn failed(&self) -> bool {
        self.is_complete() && self.conclusion.as_deref() == Some("failure")
    }
}

/// A repository search hit from `GET /search/repositories`, trimmed to the
/// fields the Miner's discovery query needs.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositorySearchHit {
    pub full_name: String,
    pub html_url: String,
    pub stargazers_count: u32,
    pub created_at: String,
    pub default_branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositorySearchResponse {
    pub total_count: u64,
    pub items: Vec<RepositorySearchHit>,
}

/// `GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1`, trimmed to
/// the path list the "does this repository carry a `pom.xml`" probe scans.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeResponse {
    pub tree: Vec<TreeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
}

/// `GET /repos/{owner}/{repo}/actions/runs`. `total_count` alone answers
/// "has this repository ever run CI on a pull request"; the run list backs
/// the per-PR broken-build check.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunsResponse {
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// `GET /repos/{owner}/{repo}/commits/{sha}`, trimmed to the fields the
/// authorship lookups need: the linked Forge account (`None` when the
/// commit author has no account) and the parent commit's sha.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitResponse {
    pub author: Option<PullRequestAuthor>,
    pub parents: Vec<CommitParent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitParent {
    pub sha: String,
}
