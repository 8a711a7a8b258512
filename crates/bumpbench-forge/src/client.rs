//! A thin authenticated HTTP client over the Forge's REST API, with the
//! rate-limit and abuse-limit back-off hooks built into every call.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use bumpbench_util::errors::BumpbenchError;

use crate::config::Credential;
use crate::token_pool::{ABUSE_BACKOFF, RATE_LIMIT_CUTOFF};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ATTEMPTS: u32 = 3;

/// A thin wrapper over `reqwest::Client` pointed at one Forge API base URL.
pub struct ForgeClient {
    http: Client,
    base_url: String,
}

impl ForgeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BumpbenchError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("bumpbench/0.2")
            .build()
            .map_err(|e| BumpbenchError::Forge {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        }
    }

    /// A lightweight authenticated call used only to admit or reject a
    /// credential during `TokenPool::new`.
    pub async fn validate_credential(&self, credential: &Credential) -> bool {
        match self
            .http
            .get(self.url("/user"))
            .bearer_auth(&credential.0)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// GET a JSON resource, decoding the body into `T`. Applies the
    /// rate-limit and abuse-limit hooks, retrying up to `MAX_ATTEMPTS`
    /// times on a transient response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: &Credential,
    ) -> Result<T, BumpbenchError> {
        let bytes = self.get_with_hooks(path, credential, "application/vnd.github+json").await?;
        serde_json::from_slice(&bytes).map_err(|e| BumpbenchError::Parse {
            message: format!("failed to parse Forge response from {path}: {e}"),
        })
    }

    /// GET a plain-text resource (a unified diff, a raw file).
    pub async fn get_text(&self, path: &str, credential: &Credential) -> Result<String, BumpbenchError> {
        let bytes = self.get_with_hooks(path, credential, "text/plain").await?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// Page through `GET /search/repositories` for the Miner's repository
    /// discovery query, one page per call.
    pub async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        credential: &Credential,
    ) -> Result<crate::pr::RepositorySearchResponse, BumpbenchError> {
        let path = format!(
            "/search/repositories?q={}&sort=stars&order=desc&per_page=100&page={page}",
            urlencode(query)
        );
        self.get_json(&path, credential).await
    }

    /// Repository-eligibility probe: does the default branch's tree contain
    /// a path with `pom.xml` in it, anywhere.
    pub async fn has_pom_xml(&self, repo: &str, default_branch: &str, credential: &Credential) -> Result<bool, BumpbenchError> {
        let path = format!("/repos/{repo}/git/trees/{default_branch}?recursive=1");
        let tree: crate::pr::TreeResponse = self.get_json(&path, credential).await?;
        Ok(tree.tree.iter().any(|entry| entry.path.contains("pom.xml")))
    }

    /// Repository-eligibility probe: has at least one workflow run ever
    /// fired on a `pull_request` event.
    pub async fn has_pull_request_workflow_runs(&self, repo: &str, credential: &Credential) -> Result<bool, BumpbenchError> {
        let path = format!("/repos/{repo}/actions/runs?event=pull_request&per_page=1");
        let runs: crate::pr::WorkflowRunsResponse = self.get_json(&path, credential).await?;
        Ok(runs.total_count > 0)
    }

    /// Completed, failed workflow runs fired by a `pull_request` event on
    /// `branch`. The broken-build filter matches their `head_sha` against a
    /// specific PR head.
    pub async fn failed_pr_workflow_runs(
        &self,
        repo: &str,
        branch: &str,
        credential: &Credential,
    ) -> Result<Vec<crate::pr::WorkflowRun>, BumpbenchError> {
        let path = format!(
            "/repos/{repo}/actions/runs?event=pull_request&status=failure&branch={branch}&per_page=100"
        );
        let runs: crate::pr::WorkflowRunsResponse = self.get_json(&path, credential).await?;
        Ok(runs.workflow_runs)
    }

    /// Authorship lookup: the commit at `sha`, with its linked Forge
    /// account (if any) and its first parent's sha.
    pub async fn get_commit(&self, repo: &str, sha: &str, credential: &Credential) -> Result<crate::pr::CommitResponse, BumpbenchError> {
        let path = format!("/repos/{repo}/commits/{sha}");
        self.get_json(&path, credential).await
    }

    /// PUT a JSON body, used by the cache-repository file push. Success is
    /// any 2xx; the response body is discarded.
    pub async fn put_json(
        &self,
        path: &str,
        credential: &Credential,
        body: &serde_json::Value,
    ) -> Result<(), BumpbenchError> {
        let url = self.url(path);
        let resp = self
            .http
            .put(&url)
            .bearer_auth(&credential.0)
            .header("Accept", "application/vnd.github+json")
            .json(body)
            .send()
            .await
            .map_err(|e| BumpbenchError::Forge {
                message: format!("PUT {url} failed: {e}"),
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BumpbenchError::Forge {
                message: format!("HTTP {status} from {url}"),
            });
        }
        Ok(())
    }

    /// HEAD a resource, reporting whether it exists. Used by best-effort
    /// enrichment lookups (compare links, Central source jars).
    pub async fn head_exists(&self, path: &str, credential: &Credential) -> Result<bool, BumpbenchError> {
        let resp = self
            .http
            .head(self.url(path))
            .bearer_auth(&credential.0)
            .send()
            .await
            .map_err(|e| BumpbenchError::Forge {
                message: format!("HEAD {path} failed: {e}"),
            })?;
        Ok(resp.status() != StatusCode::NOT_FOUND && resp.status().is_success())
    }

    async fn get_with_hooks(
        &self,
        path: &str,
        credential: &Credential,
        accept: &str,
    ) -> Result<Vec<u8>, BumpbenchError> {
        let url = self.url(path);
        let mut last_err = String::new();

        for _attempt in 0..MAX_ATTEMPTS {
            let resp = self
                .http
                .get(&url)
                .bearer_auth(&credential.0)
                .header("Accept", accept)
                .send()
                .await;

            let resp = match resp {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = e.to_string();
                    continue;
                }
                Err(e) => {
                    return Err(BumpbenchError::Forge {
                        message: format!("request to {url} failed: {e}"),
                    })
                }
            };

            if is_abuse_limited(&resp) {
                warn!(url = %url, "Forge abuse-limit hit, backing off {ABUSE_BACKOFF:?}");
                tokio::time::sleep(ABUSE_BACKOFF).await;
                continue;
            }

            if let Some(wait) = rate_limit_wait(&resp) {
                info!(url = %url, wait = ?wait, "Forge rate-limit budget low, sleeping until reset");
                tokio::time::sleep(wait).await;
                continue;
            }

            let status = resp.status();
            if status.is_server_error() {
                last_err = format!("HTTP {status} from {url}");
                continue;
            }
            if !status.is_success() {
                return Err(BumpbenchError::Forge {
                    message: format!("HTTP {status} from {url}"),
                });
            }

            return resp
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| BumpbenchError::Forge {
                    message: format!("failed to read response from {url}: {e}"),
                });
        }

        Err(BumpbenchError::Forge {
            message: format!("exhausted {MAX_ATTEMPTS} attempts for {url}: {last_err}"),
        })
    }
}

fn urlencode(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            ' ' => "+".to_string(),
            other => other.to_string().bytes().map(|b| format!("%{b:02X}")).collect(),
        })
        .collect()
}

fn is_abuse_limited(resp: &reqwest::Response) -> bool {
    resp.status() == StatusCode::FORBIDDEN
        && resp
            .headers()
            .get("retry-after")
            .is_some()
}

/// If the remaining rate-limit budget is below the cutoff, return how long
/// to sleep until it resets.
fn rate_limit_wait(resp: &reqwest::Response) -> Option<Duration> {
    let remaining: u32 = resp
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())?;
    if remaining >= RATE_LIMIT_CUTOFF {
        return None;
    }
    let reset_epoch: i64 = resp
        .headers()
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())?;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let wait_secs = (reset_epoch - now).max(0) as u64;
    Some(Duration::from_secs(wait_secs))
}
