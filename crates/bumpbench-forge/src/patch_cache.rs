//! A process-local cache of fetched PR diffs and of file contents at a
//! commit, so the same patch or POM is never downloaded twice across the
//! many workers racing over a repository's PR list.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Deserialize;

use crate::client::ForgeClient;
use crate::config::Credential;
use bumpbench_util::errors::BumpbenchError;

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
    encoding: String,
}

/// Keyed on `(owner/repo, pull number)`. Tolerant of duplicate-fetch races:
/// two workers racing on the same key both fetch, whichever inserts last
/// wins, and correctness doesn't depend on which.
pub struct PatchCache {
    entries: Mutex<HashMap<(String, u64), String>>,
    file_entries: Mutex<HashMap<(String, String, String), String>>,
}

impl PatchCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            file_entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached diff for `(repo, pull_number)`, fetching and
    /// caching it via `client` if absent.
    pub async fn get_or_fetch(
        &self,
        client: &ForgeClient,
        credential: &Credential,
        repo: &str,
        pull_number: u64,
    ) -> Result<String, BumpbenchError> {
        let key = (repo.to_string(), pull_number);
        if let Some(cached) = self.entries.lock().expect("patch cache mutex poisoned").get(&key) {
            return Ok(cached.clone());
        }

        let path = format!("/repos/{repo}/pulls/{pull_number}.diff");
        let diff = client.get_text(&path, credential).await?;

        self.entries
            .lock()
            .expect("patch cache mutex poisoned")
            .insert(key, diff.clone());
        Ok(diff)
    }

    /// Return the cached content of `path` at `commit_sha` in `repo`,
    /// fetching and base64-decoding it via the Forge's contents API if
    /// absent. Used to resolve `dependencySection` against the POM at the
    /// breaking commit.
    pub async fn get_or_fetch_file(
        &self,
        client: &ForgeClient,
        credential: &Credential,
        repo: &str,
        commit_sha: &str,
        path: &str,
    ) -> Result<String, BumpbenchError> {
        let key = (repo.to_string(), commit_sha.to_string(), path.to_string());
        if let Some(cached) = self.file_entries.lock().expect("patch cache mutex poisoned").get(&key) {
            return Ok(cached.clone());
        }

        let url = format!("/repos/{repo}/contents/{path}?ref={commit_sha}");
        let response: ContentResponse = client.get_json(&url, credential).await?;
        if response.encoding != "base64" {
            return Err(BumpbenchError::Parse {
                message: format!("unexpected content encoding {} for {path}@{commit_sha}", response.encoding),
            });
        }
        let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, response.content.replace('\n', ""))
            .map_err(|e| BumpbenchError::Parse {
                message: format!("failed to decode base64 content for {path}@{commit_sha}: {e}"),
            })?;
        let text = String::from_utf8_lossy(&decoded).to_string();

        self.file_entries
            .lock()
            .expect("patch cache mutex poisoned")
            .insert(key, text.clone());
        Ok(text)
    }

    /// Evict a rejected PR's cached diff, so the cache doesn't keep growing
    /// with patches no miner will ever look at again.
    pub fn remove(&self, repo: &str, pull_number: u64) {
        self.entries
            .lock()
            .expect("patch cache mutex poisoned")
            .remove(&(repo.to_string(), pull_number));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("patch cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PatchCache {
    fn default() -> Self {
        Self::new()
    }
}
