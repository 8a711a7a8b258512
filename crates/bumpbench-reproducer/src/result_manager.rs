//! Filesystem-side bookkeeping for the state machine and the success/
//! unsuccessful paths: partition moves, reproduction logs, extracted
//! dependency artifacts, and the optional cache-repository mirror.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::Engine;

use bumpbench_core::model::BreakingUpdate;
use bumpbench_core::store::{JsonStore, Partition};
use bumpbench_forge::client::ForgeClient;
use bumpbench_forge::config::Credential;
use bumpbench_util::errors::BumpbenchError;
use bumpbench_util::fs::{remove_if_exists, write_atomic};
use bumpbench_util::hash::sha256_hex;

use crate::reproduce::ImageMetadata;

/// Owns the on-disk layout rooted at `--output-directory`/the reproducer's
/// `--benchmark-dir`/`--unsuccessful-reproductions-dir`/`--log-dir`/
/// `--jar-dir` CLI flags.
pub struct ResultManager {
    store: JsonStore,
    log_dir: PathBuf,
    jar_dir: PathBuf,
    metadata_lock: Mutex<()>,
}

impl ResultManager {
    pub fn new(store: JsonStore, log_dir: impl Into<PathBuf>, jar_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            log_dir: log_dir.into(),
            jar_dir: jar_dir.into(),
            metadata_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Where a reproduction log for `commit` lives, split by whether the
    /// reproduction as a whole succeeded.
    pub fn log_path(&self, commit: &str, success: bool) -> PathBuf {
        let subdir = if success {
            "successfulReproductionLogs"
        } else {
            "unsuccessfulReproductionLogs"
        };
        self.log_dir.join(subdir).join(format!("{commit}.log"))
    }

    /// Copy a build log into the successful or unsuccessful log directory.
    pub fn store_log(&self, commit: &str, success: bool, contents: &[u8]) -> Result<(), BumpbenchError> {
        write_atomic(&self.log_path(commit, success), contents)
    }

    /// Undo a previously-written log, used when a later PRE retry succeeds
    /// after an earlier `TEST_FAILURE` speculative write.
    pub fn remove_log(&self, commit: &str, success: bool) -> Result<(), BumpbenchError> {
        remove_if_exists(&self.log_path(commit, success))
    }

    /// Path for an extracted dependency artifact:
    /// `jars/<groupPath>/<version>/<artifactId>-<version>.{jar,pom}`.
    pub fn jar_path(&self, group_id: &str, artifact_id: &str, version: &str, extension: &str) -> PathBuf {
        let group_path = group_id.replace('.', "/");
        self.jar_dir
            .join(group_path)
            .join(version)
            .join(format!("{artifact_id}-{version}.{extension}"))
    }

    /// Write a dependency artifact, skipping the atomic-rename if a file
    /// already sits at `path` with the same digest; many candidates share
    /// the same `<artifactId>-<version>.jar` across repositories.
    pub fn store_jar(&self, path: &Path, contents: &[u8]) -> Result<(), BumpbenchError> {
        if let Ok(existing) = std::fs::read(path) {
            if sha256_hex(&existing) == sha256_hex(contents) {
                return Ok(());
            }
        }
        write_atomic(path, contents)
    }

    /// Move the candidate from `candidates/` into `benchmark/`, the
    /// success path.
    pub fn store_result(&self, candidate: &BreakingUpdate) -> Result<(), BumpbenchError> {
        self.store
            .move_record(&candidate.breaking_commit, Partition::Candidates, Partition::Benchmark, candidate)
    }

    /// Move the candidate from `candidates/` into `unsuccessful/`, for
    /// every non-reproduction outcome.
    pub fn save_unsuccessful(&self, candidate: &BreakingUpdate) -> Result<(), BumpbenchError> {
        self.store
            .move_record(&candidate.breaking_commit, Partition::Candidates, Partition::Unsuccessful, candidate)
    }

    /// Idempotent removal, used when a candidate is discarded as
    /// irrecoverable before either partition write happens.
    pub fn remove_candidate_file(&self, commit: &str) -> Result<(), BumpbenchError> {
        self.store.remove_record(Partition::Candidates, commit)
    }

    /// Merge one commit's folder-size entry into `image_metadata.json`.
    /// Serialized under a process-local lock: the metadata document is the
    /// one shared file not keyed per commit, so concurrent workers would
    /// otherwise lose each other's read-modify-write.
    pub fn merge_image_metadata(&self, commit: &str, entry: ImageMetadata) -> Result<(), BumpbenchError> {
        let _guard = self.metadata_lock.lock().expect("image metadata mutex poisoned");
        let path = self.store.root().join("image_metadata.json");
        let mut document: HashMap<String, ImageMetadata> = self.store.read_json(&path)?.unwrap_or_default();
        document.insert(commit.to_string(), entry);
        self.store.write_json(&path, &document)
    }
}

/// Append-only mirror of reproduction artifacts into a forge-hosted cache
/// repository, one file per commit per push, on a fixed branch. Push
/// failures are the caller's to log; nothing here blocks the pipeline.
pub struct CacheRepo {
    repo: String,
    branch: String,
}

impl CacheRepo {
    const BRANCH: &'static str = "cache";

    /// `repo` is the forge `owner/name` of the cache repository.
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: Self::BRANCH.to_string(),
        }
    }

    /// Commit `bytes` as a new file named `name` on the cache branch via
    /// the forge's contents API. Append-only: an existing file with the
    /// same name makes the forge reject the push.
    pub async fn push_file(
        &self,
        client: &ForgeClient,
        credential: &Credential,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), BumpbenchError> {
        let path = format!("/repos/{}/contents/{name}", self.repo);
        let body = serde_json::json!({
            "message": format!("add {name}"),
            "content": base64::engine::general_purpose::STANDARD.encode(bytes),
            "branch": self.branch,
        });
        client.put_json(&path, credential, &body).await
    }
}
