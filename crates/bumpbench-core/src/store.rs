//! The JSON document store: one file per key, atomic rewrite, and the
//! three on-disk partitions a `BreakingUpdate` record moves through.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use bumpbench_util::errors::BumpbenchError;
use bumpbench_util::fs::{remove_if_exists, write_atomic};

use crate::model::BreakingUpdate;

/// The format stamped on `lastCheckedAt` and persisted timestamps: UTC,
/// `yyyy-MM-dd HH:mm:ss`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC instant the way the on-disk documents expect.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a `yyyy-MM-dd HH:mm:ss` timestamp as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, BumpbenchError> {
    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| {
        BumpbenchError::Parse {
            message: format!("invalid timestamp '{raw}': {e}"),
        }
    })?;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// One of the three partitions a breaking-update record can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Candidates,
    Benchmark,
    Unsuccessful,
}

impl Partition {
    fn dir_name(self) -> &'static str {
        match self {
            Partition::Candidates => "candidates",
            Partition::Benchmark => "benchmark",
            Partition::Unsuccessful => "unsuccessful",
        }
    }
}

/// Root-relative JSON document store: reads and writes one file per key,
/// and moves records between partitions with write-then-rename / delete
/// semantics so a record is never observable in two places at once.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
    candidates_dir: PathBuf,
    benchmark_dir: PathBuf,
    unsuccessful_dir: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            candidates_dir: root.join(Partition::Candidates.dir_name()),
            benchmark_dir: root.join(Partition::Benchmark.dir_name()),
            unsuccessful_dir: root.join(Partition::Unsuccessful.dir_name()),
            root,
        }
    }

    /// Build a store whose three partitions live at independently-chosen
    /// directories rather than as siblings under one root, matching the
    /// reproducer's `--in-progress-reproductions-dir` /
    /// `--benchmark-dir` / `--unsuccessful-reproductions-dir` CLI flags.
    /// Root-relative documents (`image_metadata.json`) are written
    /// alongside `benchmark_dir`.
    pub fn with_partition_dirs(
        candidates_dir: impl Into<PathBuf>,
        benchmark_dir: impl Into<PathBuf>,
        unsuccessful_dir: impl Into<PathBuf>,
    ) -> Self {
        let benchmark_dir = benchmark_dir.into();
        Self {
            root: benchmark_dir.clone(),
            candidates_dir: candidates_dir.into(),
            benchmark_dir,
            unsuccessful_dir: unsuccessful_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, partition: Partition) -> &Path {
        match partition {
            Partition::Candidates => &self.candidates_dir,
            Partition::Benchmark => &self.benchmark_dir,
            Partition::Unsuccessful => &self.unsuccessful_dir,
        }
    }

    fn partition_path(&self, partition: Partition, commit: &str) -> PathBuf {
        self.partition_dir(partition).join(format!("{commit}.json"))
    }

    /// Write a record into the given partition, creating the directory if
    /// needed. Overwrites any existing file for the same commit.
    pub fn write_record(
        &self,
        partition: Partition,
        update: &BreakingUpdate,
    ) -> Result<(), BumpbenchError> {
        self.write_json(&self.partition_path(partition, &update.breaking_commit), update)
    }

    /// Read a record from the given partition, if present.
    pub fn read_record(
        &self,
        partition: Partition,
        commit: &str,
    ) -> Result<Option<BreakingUpdate>, BumpbenchError> {
        self.read_json(&self.partition_path(partition, commit))
    }

    pub fn exists_in(&self, partition: Partition, commit: &str) -> bool {
        self.partition_path(partition, commit).is_file()
    }

    /// Atomically relocate a record from one partition to another: write
    /// the new file, then delete the old one. The new file always lands
    /// before the old one is removed, so a reader never observes zero
    /// copies, and a crash mid-move leaves the record in the source
    /// partition (the conservative, re-attemptable state).
    pub fn move_record(
        &self,
        commit: &str,
        from: Partition,
        to: Partition,
        update: &BreakingUpdate,
    ) -> Result<(), BumpbenchError> {
        self.write_record(to, update)?;
        remove_if_exists(&self.partition_path(from, commit))
    }

    /// Remove a record from a partition. Idempotent.
    pub fn remove_record(&self, partition: Partition, commit: &str) -> Result<(), BumpbenchError> {
        remove_if_exists(&self.partition_path(partition, commit))
    }

    /// Write an arbitrary JSON document at a root-relative path (e.g.
    /// `image_metadata.json`, `repositoryIndex.json`).
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), BumpbenchError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| BumpbenchError::Parse {
            message: format!("failed to serialize {}: {e}", path.display()),
        })?;
        write_atomic(path, &bytes)
    }

    /// Read an arbitrary JSON document, returning `None` if it doesn't exist.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, BumpbenchError> {
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        let value = serde_json::from_slice(&bytes).map_err(|e| BumpbenchError::Parse {
            message: format!("failed to parse {}: {e}", path.display()),
        })?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthorKind, DependencyScope, DependencySection, UpdatedDependency};

    fn sample(commit: &str) -> BreakingUpdate {
        BreakingUpdate {
            breaking_commit: commit.to_string(),
            url: "https://forge.example/org/project/pull/1".to_string(),
            project: "project".to_string(),
            project_organisation: "org".to_string(),
            pr_author: AuthorKind::Human,
            pre_commit_author: AuthorKind::Human,
            breaking_commit_author: AuthorKind::Human,
            license_info: "unknown".to_string(),
            updated_dependency: UpdatedDependency::new(
                "g".to_string(),
                "a".to_string(),
                "1.0.0".to_string(),
                "1.1.0".to_string(),
                DependencyScope::Compile,
                DependencySection::Dependencies,
            ),
            failure_category: None,
            java_version_used_for_reproduction: "11".to_string(),
            pre_commit_reproduction_command: None,
            breaking_update_reproduction_command: None,
            github_compare_link: None,
            maven_source_link_pre: None,
            maven_source_link_breaking: None,
            updated_file_type: None,
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let record = sample("abc123");
        store.write_record(Partition::Candidates, &record).unwrap();
        let back = store.read_record(Partition::Candidates, "abc123").unwrap();
        assert_eq!(back, Some(record));
    }

    #[test]
    fn move_record_leaves_exactly_one_partition_populated() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let record = sample("xyz789");
        store.write_record(Partition::Candidates, &record).unwrap();

        let mut reproduced = record.clone();
        reproduced.failure_category = Some(crate::model::FailureCategory::CompilationFailure);
        store
            .move_record("xyz789", Partition::Candidates, Partition::Benchmark, &reproduced)
            .unwrap();

        assert!(!store.exists_in(Partition::Candidates, "xyz789"));
        assert!(store.exists_in(Partition::Benchmark, "xyz789"));
        assert!(!store.exists_in(Partition::Unsuccessful, "xyz789"));
    }

    #[test]
    fn timestamp_round_trips() {
        let at = parse_timestamp("2024-03-05 12:30:00").unwrap();
        assert_eq!(format_timestamp(at), "2024-03-05 12:30:00");
    }

    #[test]
    fn missing_document_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let missing: Option<BreakingUpdate> = store
            .read_json(&dir.path().join("nope.json"))
            .unwrap();
        assert!(missing.is_none());
    }
}
