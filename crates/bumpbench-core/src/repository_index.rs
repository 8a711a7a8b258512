//! The persistent set of discovered repositories and their per-repo mining
//! watermark (`repositoryIndex.json`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bumpbench_util::errors::BumpbenchError;

use crate::store::{format_timestamp, parse_timestamp, JsonStore};

/// One repository's discovery URL and last-mined watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    pub url: String,
    /// `None` means "never checked", interpreted as epoch zero.
    #[serde(default, rename = "lastCheckedAt")]
    pub last_checked_at: Option<String>,
}

impl RepoEntry {
    pub fn last_checked_at_instant(&self) -> Result<DateTime<Utc>, BumpbenchError> {
        match &self.last_checked_at {
            Some(raw) => parse_timestamp(raw),
            None => Ok(DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is valid")),
        }
    }
}

/// Mapping `owner/project -> RepoEntry`, rewritten wholesale after each
/// repo's mining pass. Last-writer-wins is acceptable: concurrent writers
/// touch disjoint keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryIndex {
    #[serde(flatten)]
    repos: BTreeMap<String, RepoEntry>,
}

impl RepositoryIndex {
    pub fn load(path: &Path) -> Result<Self, BumpbenchError> {
        let store = JsonStore::new(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(store.read_json(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<(), BumpbenchError> {
        let store = JsonStore::new(path.parent().unwrap_or_else(|| Path::new(".")));
        store.write_json(path, self)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.repos.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&RepoEntry> {
        self.repos.get(key)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Record a newly discovered repository with no mining history yet.
    pub fn insert_discovered(&mut self, key: String, url: String) {
        self.repos.entry(key).or_insert(RepoEntry {
            url,
            last_checked_at: None,
        });
    }

    /// Stamp `lastCheckedAt = now` for a repo a mining pass just completed.
    /// The watermark must never move backwards; callers pass the current
    /// instant, never a value older than what's stored.
    pub fn mark_checked(&mut self, key: &str, at: DateTime<Utc>) {
        if let Some(entry) = self.repos.get_mut(key) {
            entry.last_checked_at = Some(format_timestamp(at));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RepoEntry)> {
        self.repos.iter()
    }
}

/// Default location of the repository index relative to an output
/// directory.
pub fn default_path(output_directory: &Path) -> PathBuf {
    output_directory.join("repositoryIndex.json")
}
