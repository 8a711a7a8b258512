//! Loading the three small JSON/text configuration surfaces this system
//! takes as CLI input: the token file, the search config, and registry
//! credentials.

use std::path::Path;

use serde::{Deserialize, Serialize};

use bumpbench_util::errors::BumpbenchError;

/// A single Forge credential (personal access token or equivalent).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential(pub String);

/// Load credentials from a file: one per non-empty, non-comment line, or a
/// JSON array of strings if the file parses as one.
pub fn load_tokens(path: &Path) -> Result<Vec<Credential>, BumpbenchError> {
    let raw = std::fs::read_to_string(path).map_err(|e| BumpbenchError::Config {
        message: format!("failed to read token file {}: {e}", path.display()),
    })?;

    if let Ok(list) = serde_json::from_str::<Vec<String>>(&raw) {
        return Ok(list.into_iter().map(Credential).collect());
    }

    let tokens: Vec<Credential> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Credential(line.to_string()))
        .collect();

    if tokens.is_empty() {
        return Err(BumpbenchError::Config {
            message: format!("no tokens found in {}", path.display()),
        });
    }
    Ok(tokens)
}

/// `{ minNumberOfStars, earliestCreationDate }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    pub min_number_of_stars: u32,
    pub earliest_creation_date: String,
}

impl SearchConfig {
    pub fn load(path: &Path) -> Result<Self, BumpbenchError> {
        let raw = std::fs::read_to_string(path).map_err(|e| BumpbenchError::Config {
            message: format!("failed to read search config {}: {e}", path.display()),
        })?;
        serde_json::from_str(&raw).map_err(|e| BumpbenchError::Config {
            message: format!("failed to parse search config {}: {e}", path.display()),
        })
    }
}

/// `{ userName, identityToken, repository }`, for pushing final images to
/// the registry. `repository` is the fixed registry repository every final
/// image is committed and pushed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCredentials {
    pub user_name: String,
    pub identity_token: String,
    pub repository: String,
}

impl RegistryCredentials {
    pub fn load(path: &Path) -> Result<Self, BumpbenchError> {
        let raw = std::fs::read_to_string(path).map_err(|e| BumpbenchError::Config {
            message: format!("failed to read registry credentials {}: {e}", path.display()),
        })?;
        serde_json::from_str(&raw).map_err(|e| BumpbenchError::Config {
            message: format!("failed to parse registry credentials {}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_tokens_from_newline_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.txt");
        std::fs::write(&path, "tok-one\n# comment\ntok-two\n\n").unwrap();
        let tokens = load_tokens(&path).unwrap();
        assert_eq!(tokens, vec![Credential("tok-one".into()), Credential("tok-two".into())]);
    }

    #[test]
    fn load_tokens_from_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, r#"["a", "b"]"#).unwrap();
        let tokens = load_tokens(&path).unwrap();
        assert_eq!(tokens, vec![Credential("a".into()), Credential("b".into())]);
    }

    #[test]
    fn empty_token_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.txt");
        std::fs::write(&path, "\n\n").unwrap();
        assert!(load_tokens(&path).is_err());
    }

    #[test]
    fn search_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        std::fs::write(
            &path,
            r#"{"minNumberOfStars": 50, "earliestCreationDate": "2015-01-01 00:00:00"}"#,
        )
        .unwrap();
        let cfg = SearchConfig::load(&path).unwrap();
        assert_eq!(cfg.min_number_of_stars, 50);
    }
}
