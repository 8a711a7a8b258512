//! CLI-surface tests: argument wiring and the config-error exit path,
//! driven through the real binaries rather than the library handlers
//! directly. No Forge/container access is exercised here.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[allow(deprecated)]
fn miner_cmd() -> Command {
    Command::cargo_bin("bumpbench-miner").unwrap()
}

#[allow(deprecated)]
fn reproduce_cmd() -> Command {
    Command::cargo_bin("bumpbench-reproduce").unwrap()
}

#[test]
fn find_without_subcommand_shows_usage() {
    miner_cmd().assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn find_requires_search_config_flag() {
    let tmp = TempDir::new().unwrap();
    miner_cmd()
        .args(["find", "--api-tokens", "tokens.txt", "--output-directory"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("search-config"));
}

#[test]
fn find_with_missing_token_file_reports_config_error() {
    let tmp = TempDir::new().unwrap();
    let search_config = tmp.path().join("search.json");
    std::fs::write(&search_config, r#"{"minNumberOfStars": 10, "earliestCreationDate": "2020-01-01"}"#).unwrap();

    miner_cmd()
        .args(["find", "--api-tokens"])
        .arg(tmp.path().join("missing-tokens.txt"))
        .arg("--output-directory")
        .arg(tmp.path())
        .arg("--search-config")
        .arg(&search_config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read token file"));
}

#[test]
fn mine_with_missing_repos_index_reports_config_error() {
    let tmp = TempDir::new().unwrap();
    let tokens = tmp.path().join("tokens.txt");
    std::fs::write(&tokens, "tok-one\n").unwrap();

    miner_cmd()
        .args(["mine", "--api-tokens"])
        .arg(&tokens)
        .arg("--output-directory")
        .arg(tmp.path())
        .arg("--repos")
        .arg(tmp.path().join("missing-index.json"))
        .assert()
        .failure();
}

#[test]
fn reproduce_without_subcommand_shows_usage() {
    reproduce_cmd().assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn reproduce_with_missing_credentials_reports_config_error() {
    let tmp = TempDir::new().unwrap();
    let tokens = tmp.path().join("tokens.txt");
    std::fs::write(&tokens, "tok-one\n").unwrap();

    reproduce_cmd()
        .args(["reproduce", "--api-tokens"])
        .arg(&tokens)
        .arg("--benchmark-dir")
        .arg(tmp.path().join("benchmark"))
        .arg("--unsuccessful-reproductions-dir")
        .arg(tmp.path().join("unsuccessful"))
        .arg("--in-progress-reproductions-dir")
        .arg(tmp.path().join("candidates"))
        .arg("--log-dir")
        .arg(tmp.path().join("logs"))
        .arg("--jar-dir")
        .arg(tmp.path().join("jars"))
        .arg("--github-packages-credentials")
        .arg(tmp.path().join("missing-credentials.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read registry credentials"));
}
