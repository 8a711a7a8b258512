//! The predicates a candidate pull request must pass before the Miner
//! builds a full candidate record for it.

use chrono::{DateTime, Utc};

use bumpbench_core::diff::{single_line_pom_version_bump, PomVersionBump};

use crate::pr::{PullRequest, WorkflowRun};

/// The PR's diff touches exactly one `pom.xml`, with exactly one version
/// line added and one removed, inside a single `<dependency>` block.
pub fn changes_only_dependency_version_in_pom_xml(diff: &str) -> Option<PomVersionBump> {
    single_line_pom_version_bump(diff)
}

/// At least one completed, failed pull-request workflow run on the PR's
/// head branch ran against the PR's head commit: evidence the update broke
/// the build before the PR was merged or abandoned. `runs` is expected to
/// be pre-filtered to the head branch's failed `pull_request`-event runs.
pub fn breaks_build(runs: &[WorkflowRun], head_sha: &str) -> bool {
    runs.iter().any(|run| run.failed() && run.head_sha == head_sha)
}

/// The PR was opened before `cutoff`. Used to short-circuit a paginated
/// creation-descending PR walk at the repository's last-mined watermark.
pub fn created_before(pr: &PullRequest, cutoff: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(&pr.created_at) {
        Ok(created) => created.with_timezone(&Utc) < cutoff,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::{PullRequestAuthor, PullRequestRef};

    fn pr_created_at(created_at: &str) -> PullRequest {
        PullRequest {
            number: 1,
            title: "Bump foo from 1.0 to 1.1".into(),
            state: "closed".into(),
            merged_at: None,
            created_at: created_at.into(),
            user: PullRequestAuthor {
                login: "dependabot[bot]".into(),
                kind: "Bot".into(),
            },
            head: PullRequestRef {
                sha: "abc".into(),
                ref_name: "dependabot/maven/foo-1.1".into(),
            },
            base: PullRequestRef {
                sha: "def".into(),
                ref_name: "main".into(),
            },
        }
    }

    fn failed_run(head_sha: &str) -> WorkflowRun {
        WorkflowRun {
            head_sha: head_sha.into(),
            event: "pull_request".into(),
            status: "completed".into(),
            conclusion: Some("failure".into()),
        }
    }

    #[test]
    fn created_before_respects_cutoff() {
        let pr = pr_created_at("2020-01-01T00:00:00Z");
        let cutoff = "2021-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(created_before(&pr, cutoff));
    }

    #[test]
    fn created_before_rejects_pr_after_cutoff() {
        let pr = pr_created_at("2022-06-01T00:00:00Z");
        let cutoff = "2021-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(!created_before(&pr, cutoff));
    }

    #[test]
    fn breaks_build_requires_a_failed_run_for_the_head_sha() {
        let runs = vec![failed_run("abc")];
        assert!(breaks_build(&runs, "abc"));
        assert!(!breaks_build(&runs, "other-sha"));
    }

    #[test]
    fn breaks_build_ignores_passing_and_in_flight_runs() {
        let passing = WorkflowRun {
            conclusion: Some("success".into()),
            ..failed_run("abc")
        };
        let in_flight = WorkflowRun {
            status: "in_progress".into(),
            conclusion: None,
            ..failed_run("abc")
        };
        assert!(!breaks_build(&[passing, in_flight], "abc"));
    }
}
