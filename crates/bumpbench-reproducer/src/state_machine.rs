//! The per-candidate pre/post reproduction state machine.

use bumpbench_container::runner::{ContainerId, ContainerRunner};
use bumpbench_core::model::FailureCategory;
use bumpbench_util::errors::BumpbenchError;

use crate::classify::classify;
use crate::result_manager::ResultManager;

const MAX_ATTEMPTS: u32 = 3;

fn pre_command(breaking_commit: &str) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!(
            "set -o pipefail && git checkout {breaking_commit} && git checkout HEAD~1 && rm -rf .git && mvn clean test -B | tee {breaking_commit}.log"
        ),
    ]
}

fn post_command(breaking_commit: &str) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!(
            "set -o pipefail && git checkout {breaking_commit} && rm -rf .git && mvn clean test -B | tee {breaking_commit}.log"
        ),
    ]
}

/// Run one container attempt to completion and return its exit code and the
/// log it `tee`d to `<commit>.log`, read back via `copy_out`.
fn run_attempt(
    runner: &dyn ContainerRunner,
    base_image: &str,
    workdir: &str,
    cmd: &[String],
    breaking_commit: &str,
) -> Result<(ContainerId, i32, String), BumpbenchError> {
    let id = runner.create(base_image, workdir, cmd)?;
    runner.start(&id)?;
    let exit_code = runner.wait(&id)?;
    let log_bytes = runner
        .copy_out(&id, &format!("{workdir}/{breaking_commit}.log"))
        .unwrap_or_default();
    Ok((id, exit_code, String::from_utf8_lossy(&log_bytes).to_string()))
}

/// Outcome of the PRE side of the state machine.
pub enum PreOutcome {
    /// `prev_pass` held: the container from the passing attempt is kept so
    /// its filesystem can be snapshotted as `:pre` later.
    Passed { container: ContainerId, log: String },
    /// The preceding build never went green within the retry budget.
    NotGreen { log: String },
}

/// Run the PRE side with the flakiness policy: on a failure classified as
/// anything but `TEST_FAILURE`, stop immediately; on `TEST_FAILURE`, retry
/// up to `MAX_ATTEMPTS`. The build counts as green iff any attempt exits 0,
/// in which case the logs written by earlier failing attempts are deleted.
pub fn run_pre(
    runner: &dyn ContainerRunner,
    result_manager: &ResultManager,
    base_image: &str,
    workdir: &str,
    breaking_commit: &str,
) -> Result<PreOutcome, BumpbenchError> {
    let cmd = pre_command(breaking_commit);
    let mut wrote_speculative_log = false;

    for attempt in 1..=MAX_ATTEMPTS {
        let (container, exit_code, log) = run_attempt(runner, base_image, workdir, &cmd, breaking_commit)?;

        if exit_code == 0 {
            if wrote_speculative_log {
                result_manager.remove_log(breaking_commit, false)?;
            }
            return Ok(PreOutcome::Passed { container, log });
        }

        runner.remove(&container)?;
        result_manager.store_log(breaking_commit, false, log.as_bytes())?;
        wrote_speculative_log = true;

        let category = classify(&log);
        if category != FailureCategory::TestFailure || attempt == MAX_ATTEMPTS {
            return Ok(PreOutcome::NotGreen { log });
        }
    }
    unreachable!("loop always returns within MAX_ATTEMPTS iterations")
}

/// Outcome of the POST side of the state machine.
pub enum PostOutcome {
    /// Three consecutive runs produced the same non-zero exit and the same
    /// classification.
    Reproduced {
        container: ContainerId,
        log: String,
        category: FailureCategory,
    },
    /// The post build passed at some point: the update never broke it.
    NoBreakage,
    /// Two runs diverged in exit code or classification: not a stable
    /// reproduction.
    Flaky,
}

/// Run the POST side: record the first failure's exit code and category,
/// require every subsequent failing run to match both, and declare a
/// reproduction only once `MAX_ATTEMPTS` consecutive runs agree. Every
/// failing attempt's log is speculatively written into the successful-log
/// directory as it happens (a reproduction is, by definition, a stable
/// "success" of the protocol); a divergence or a passing build deletes that
/// speculative log.
pub fn run_post(
    runner: &dyn ContainerRunner,
    result_manager: &ResultManager,
    base_image: &str,
    workdir: &str,
    breaking_commit: &str,
) -> Result<PostOutcome, BumpbenchError> {
    let cmd = post_command(breaking_commit);
    let mut recorded: Option<(i32, FailureCategory)> = None;
    let mut last_container: Option<ContainerId> = None;
    let mut last_log = String::new();
    let mut wrote_speculative_log = false;

    for attempt in 1..=MAX_ATTEMPTS {
        let (container, exit_code, log) = run_attempt(runner, base_image, workdir, &cmd, breaking_commit)?;

        if exit_code == 0 {
            runner.remove(&container)?;
            if let Some(previous) = last_container {
                runner.remove(&previous)?;
            }
            if wrote_speculative_log {
                result_manager.remove_log(breaking_commit, true)?;
            }
            return Ok(PostOutcome::NoBreakage);
        }

        let category = classify(&log);
        match recorded {
            None => recorded = Some((exit_code, category)),
            Some(previous) if previous != (exit_code, category) => {
                runner.remove(&container)?;
                if let Some(prior) = last_container {
                    runner.remove(&prior)?;
                }
                if wrote_speculative_log {
                    result_manager.remove_log(breaking_commit, true)?;
                }
                return Ok(PostOutcome::Flaky);
            }
            Some(_) => {}
        }

        result_manager.store_log(breaking_commit, true, log.as_bytes())?;
        wrote_speculative_log = true;

        if let Some(previous) = last_container.replace(container.clone()) {
            runner.remove(&previous)?;
        }
        last_log = log;

        if attempt == MAX_ATTEMPTS {
            let (_, category) = recorded.expect("set on first attempt");
            return Ok(PostOutcome::Reproduced {
                container,
                log: last_log,
                category,
            });
        }
    }
    unreachable!("loop always returns within MAX_ATTEMPTS iterations")
}

/// Snapshot a container's filesystem as a runnable image with `mvn clean
/// test -B` as its default command in `workdir`.
pub fn snapshot_as_runnable(
    runner: &dyn ContainerRunner,
    container: &ContainerId,
    repo: &str,
    tag: &str,
    workdir: &str,
) -> Result<(), BumpbenchError> {
    runner.commit_runnable(container, repo, tag, workdir)
}
