//! A thin adapter over a local container daemon, exposing exactly the
//! operations the Reproducer needs.

use std::collections::HashMap;

use bumpbench_util::errors::BumpbenchError;
use bumpbench_util::process::{run, run_ok};

/// Identifies a stopped or running container.
pub type ContainerId = String;

/// The `ContainerRunner` trait is the seam the Reproducer's state machine
/// is written against; `DockerRunner` is the real, daemon-backed
/// implementation and `bumpbench_container::fake::FakeRunner` is the
/// in-memory double used by tests.
pub trait ContainerRunner {
    fn pull(&self, image: &str) -> Result<(), BumpbenchError>;
    fn create(&self, image: &str, workdir: &str, cmd: &[String]) -> Result<ContainerId, BumpbenchError>;
    fn start(&self, id: &ContainerId) -> Result<(), BumpbenchError>;
    fn wait(&self, id: &ContainerId) -> Result<i32, BumpbenchError>;
    /// Fails with `BumpbenchError::Container` carrying `"not found"` in its
    /// message when `path` does not exist in the container's filesystem.
    fn copy_out(&self, id: &ContainerId, path: &str) -> Result<Vec<u8>, BumpbenchError>;
    fn commit(
        &self,
        id: &ContainerId,
        repo: &str,
        tag: &str,
        labels: &HashMap<String, String>,
    ) -> Result<(), BumpbenchError>;
    /// Commit a stopped container as a runnable image: `mvn clean test -B`
    /// becomes its default command, `workdir` its default working
    /// directory.
    fn commit_runnable(&self, id: &ContainerId, repo: &str, tag: &str, workdir: &str) -> Result<(), BumpbenchError>;
    fn push(&self, repo: &str, tag: &str, username: &str, identity_token: &str) -> Result<(), BumpbenchError>;
    fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<Vec<u8>, BumpbenchError>;
    fn remove(&self, id: &ContainerId) -> Result<(), BumpbenchError>;
    fn remove_image(&self, repo: &str, tag: &str) -> Result<(), BumpbenchError>;
}

/// A `ContainerRunner` backed by the `docker` CLI: every operation is one
/// `docker` invocation, with its argv assembled up front so failures can
/// echo the exact command line.
pub struct DockerRunner;

impl DockerRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DockerRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned argv from a fixed set of literal and formatted fragments.
fn argv<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.into_iter().map(str::to_string).collect()
}

/// One `docker` invocation that must exit zero.
fn docker(args: &[String]) -> Result<Vec<u8>, BumpbenchError> {
    run_ok("docker", args)
}

impl ContainerRunner for DockerRunner {
    fn pull(&self, image: &str) -> Result<(), BumpbenchError> {
        docker(&argv(["pull", image])).map(|_| ())
    }

    fn create(&self, image: &str, workdir: &str, cmd: &[String]) -> Result<ContainerId, BumpbenchError> {
        let mut args = argv(["create", "--workdir", workdir, image]);
        args.extend(cmd.iter().cloned());
        let stdout = docker(&args)?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    fn start(&self, id: &ContainerId) -> Result<(), BumpbenchError> {
        docker(&argv(["start", id.as_str()])).map(|_| ())
    }

    fn wait(&self, id: &ContainerId) -> Result<i32, BumpbenchError> {
        let stdout = docker(&argv(["wait", id.as_str()]))?;
        String::from_utf8_lossy(&stdout)
            .trim()
            .parse::<i32>()
            .map_err(|e| BumpbenchError::Container {
                message: format!("could not parse exit code from `docker wait`: {e}"),
            })
    }

    fn copy_out(&self, id: &ContainerId, path: &str) -> Result<Vec<u8>, BumpbenchError> {
        let args = argv(["cp", &format!("{id}:{path}"), "-"]);
        let output = run("docker", &args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_lowercase().contains("no such file or directory") {
                return Err(BumpbenchError::Container {
                    message: format!("not found: {path} in container {id}"),
                });
            }
            return Err(BumpbenchError::Container {
                message: format!("docker cp failed for {path}: {stderr}"),
            });
        }
        // `docker cp <id>:<path> -` streams a tar archive even for a single file.
        crate::tar::first_file_bytes(&output.stdout)?.ok_or_else(|| BumpbenchError::Container {
            message: format!("not found: {path} in container {id}"),
        })
    }

    fn commit(
        &self,
        id: &ContainerId,
        repo: &str,
        tag: &str,
        labels: &HashMap<String, String>,
    ) -> Result<(), BumpbenchError> {
        let mut args = argv(["commit"]);
        for (key, value) in labels {
            args.push("--change".to_string());
            args.push(format!("LABEL {key}=\"{value}\""));
        }
        args.push(id.clone());
        args.push(format!("{repo}:{tag}"));
        docker(&args).map(|_| ())
    }

    fn commit_runnable(&self, id: &ContainerId, repo: &str, tag: &str, workdir: &str) -> Result<(), BumpbenchError> {
        let args = argv([
            "commit",
            "--change",
            r#"CMD ["mvn", "clean", "test", "-B"]"#,
            "--change",
            &format!("WORKDIR {workdir}"),
            id.as_str(),
            &format!("{repo}:{tag}"),
        ]);
        docker(&args).map(|_| ())
    }

    fn push(&self, repo: &str, tag: &str, username: &str, identity_token: &str) -> Result<(), BumpbenchError> {
        docker(&argv(["login", "--username", username, "--password", identity_token]))?;
        docker(&argv(["push", &format!("{repo}:{tag}")])).map(|_| ())
    }

    fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<Vec<u8>, BumpbenchError> {
        let mut args = argv(["exec", id.as_str()]);
        args.extend(cmd.iter().cloned());
        docker(&args)
    }

    fn remove(&self, id: &ContainerId) -> Result<(), BumpbenchError> {
        docker(&argv(["rm", "-f", id.as_str()])).map(|_| ())
    }

    fn remove_image(&self, repo: &str, tag: &str) -> Result<(), BumpbenchError> {
        docker(&argv(["rmi", "-f", &format!("{repo}:{tag}")])).map(|_| ())
    }
}
