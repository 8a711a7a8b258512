//! An in-memory `ContainerRunner`, so the Reproducer's pre/post state
//! machine can be exercised without a container daemon.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use bumpbench_util::errors::BumpbenchError;

use crate::runner::{ContainerId, ContainerRunner};

#[derive(Debug, Clone, Default)]
struct FakeContainer {
    image: String,
    exit_code: i32,
    files: HashMap<String, Vec<u8>>,
}

/// A scripted runner: each `image` is pre-registered with the exit code a
/// `wait()` on a container created from it should report, and the files
/// visible to `copy_out`. `create`/`start`/`wait`/`commit`/`exec` all
/// succeed deterministically against that script.
pub struct FakeRunner {
    next_id: Mutex<u64>,
    image_exit_codes: Mutex<HashMap<String, i32>>,
    image_files: Mutex<HashMap<String, HashMap<String, Vec<u8>>>>,
    /// A queue of one-shot file scripts per image, consumed in order by
    /// `create`, for images whose successive containers must each see a
    /// different file (e.g. POST-side classification divergence).
    image_file_queue: Mutex<HashMap<String, VecDeque<HashMap<String, Vec<u8>>>>>,
    /// Same one-shot queue for exit codes, for scripting per-attempt
    /// pass/fail divergence.
    image_exit_queue: Mutex<HashMap<String, VecDeque<i32>>>,
    containers: Mutex<HashMap<ContainerId, FakeContainer>>,
    pub pulled_images: Mutex<Vec<String>>,
    pub committed: Mutex<Vec<(String, String)>>,
    pub pushed: Mutex<Vec<(String, String)>>,
    pub removed_images: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(0),
            image_exit_codes: Mutex::new(HashMap::new()),
            image_files: Mutex::new(HashMap::new()),
            image_file_queue: Mutex::new(HashMap::new()),
            image_exit_queue: Mutex::new(HashMap::new()),
            containers: Mutex::new(HashMap::new()),
            pulled_images: Mutex::new(Vec::new()),
            committed: Mutex::new(Vec::new()),
            pushed: Mutex::new(Vec::new()),
            removed_images: Mutex::new(Vec::new()),
        }
    }

    /// Script the exit code every container created from `image` reports.
    pub fn set_exit_code(&self, image: &str, code: i32) {
        self.image_exit_codes
            .lock()
            .expect("fake runner mutex poisoned")
            .insert(image.to_string(), code);
    }

    /// Script a file visible via `copy_out` on containers created from
    /// `image`.
    pub fn set_file(&self, image: &str, path: &str, contents: Vec<u8>) {
        self.image_files
            .lock()
            .expect("fake runner mutex poisoned")
            .entry(image.to_string())
            .or_default()
            .insert(path.to_string(), contents);
    }

    /// Queue a one-shot exit code for the next container created from
    /// `image`, falling back to the static `set_exit_code` script once the
    /// queue is drained.
    pub fn queue_exit_code(&self, image: &str, code: i32) {
        self.image_exit_queue
            .lock()
            .expect("fake runner mutex poisoned")
            .entry(image.to_string())
            .or_default()
            .push_back(code);
    }

    /// Queue a one-shot file script for the next container created from
    /// `image`: each call to `create` for this image consumes one queued
    /// entry, in order, falling back to the static `set_file` script once
    /// the queue is drained.
    pub fn queue_file(&self, image: &str, path: &str, contents: Vec<u8>) {
        let mut files = HashMap::new();
        files.insert(path.to_string(), contents);
        self.image_file_queue
            .lock()
            .expect("fake runner mutex poisoned")
            .entry(image.to_string())
            .or_default()
            .push_back(files);
    }

    /// Shared by `commit` and `commit_runnable`: the fake doesn't track
    /// labels or the default command, only the exit code/file script
    /// carried forward under the new tag. An exit code or file script
    /// already registered for the committed tag wins over the carried-over
    /// one, so tests can script a snapshot's behavior up front.
    fn commit_image(&self, id: &ContainerId, repo: &str, tag: &str) -> Result<(), BumpbenchError> {
        let image = self
            .containers
            .lock()
            .expect("fake runner mutex poisoned")
            .get(id)
            .map(|c| c.image.clone())
            .ok_or_else(|| BumpbenchError::Container {
                message: format!("unknown container {id}"),
            })?;
        let committed_tag = format!("{repo}:{tag}");
        self.committed
            .lock()
            .expect("fake runner mutex poisoned")
            .push((committed_tag.clone(), image.clone()));

        {
            let mut exit_codes = self.image_exit_codes.lock().expect("fake runner mutex poisoned");
            let inherited = *exit_codes.get(&image).unwrap_or(&0);
            exit_codes.entry(committed_tag.clone()).or_insert(inherited);
        }
        {
            let mut files = self.image_files.lock().expect("fake runner mutex poisoned");
            let inherited = files.get(&image).cloned();
            if let Some(inherited) = inherited {
                files.entry(committed_tag).or_insert(inherited);
            }
        }
        Ok(())
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRunner for FakeRunner {
    fn pull(&self, image: &str) -> Result<(), BumpbenchError> {
        self.pulled_images
            .lock()
            .expect("fake runner mutex poisoned")
            .push(image.to_string());
        Ok(())
    }

    fn create(&self, image: &str, _workdir: &str, _cmd: &[String]) -> Result<ContainerId, BumpbenchError> {
        let mut next_id = self.next_id.lock().expect("fake runner mutex poisoned");
        *next_id += 1;
        let id = format!("fake-container-{next_id}");

        let queued_exit = self
            .image_exit_queue
            .lock()
            .expect("fake runner mutex poisoned")
            .get_mut(image)
            .and_then(VecDeque::pop_front);
        let exit_code = queued_exit.unwrap_or_else(|| {
            *self
                .image_exit_codes
                .lock()
                .expect("fake runner mutex poisoned")
                .get(image)
                .unwrap_or(&0)
        });
        let queued = self
            .image_file_queue
            .lock()
            .expect("fake runner mutex poisoned")
            .get_mut(image)
            .and_then(VecDeque::pop_front);
        let files = queued.unwrap_or_else(|| {
            self.image_files
                .lock()
                .expect("fake runner mutex poisoned")
                .get(image)
                .cloned()
                .unwrap_or_default()
        });

        self.containers.lock().expect("fake runner mutex poisoned").insert(
            id.clone(),
            FakeContainer {
                image: image.to_string(),
                exit_code,
                files,
            },
        );
        Ok(id)
    }

    fn start(&self, id: &ContainerId) -> Result<(), BumpbenchError> {
        if self.containers.lock().expect("fake runner mutex poisoned").contains_key(id) {
            Ok(())
        } else {
            Err(BumpbenchError::Container {
                message: format!("unknown container {id}"),
            })
        }
    }

    fn wait(&self, id: &ContainerId) -> Result<i32, BumpbenchError> {
        self.containers
            .lock()
            .expect("fake runner mutex poisoned")
            .get(id)
            .map(|c| c.exit_code)
            .ok_or_else(|| BumpbenchError::Container {
                message: format!("unknown container {id}"),
            })
    }

    fn copy_out(&self, id: &ContainerId, path: &str) -> Result<Vec<u8>, BumpbenchError> {
        let containers = self.containers.lock().expect("fake runner mutex poisoned");
        let container = containers.get(id).ok_or_else(|| BumpbenchError::Container {
            message: format!("unknown container {id}"),
        })?;
        container.files.get(path).cloned().ok_or_else(|| BumpbenchError::Container {
            message: format!("not found: {path} in container {id}"),
        })
    }

    fn commit(
        &self,
        id: &ContainerId,
        repo: &str,
        tag: &str,
        _labels: &HashMap<String, String>,
    ) -> Result<(), BumpbenchError> {
        self.commit_image(id, repo, tag)
    }

    fn commit_runnable(&self, id: &ContainerId, repo: &str, tag: &str, _workdir: &str) -> Result<(), BumpbenchError> {
        self.commit_image(id, repo, tag)
    }

    fn push(&self, repo: &str, tag: &str, _username: &str, _identity_token: &str) -> Result<(), BumpbenchError> {
        self.pushed
            .lock()
            .expect("fake runner mutex poisoned")
            .push((repo.to_string(), tag.to_string()));
        Ok(())
    }

    fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<Vec<u8>, BumpbenchError> {
        if cmd.first().map(String::as_str) == Some("du") {
            return Ok(b"1024\t/root/.m2".to_vec());
        }
        self.containers
            .lock()
            .expect("fake runner mutex poisoned")
            .contains_key(id)
            .then(Vec::new)
            .ok_or_else(|| BumpbenchError::Container {
                message: format!("unknown container {id}"),
            })
    }

    fn remove(&self, id: &ContainerId) -> Result<(), BumpbenchError> {
        self.containers.lock().expect("fake runner mutex poisoned").remove(id);
        Ok(())
    }

    fn remove_image(&self, repo: &str, tag: &str) -> Result<(), BumpbenchError> {
        self.removed_images
            .lock()
            .expect("fake runner mutex poisoned")
            .push(format!("{repo}:{tag}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_exit_code_is_reported_on_wait() {
        let runner = FakeRunner::new();
        runner.set_exit_code("maven:3.9-eclipse-temurin-17", 1);
        let id = runner
            .create("maven:3.9-eclipse-temurin-17", "/project", &["mvn".into()])
            .unwrap();
        runner.start(&id).unwrap();
        assert_eq!(runner.wait(&id).unwrap(), 1);
    }

    #[test]
    fn copy_out_reports_not_found_for_unscripted_path() {
        let runner = FakeRunner::new();
        let id = runner.create("base:latest", "/project", &[]).unwrap();
        let err = runner.copy_out(&id, "/does/not/exist").unwrap_err();
        assert!(matches!(err, BumpbenchError::Container { .. }));
    }

    #[test]
    fn commit_carries_forward_the_source_containers_files() {
        let runner = FakeRunner::new();
        runner.set_file("base:latest", "/project/pom.xml", b"<project/>".to_vec());
        let id = runner.create("base:latest", "/project", &[]).unwrap();
        runner.commit(&id, "acme/bump", "abc-pre", &HashMap::new()).unwrap();

        let snapshot_id = runner.create("acme/bump:abc-pre", "/project", &[]).unwrap();
        let contents = runner.copy_out(&snapshot_id, "/project/pom.xml").unwrap();
        assert_eq!(contents, b"<project/>".to_vec());
    }

    #[test]
    fn commit_does_not_clobber_a_pre_scripted_exit_code() {
        let runner = FakeRunner::new();
        runner.set_exit_code("base:latest", 0);
        runner.set_exit_code("acme/bump:abc-pre", 1);
        let id = runner.create("base:latest", "/project", &[]).unwrap();
        runner.commit(&id, "acme/bump", "abc-pre", &HashMap::new()).unwrap();

        let snapshot_id = runner.create("acme/bump:abc-pre", "/project", &[]).unwrap();
        assert_eq!(runner.wait(&snapshot_id).unwrap(), 1);
    }
}
