//! Top-level per-candidate orchestration: preparation, the state machine,
//! and the success/unsuccessful paths.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use bumpbench_container::runner::{ContainerId, ContainerRunner};
use bumpbench_core::model::BreakingUpdate;
use bumpbench_forge::client::ForgeClient;
use bumpbench_forge::config::{Credential, RegistryCredentials};
use bumpbench_util::errors::BumpbenchError;

use crate::enrichment;
use crate::result_manager::ResultManager;
use crate::state_machine::{run_post, run_pre, snapshot_as_runnable, PostOutcome, PreOutcome};

const BASE_IMAGE: &str = "maven:3.8-eclipse-temurin-11";
const LOCAL_M2_PATH: &str = "/root/.m2";

/// What happened to a candidate after `reproduce_candidate` ran.
pub enum ReproductionOutcome {
    Success(BreakingUpdate),
    Unsuccessful(BreakingUpdate),
    /// `:base` image could not be created (e.g. the clone/fetch failed).
    /// The candidate is discarded without any partition write.
    Irrecoverable { reason: String },
}

/// `/root/.m2` and `<project>` folder sizes for the pre and post images, one
/// entry of the `image_metadata.json` document keyed by `breakingCommit`.
/// Sizes are kept string-valued, in the unit `du -s` reports them in,
/// exactly as the on-disk document stores them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub pre_image_m2_folder_size: String,
    pub pre_image_project_folder_size: String,
    pub post_image_m2_folder_size: String,
    pub post_image_project_folder_size: String,
}

fn workdir_for(project: &str) -> String {
    format!("/{project}")
}

fn parse_du_size(stdout: &[u8]) -> Result<u64, BumpbenchError> {
    let text = String::from_utf8_lossy(stdout);
    text.split_whitespace()
        .next()
        .and_then(|field| field.parse::<u64>().ok())
        .ok_or_else(|| BumpbenchError::Container {
            message: format!("could not parse `du -s` output: {text}"),
        })
}

/// Measure `path`'s folder size inside a detached container created from
/// `image`, via `du -s`.
fn measure_folder_size(runner: &dyn ContainerRunner, image: &str, workdir: &str, path: &str) -> Result<u64, BumpbenchError> {
    let id = runner.create(image, workdir, &["sleep".to_string(), "60".to_string()])?;
    runner.start(&id)?;
    let stdout = runner.exec(&id, &["du".to_string(), "-s".to_string(), path.to_string()]);
    runner.remove(&id)?;
    parse_du_size(&stdout?)
}

fn jar_or_pom_file_type(
    runner: &dyn ContainerRunner,
    result_manager: &ResultManager,
    container: &ContainerId,
    group_id: &str,
    artifact_id: &str,
    version: &str,
) -> Result<Option<bumpbench_core::model::UpdatedFileType>, BumpbenchError> {
    use bumpbench_core::model::UpdatedFileType;

    let group_path = group_id.replace('.', "/");
    let jar_container_path = format!("{LOCAL_M2_PATH}/{group_path}/{artifact_id}/{version}/{artifact_id}-{version}.jar");
    let pom_container_path = format!("{LOCAL_M2_PATH}/{group_path}/{artifact_id}/{version}/{artifact_id}-{version}.pom");

    if let Ok(bytes) = runner.copy_out(container, &jar_container_path) {
        result_manager.store_jar(&result_manager.jar_path(group_id, artifact_id, version, "jar"), &bytes)?;
        return Ok(Some(UpdatedFileType::Jar));
    }
    if let Ok(bytes) = runner.copy_out(container, &pom_container_path) {
        result_manager.store_jar(&result_manager.jar_path(group_id, artifact_id, version, "pom"), &bytes)?;
        return Ok(Some(UpdatedFileType::Pom));
    }
    Ok(None)
}

/// Run the full per-candidate protocol: preparation, the PRE/POST state
/// machine, and whichever of the success/unsuccessful paths applies.
#[allow(clippy::too_many_arguments)]
pub fn reproduce_candidate(
    runner: &dyn ContainerRunner,
    result_manager: &ResultManager,
    client: &ForgeClient,
    credential: &Credential,
    registry: &RegistryCredentials,
    rt: &tokio::runtime::Handle,
    mut candidate: BreakingUpdate,
    project_clone_url: &str,
) -> Result<ReproductionOutcome, BumpbenchError> {
    let workdir = workdir_for(&candidate.project);
    let commit = candidate.breaking_commit.clone();

    let project = candidate.project.clone();
    let prep_cmd = vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("git clone {project_clone_url} {project} && cd {project} && git fetch --depth 2 origin {commit}"),
    ];
    runner.pull(BASE_IMAGE)?;
    let prep_id = runner.create(BASE_IMAGE, "/", &prep_cmd)?;
    runner.start(&prep_id)?;
    let prep_exit = runner.wait(&prep_id)?;
    if prep_exit != 0 {
        runner.remove(&prep_id)?;
        return Ok(ReproductionOutcome::Irrecoverable {
            reason: format!("clone/fetch of {commit} exited with {prep_exit}"),
        });
    }
    let base_repo = commit.clone();
    runner.commit(&prep_id, &base_repo, "base", &HashMap::new())?;
    runner.remove(&prep_id)?;
    let base_image = format!("{base_repo}:base");

    let pre_outcome = run_pre(runner, result_manager, &base_image, &workdir, &commit)?;
    let pre_container = match pre_outcome {
        PreOutcome::Passed { container, .. } => container,
        PreOutcome::NotGreen { .. } => {
            runner.remove_image(&base_repo, "base")?;
            result_manager.save_unsuccessful(&candidate)?;
            return Ok(ReproductionOutcome::Unsuccessful(candidate));
        }
    };

    let post_outcome = run_post(runner, result_manager, &base_image, &workdir, &commit)?;
    let (post_container, failure_category) = match post_outcome {
        PostOutcome::NoBreakage | PostOutcome::Flaky => {
            runner.remove(&pre_container)?;
            runner.remove_image(&base_repo, "base")?;
            result_manager.save_unsuccessful(&candidate)?;
            return Ok(ReproductionOutcome::Unsuccessful(candidate));
        }
        PostOutcome::Reproduced { container, category, .. } => (container, category),
    };

    // Success path.
    snapshot_as_runnable(runner, &pre_container, &commit, "pre", &workdir)?;
    snapshot_as_runnable(runner, &post_container, &commit, "post", &workdir)?;
    let pre_snapshot = format!("{commit}:pre");
    let post_snapshot = format!("{commit}:post");

    let updated = candidate.updated_dependency.clone();
    let pre_file_type = jar_or_pom_file_type(
        runner,
        result_manager,
        &pre_container,
        &updated.dependency_group_id,
        &updated.dependency_artifact_id,
        &updated.previous_version,
    )?;
    let post_file_type = jar_or_pom_file_type(
        runner,
        result_manager,
        &post_container,
        &updated.dependency_group_id,
        &updated.dependency_artifact_id,
        &updated.new_version,
    )?;
    candidate.updated_file_type = post_file_type.or(pre_file_type);

    runner.remove(&pre_container)?;
    runner.remove(&post_container)?;

    let repo_full_name = format!("{}/{}", candidate.project_organisation, candidate.project);
    let links = rt.block_on(enrichment::resolve(
        client,
        credential,
        &repo_full_name,
        &updated.previous_version,
        &updated.new_version,
        &updated.dependency_group_id,
        &updated.dependency_artifact_id,
    ));
    candidate.github_compare_link = links.github_compare_link;
    candidate.maven_source_link_pre = links.maven_source_link_pre;
    candidate.maven_source_link_breaking = links.maven_source_link_breaking;

    let labels: HashMap<String, String> = HashMap::from([
        ("github_repository".to_string(), repo_full_name.clone()),
        ("pr_url".to_string(), candidate.url.clone()),
        (
            "updated_dependency".to_string(),
            format!("{}:{}", updated.dependency_group_id, updated.dependency_artifact_id),
        ),
        ("new_version".to_string(), updated.new_version.clone()),
        ("previous_version".to_string(), updated.previous_version.clone()),
        ("failure_category".to_string(), failure_category.as_str().to_string()),
    ]);

    let pre_tag = format!("{commit}-pre");
    let breaking_tag = format!("{commit}-breaking");

    let pre_for_publish = runner.create(&pre_snapshot, &workdir, &["mvn".to_string(), "clean".to_string(), "test".to_string(), "-B".to_string()])?;
    runner.commit(&pre_for_publish, &registry.repository, &pre_tag, &labels)?;
    runner.remove(&pre_for_publish)?;

    let post_for_publish = runner.create(&post_snapshot, &workdir, &["mvn".to_string(), "clean".to_string(), "test".to_string(), "-B".to_string()])?;
    runner.commit(&post_for_publish, &registry.repository, &breaking_tag, &labels)?;
    runner.remove(&post_for_publish)?;

    // A failed push never drops the local record or the locally-committed
    // images; the next run over the same record retries the push.
    for tag in [&pre_tag, &breaking_tag] {
        if let Err(e) = runner.push(&registry.repository, tag, &registry.user_name, &registry.identity_token) {
            warn!(commit = %commit, tag = %tag, error = %e, "registry push failed, keeping local image");
        }
    }

    let pre_published = format!("{}:{pre_tag}", registry.repository);
    let post_published = format!("{}:{breaking_tag}", registry.repository);

    let metadata = ImageMetadata {
        pre_image_m2_folder_size: measure_folder_size(runner, &pre_published, &workdir, LOCAL_M2_PATH)?.to_string(),
        pre_image_project_folder_size: measure_folder_size(runner, &pre_published, &workdir, &workdir)?.to_string(),
        post_image_m2_folder_size: measure_folder_size(runner, &post_published, &workdir, LOCAL_M2_PATH)?.to_string(),
        post_image_project_folder_size: measure_folder_size(runner, &post_published, &workdir, &workdir)?.to_string(),
    };
    result_manager.merge_image_metadata(&commit, metadata)?;

    candidate.failure_category = Some(failure_category);
    candidate.pre_commit_reproduction_command = Some(format!("docker run {pre_published}"));
    candidate.breaking_update_reproduction_command = Some(format!("docker run {post_published}"));

    result_manager.store_result(&candidate)?;

    runner.remove_image(&commit, "pre")?;
    runner.remove_image(&commit, "post")?;
    runner.remove_image(&base_repo, "base")?;

    Ok(ReproductionOutcome::Success(candidate))
}
