//! End-to-end run of `reproduce_candidate` against `FakeRunner`: the
//! preparation step, both sides of the state machine, image publication,
//! metadata, and the partition move, all without a daemon. The Forge client
//! points at an unroutable address, so enrichment exercises its own
//! failure-swallowing path.

use bumpbench_container::fake::FakeRunner;
use bumpbench_core::model::{AuthorKind, BreakingUpdate, DependencyScope, DependencySection, FailureCategory, UpdatedDependency};
use bumpbench_core::store::{JsonStore, Partition};
use bumpbench_forge::client::ForgeClient;
use bumpbench_forge::config::{Credential, RegistryCredentials};
use bumpbench_reproducer::reproduce::{reproduce_candidate, ReproductionOutcome};
use bumpbench_reproducer::result_manager::ResultManager;

const COMMIT: &str = "cafebabe";
const BASE_IMAGE: &str = "maven:3.8-eclipse-temurin-11";

fn candidate() -> BreakingUpdate {
    BreakingUpdate {
        breaking_commit: COMMIT.to_string(),
        url: "https://github.com/acme/widget/pull/1".to_string(),
        project: "widget".to_string(),
        project_organisation: "acme".to_string(),
        pr_author: AuthorKind::Bot,
        pre_commit_author: AuthorKind::Human,
        breaking_commit_author: AuthorKind::Bot,
        license_info: "unknown".to_string(),
        updated_dependency: UpdatedDependency::new(
            "org.eclipse.jetty".to_string(),
            "jetty-server".to_string(),
            "9.4.17.v20190418".to_string(),
            "10.0.10".to_string(),
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

fn registry() -> RegistryCredentials {
    RegistryCredentials {
        user_name: "user".to_string(),
        identity_token: "token".to_string(),
        repository: "ghcr.io/acme/bumpbench".to_string(),
    }
}

#[test]
fn full_success_path_publishes_images_and_moves_record_to_benchmark() {
    let runner = FakeRunner::new();
    // Creation order from the `:base` image: one passing PRE run, then
    // three identically-failing POST runs.
    let base_tag = format!("{COMMIT}:base");
    runner.queue_exit_code(&base_tag, 0);
    runner.queue_exit_code(&base_tag, 1);
    runner.queue_exit_code(&base_tag, 1);
    runner.queue_exit_code(&base_tag, 1);
    runner.set_file(
        &base_tag,
        &format!("/widget/{COMMIT}.log"),
        b"COMPILATION ERROR : cannot find symbol".to_vec(),
    );

    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(dir.path());
    let manager = ResultManager::new(store.clone(), dir.path().join("logs"), dir.path().join("jars"));
    store.write_record(Partition::Candidates, &candidate()).unwrap();

    let client = ForgeClient::new("http://127.0.0.1:9").unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();

    let outcome = reproduce_candidate(
        &runner,
        &manager,
        &client,
        &Credential("test-token".to_string()),
        &registry(),
        rt.handle(),
        candidate(),
        "https://github.com/acme/widget.git",
    )
    .unwrap();

    let record = match outcome {
        ReproductionOutcome::Success(record) => record,
        _ => panic!("expected a successful reproduction"),
    };
    assert_eq!(record.failure_category, Some(FailureCategory::CompilationFailure));
    assert_eq!(
        record.pre_commit_reproduction_command.as_deref(),
        Some("docker run ghcr.io/acme/bumpbench:cafebabe-pre")
    );
    assert_eq!(
        record.breaking_update_reproduction_command.as_deref(),
        Some("docker run ghcr.io/acme/bumpbench:cafebabe-breaking")
    );

    // The record moved from candidates/ to benchmark/.
    assert!(!store.exists_in(Partition::Candidates, COMMIT));
    assert!(store.exists_in(Partition::Benchmark, COMMIT));

    // Base image pulled once, both final images pushed, intermediates gone.
    assert!(runner.pulled_images.lock().unwrap().contains(&BASE_IMAGE.to_string()));
    let pushed = runner.pushed.lock().unwrap();
    assert!(pushed.contains(&("ghcr.io/acme/bumpbench".to_string(), format!("{COMMIT}-pre"))));
    assert!(pushed.contains(&("ghcr.io/acme/bumpbench".to_string(), format!("{COMMIT}-breaking"))));
    let removed = runner.removed_images.lock().unwrap();
    assert!(removed.contains(&format!("{COMMIT}:pre")));
    assert!(removed.contains(&format!("{COMMIT}:post")));
    assert!(removed.contains(&format!("{COMMIT}:base")));

    // Folder sizes landed in image_metadata.json under the commit key.
    let metadata: std::collections::HashMap<String, serde_json::Value> = store
        .read_json(&dir.path().join("image_metadata.json"))
        .unwrap()
        .unwrap();
    assert!(metadata.contains_key(COMMIT));
}

#[test]
fn failed_clone_discards_the_candidate_without_a_partition_write() {
    let runner = FakeRunner::new();
    runner.set_exit_code(BASE_IMAGE, 128);

    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(dir.path());
    let manager = ResultManager::new(store.clone(), dir.path().join("logs"), dir.path().join("jars"));
    store.write_record(Partition::Candidates, &candidate()).unwrap();

    let client = ForgeClient::new("http://127.0.0.1:9").unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();

    let outcome = reproduce_candidate(
        &runner,
        &manager,
        &client,
        &Credential("test-token".to_string()),
        &registry(),
        rt.handle(),
        candidate(),
        "https://github.com/acme/widget.git",
    )
    .unwrap();

    assert!(matches!(outcome, ReproductionOutcome::Irrecoverable { .. }));
    // The candidate file is untouched here; removal is the caller's call.
    assert!(store.exists_in(Partition::Candidates, COMMIT));
    assert!(!store.exists_in(Partition::Benchmark, COMMIT));
    assert!(!store.exists_in(Partition::Unsuccessful, COMMIT));
}
