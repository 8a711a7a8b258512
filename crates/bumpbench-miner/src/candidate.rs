//! Turning a pull request that passed the mining filters into a
//! `BreakingUpdate` candidate record.

use bumpbench_core::diff::PomVersionBump;
use bumpbench_core::model::{AuthorKind, BreakingUpdate, DependencyScope, DependencySection, UpdatedDependency};
use bumpbench_pom::Pom;

/// Build the `BreakingUpdate` shell for a candidate, before reproduction.
/// `pom` is the Maven model at the breaking commit, used to resolve
/// `dependencySection`; pass `None` when the POM could not be fetched, in
/// which case the section resolves to `unknown`.
pub fn build_candidate(
    url: String,
    project: String,
    project_organisation: String,
    breaking_commit: String,
    bump: &PomVersionBump,
    pom: Option<&Pom>,
    pr_author_is_bot: bool,
    pr_author_login: Option<&str>,
    pre_commit_author_is_bot: Option<bool>,
    pre_commit_author_login: Option<&str>,
    breaking_commit_author_is_bot: Option<bool>,
    breaking_commit_author_login: Option<&str>,
) -> BreakingUpdate {
    let group_id = bump.group_id.clone().unwrap_or_else(|| "unknown".to_string());
    let artifact_id = bump.artifact_id.clone().unwrap_or_else(|| "unknown".to_string());

    let section = pom
        .and_then(|p| p.find_section(&group_id, &artifact_id))
        .map(section_from_pom_section)
        .unwrap_or(DependencySection::Unknown);

    let scope = DependencyScope::parse(bump.scope.as_deref());

    let updated_dependency = UpdatedDependency::new(
        group_id,
        artifact_id,
        bump.previous_version.clone(),
        bump.new_version.clone(),
        scope,
        section,
    );

    let pr_author = classify_author(Some(pr_author_is_bot), pr_author_login);
    let pre_commit_author = classify_author(pre_commit_author_is_bot, pre_commit_author_login);
    let breaking_commit_author = classify_author(breaking_commit_author_is_bot, breaking_commit_author_login);

    BreakingUpdate {
        breaking_commit,
        url,
        project,
        project_organisation,
        pr_author,
        pre_commit_author,
        breaking_commit_author,
        license_info: "unknown".to_string(),
        updated_dependency,
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

fn classify_author(is_bot: Option<bool>, login: Option<&str>) -> AuthorKind {
    match is_bot {
        Some(is_bot) => AuthorKind::classify(is_bot, login),
        None => AuthorKind::Unknown,
    }
}

/// Split a Forge `"owner/repo"` full name into its organisation and
/// project-name components.
pub fn split_full_name(full_name: &str) -> (String, String) {
    match full_name.split_once('/') {
        Some((org, project)) => (org.to_string(), project.to_string()),
        None => ("unknown".to_string(), full_name.to_string()),
    }
}

fn section_from_pom_section(section: bumpbench_pom::Section) -> DependencySection {
    match section {
        bumpbench_pom::Section::Dependencies => DependencySection::Dependencies,
        bumpbench_pom::Section::BuildPlugins => DependencySection::BuildPlugins,
        bumpbench_pom::Section::BuildPluginManagement => DependencySection::BuildPluginManagement,
        bumpbench_pom::Section::DependencyManagement => DependencySection::DependencyManagement,
        bumpbench_pom::Section::ProfileDependencies => DependencySection::ProfileDependencies,
        bumpbench_pom::Section::ProfileBuildPlugins => DependencySection::ProfileBuildPlugins,
    }
}
