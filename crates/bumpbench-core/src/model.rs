//! The `BreakingUpdate` record and its nested types.

use serde::{Deserialize, Serialize};

use bumpbench_util::errors::BumpbenchError;

use crate::version::{self, VersionUpdateType};

/// Whether an actor (PR author, commit author) is a bot or a human.
///
/// Bot detection: the Forge marks the user as a bot, OR the login contains a
/// known dependency-bot substring (`dependabot`, `renovate`, case-insensitive).
/// A missing author is stored verbatim as `Unknown` rather than defaulted to
/// either value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorKind {
    Human,
    Bot,
    Unknown,
}

const BOT_LOGIN_SUBSTRINGS: [&str; 2] = ["dependabot", "renovate"];

impl AuthorKind {
    /// Classify an actor from the Forge's own bot flag and their login.
    pub fn classify(is_bot: bool, login: Option<&str>) -> Self {
        if is_bot {
            return AuthorKind::Bot;
        }
        match login {
            Some(login) => {
                let lower = login.to_lowercase();
                if BOT_LOGIN_SUBSTRINGS.iter().any(|s| lower.contains(s)) {
                    AuthorKind::Bot
                } else {
                    AuthorKind::Human
                }
            }
            None => AuthorKind::Unknown,
        }
    }
}

/// Maven dependency scope. Default is `compile` when absent from the POM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    Compile,
    Provided,
    Runtime,
    System,
    Import,
}

impl Default for DependencyScope {
    fn default() -> Self {
        DependencyScope::Compile
    }
}

impl DependencyScope {
    /// Parse a `<scope>` text value, defaulting to `compile` on no match,
    /// the same default Maven itself applies to an absent scope.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("provided") => DependencyScope::Provided,
            Some("runtime") => DependencyScope::Runtime,
            Some("system") => DependencyScope::System,
            Some("import") => DependencyScope::Import,
            _ => DependencyScope::Compile,
        }
    }
}

/// Where in the POM hierarchy the updated dependency coordinate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencySection {
    Dependencies,
    BuildPlugins,
    BuildPluginManagement,
    DependencyManagement,
    ProfileDependencies,
    ProfileBuildPlugins,
    Unknown,
}

impl Default for DependencySection {
    fn default() -> Self {
        DependencySection::Unknown
    }
}

/// Build-failure classification assigned by the failure classifier after a
/// reproduction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCategory {
    CompilationFailure,
    TestFailure,
    DependencyResolutionFailure,
    MavenEnforcerFailure,
    DependencyLockFailure,
    JenkinsPluginFailure,
    JaxbFailure,
    ScmCheckoutFailure,
    CheckstyleFailure,
    WerrorFailure,
    UnknownFailure,
}

impl FailureCategory {
    /// The `SCREAMING_SNAKE_CASE` spelling used in the on-disk document and
    /// in the final image's `failure_category` label.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureCategory::CompilationFailure => "COMPILATION_FAILURE",
            FailureCategory::TestFailure => "TEST_FAILURE",
            FailureCategory::DependencyResolutionFailure => "DEPENDENCY_RESOLUTION_FAILURE",
            FailureCategory::MavenEnforcerFailure => "MAVEN_ENFORCER_FAILURE",
            FailureCategory::DependencyLockFailure => "DEPENDENCY_LOCK_FAILURE",
            FailureCategory::JenkinsPluginFailure => "JENKINS_PLUGIN_FAILURE",
            FailureCategory::JaxbFailure => "JAXB_FAILURE",
            FailureCategory::ScmCheckoutFailure => "SCM_CHECKOUT_FAILURE",
            FailureCategory::CheckstyleFailure => "CHECKSTYLE_FAILURE",
            FailureCategory::WerrorFailure => "WERROR_FAILURE",
            FailureCategory::UnknownFailure => "UNKNOWN_FAILURE",
        }
    }
}

/// Which artifact type was found in the local Maven repository for the
/// updated dependency after a successful reproduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdatedFileType {
    Pom,
    Jar,
}

/// The dependency coordinate that was bumped, and everything derived from
/// the bump itself (scope, section, update kind).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedDependency {
    pub dependency_group_id: String,
    pub dependency_artifact_id: String,
    pub previous_version: String,
    pub new_version: String,
    #[serde(default)]
    pub dependency_scope: DependencyScope,
    pub version_update_type: VersionUpdateType,
    #[serde(default)]
    pub dependency_section: DependencySection,
}

impl UpdatedDependency {
    /// Build an `UpdatedDependency`, deriving `versionUpdateType` from
    /// which numeric component of the version pair grew.
    pub fn new(
        group_id: String,
        artifact_id: String,
        previous_version: String,
        new_version: String,
        scope: DependencyScope,
        section: DependencySection,
    ) -> Self {
        let version_update_type = version::classify(&previous_version, &new_version);
        Self {
            dependency_group_id: group_id,
            dependency_artifact_id: artifact_id,
            previous_version,
            new_version,
            dependency_scope: scope,
            version_update_type,
            dependency_section: section,
        }
    }

    /// A real bump changes the version: `previousVersion != newVersion`.
    pub fn has_distinct_versions(&self) -> bool {
        self.previous_version != self.new_version
    }
}

/// A breaking dependency update: identity, authorship, the updated
/// dependency, and, once reproduced, the failure classification and
/// reproduction commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakingUpdate {
    pub breaking_commit: String,
    pub url: String,
    pub project: String,
    pub project_organisation: String,

    pub pr_author: AuthorKind,
    pub pre_commit_author: AuthorKind,
    pub breaking_commit_author: AuthorKind,

    #[serde(default = "unknown_license")]
    pub license_info: String,

    pub updated_dependency: UpdatedDependency,

    #[serde(default)]
    pub failure_category: Option<FailureCategory>,
    #[serde(default = "default_java_version")]
    pub java_version_used_for_reproduction: String,
    #[serde(default)]
    pub pre_commit_reproduction_command: Option<String>,
    #[serde(default)]
    pub breaking_update_reproduction_command: Option<String>,

    #[serde(default)]
    pub github_compare_link: Option<String>,
    #[serde(default)]
    pub maven_source_link_pre: Option<String>,
    #[serde(default)]
    pub maven_source_link_breaking: Option<String>,
    #[serde(default)]
    pub updated_file_type: Option<UpdatedFileType>,
}

fn unknown_license() -> String {
    "unknown".to_string()
}

fn default_java_version() -> String {
    "11".to_string()
}

impl BreakingUpdate {
    /// Whether this record satisfies the `benchmark/` partition invariant:
    /// a failure category is set and both reproduction commands are present
    /// and non-empty. Image existence is checked by the caller against the
    /// registry, since that is an I/O operation this pure check can't do.
    pub fn is_benchmark_ready(&self) -> bool {
        self.failure_category.is_some()
            && self
                .pre_commit_reproduction_command
                .as_deref()
                .is_some_and(|s| !s.is_empty())
            && self
                .breaking_update_reproduction_command
                .as_deref()
                .is_some_and(|s| !s.is_empty())
    }

    /// Validate the record invariants that don't require network or
    /// filesystem access.
    pub fn validate(&self) -> Result<(), BumpbenchError> {
        if !self.updated_dependency.has_distinct_versions() {
            return Err(BumpbenchError::Candidate {
                commit: self.breaking_commit.clone(),
                message: "previousVersion equals newVersion".to_string(),
            });
        }
        let expected = version::classify(
            &self.updated_dependency.previous_version,
            &self.updated_dependency.new_version,
        );
        if expected != self.updated_dependency.version_update_type {
            return Err(BumpbenchError::Candidate {
                commit: self.breaking_commit.clone(),
                message: format!(
                    "versionUpdateType {:?} does not match derived {:?}",
                    self.updated_dependency.version_update_type, expected
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BreakingUpdate {
        BreakingUpdate {
            breaking_commit: "a".repeat(40),
            url: "https://forge.example/org/project/pull/1".to_string(),
            project: "project".to_string(),
            project_organisation: "org".to_string(),
            pr_author: AuthorKind::Bot,
            pre_commit_author: AuthorKind::Human,
            breaking_commit_author: AuthorKind::Bot,
            license_info: "Apache-2.0".to_string(),
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

    #[test]
    fn bot_login_substring_detection_is_case_insensitive() {
        assert_eq!(
            AuthorKind::classify(false, Some("Dependabot[bot]")),
            AuthorKind::Bot
        );
        assert_eq!(
            AuthorKind::classify(false, Some("RENOVATE-bot")),
            AuthorKind::Bot
        );
        assert_eq!(AuthorKind::classify(false, Some("octocat")), AuthorKind::Human);
        assert_eq!(AuthorKind::classify(false, None), AuthorKind::Unknown);
        assert_eq!(AuthorKind::classify(true, Some("octocat")), AuthorKind::Bot);
    }

    #[test]
    fn round_trip_through_json() {
        let record = sample();
        let json = serde_json::to_string(&record).unwrap();
        let back: BreakingUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn not_benchmark_ready_without_failure_category() {
        assert!(!sample().is_benchmark_ready());
    }

    #[test]
    fn benchmark_ready_with_category_and_commands() {
        let mut record = sample();
        record.failure_category = Some(FailureCategory::CompilationFailure);
        record.pre_commit_reproduction_command = Some("docker run repo:commit-pre".to_string());
        record.breaking_update_reproduction_command =
            Some("docker run repo:commit-breaking".to_string());
        assert!(record.is_benchmark_ready());
    }

    #[test]
    fn validate_rejects_equal_versions() {
        let mut record = sample();
        record.updated_dependency.new_version = record.updated_dependency.previous_version.clone();
        assert!(record.validate().is_err());
    }

    #[test]
    fn dependency_scope_defaults_to_compile() {
        assert_eq!(DependencyScope::parse(None), DependencyScope::Compile);
        assert_eq!(DependencyScope::parse(Some("bogus")), DependencyScope::Compile);
        assert_eq!(DependencyScope::parse(Some("provided")), DependencyScope::Provided);
    }
}
