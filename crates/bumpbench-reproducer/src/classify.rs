//! Classify a build log into a `FailureCategory` by priority-ordered,
//! case-insensitive substring match. The first match wins.

use bumpbench_core::model::FailureCategory;

/// Priority-ordered pattern rules. Compiler, enforcer, and resolution
/// failures come first, followed by the more specific build-tool
/// signatures, then the `TEST_FAILURE` catch-all.
const RULES: &[(&[&str], FailureCategory)] = &[
    (&["compilation error :"], FailureCategory::CompilationFailure),
    (
        &["failed to execute goal org.apache.maven.plugins:maven-enforcer-plugin"],
        FailureCategory::MavenEnforcerFailure,
    ),
    (&["could not resolve dependencies"], FailureCategory::DependencyResolutionFailure),
    (
        &["could not find artifact"],
        FailureCategory::DependencyLockFailure,
    ),
    (
        &["failed to execute goal org.apache.maven.plugins:maven-checkstyle-plugin"],
        FailureCategory::CheckstyleFailure,
    ),
    (
        &["warnings found and -werror specified", "[error] some errors have occurred"],
        FailureCategory::WerrorFailure,
    ),
    (
        &[
            "com.sun.istack.saxexception2",
            "failed to execute goal org.jvnet.jaxb2.maven2:maven-jaxb2-plugin",
        ],
        FailureCategory::JaxbFailure,
    ),
    (
        &["failed to execute goal org.apache.maven.plugins:maven-scm-plugin"],
        FailureCategory::ScmCheckoutFailure,
    ),
    (
        &["failed to execute goal org.jenkins-ci.tools:maven-hpi-plugin"],
        FailureCategory::JenkinsPluginFailure,
    ),
    (
        &["[error] tests run:", "there are test failures"],
        FailureCategory::TestFailure,
    ),
];

/// Classify a build log. Never fails: an unmatched log is `UnknownFailure`.
pub fn classify(log: &str) -> FailureCategory {
    let lower = log.to_lowercase();
    for (patterns, category) in RULES {
        if patterns.iter().any(|p| lower.contains(p)) {
            return *category;
        }
    }
    FailureCategory::UnknownFailure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_error_wins_over_test_failure_text() {
        let log = "COMPILATION ERROR : \nsome unrelated [ERROR] Tests run: 1";
        assert_eq!(classify(log), FailureCategory::CompilationFailure);
    }

    #[test]
    fn enforcer_failure_is_detected() {
        let log = "Failed to execute goal org.apache.maven.plugins:maven-enforcer-plugin:3.0.0:enforce";
        assert_eq!(classify(log), FailureCategory::MavenEnforcerFailure);
    }

    #[test]
    fn dependency_resolution_failure_is_detected() {
        let log = "Could not resolve dependencies for project org.example:demo:jar:1.0";
        assert_eq!(classify(log), FailureCategory::DependencyResolutionFailure);
    }

    #[test]
    fn test_failure_catch_all() {
        let log = "[ERROR] Tests run: 10, Failures: 2, Errors: 0, Skipped: 0";
        assert_eq!(classify(log), FailureCategory::TestFailure);
    }

    #[test]
    fn checkstyle_failure_is_detected() {
        let log = "Failed to execute goal org.apache.maven.plugins:maven-checkstyle-plugin:3.1.2:check";
        assert_eq!(classify(log), FailureCategory::CheckstyleFailure);
    }

    #[test]
    fn werror_failure_is_detected() {
        let log = "warnings found and -Werror specified";
        assert_eq!(classify(log), FailureCategory::WerrorFailure);
    }

    #[test]
    fn jaxb_plugin_failure_is_detected() {
        let log = "Failed to execute goal org.jvnet.jaxb2.maven2:maven-jaxb2-plugin:0.14.0:generate";
        assert_eq!(classify(log), FailureCategory::JaxbFailure);
    }

    #[test]
    fn jaxb_mention_alone_is_not_a_jaxb_failure() {
        let log = "[INFO] jaxb-api-2.3.1.jar downloaded\n[ERROR] Tests run: 3, Failures: 1";
        assert_eq!(classify(log), FailureCategory::TestFailure);
    }

    #[test]
    fn unmatched_log_is_unknown() {
        assert_eq!(classify("totally unrelated output"), FailureCategory::UnknownFailure);
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(classify("compilation error : cannot find symbol"), FailureCategory::CompilationFailure);
    }
}
