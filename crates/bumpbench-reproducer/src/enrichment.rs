//! Best-effort, non-fatal enrichment of a successful reproduction with a
//! forge compare-link and Maven-Central source-jar links.

use bumpbench_forge::client::ForgeClient;
use bumpbench_forge::config::Credential;

const MAVEN_CENTRAL_BASE: &str = "https://repo1.maven.org/maven2";

/// Resolved enrichment links. Every field is `None` when the corresponding
/// lookup failed or the referenced tag/artifact doesn't exist; a failed
/// lookup never aborts the candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentLinks {
    pub github_compare_link: Option<String>,
    pub maven_source_link_pre: Option<String>,
    pub maven_source_link_breaking: Option<String>,
}

fn maven_central_sources_url(group_id: &str, artifact_id: &str, version: &str) -> String {
    let group_path = group_id.replace('.', "/");
    format!("{MAVEN_CENTRAL_BASE}/{group_path}/{artifact_id}/{version}/{artifact_id}-{version}-sources.jar")
}

/// Does the forge hold a tag named `tag` for `repo` (`owner/project`)?
async fn tag_exists(client: &ForgeClient, credential: &Credential, repo: &str, tag: &str) -> bool {
    client
        .head_exists(&format!("/repos/{repo}/git/ref/tags/{tag}"), credential)
        .await
        .unwrap_or(false)
}

/// Resolve all three enrichment links. Each sub-lookup is independent and
/// swallows its own failure, so one bad HEAD check never drops the others.
pub async fn resolve(
    client: &ForgeClient,
    credential: &Credential,
    repo: &str,
    previous_version: &str,
    new_version: &str,
    group_id: &str,
    artifact_id: &str,
) -> EnrichmentLinks {
    let github_compare_link =
        if tag_exists(client, credential, repo, previous_version).await && tag_exists(client, credential, repo, new_version).await {
            Some(format!("https://github.com/{repo}/compare/{previous_version}...{new_version}"))
        } else {
            None
        };

    let pre_url = maven_central_sources_url(group_id, artifact_id, previous_version);
    let maven_source_link_pre = match client.head_exists(&pre_url, credential).await {
        Ok(true) => Some(pre_url),
        _ => None,
    };

    let breaking_url = maven_central_sources_url(group_id, artifact_id, new_version);
    let maven_source_link_breaking = match client.head_exists(&breaking_url, credential).await {
        Ok(true) => Some(breaking_url),
        _ => None,
    };

    EnrichmentLinks {
        github_compare_link,
        maven_source_link_pre,
        maven_source_link_breaking,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maven_central_url_uses_the_group_path_layout() {
        let url = maven_central_sources_url("org.eclipse.jetty", "jetty-server", "10.0.10");
        assert_eq!(
            url,
            "https://repo1.maven.org/maven2/org/eclipse/jetty/jetty-server/10.0.10/jetty-server-10.0.10-sources.jar"
        );
    }
}
