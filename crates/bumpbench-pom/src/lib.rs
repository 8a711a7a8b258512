//! Maven POM parsing, scoped to what the candidate model needs: locating
//! which section of the POM hierarchy a `(groupId, artifactId)` dependency
//! coordinate lives under.

use quick_xml::events::Event;
use quick_xml::Reader;

use bumpbench_util::errors::BumpbenchError;

/// The six places a dependency coordinate can be declared, in the priority
/// order used to resolve `dependencySection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Dependencies,
    BuildPlugins,
    BuildPluginManagement,
    DependencyManagement,
    ProfileDependencies,
    ProfileBuildPlugins,
}

const SECTION_CONTEXTS: [(&str, Section); 6] = [
    ("project>dependencies>dependency", Section::Dependencies),
    (
        "project>build>plugins>plugin>dependencies>dependency",
        Section::BuildPlugins,
    ),
    (
        "project>build>pluginManagement>plugins>plugin>dependencies>dependency",
        Section::BuildPluginManagement,
    ),
    (
        "project>dependencyManagement>dependencies>dependency",
        Section::DependencyManagement,
    ),
    (
        "project>profiles>profile>dependencies>dependency",
        Section::ProfileDependencies,
    ),
    (
        "project>profiles>profile>build>plugins>plugin>dependencies>dependency",
        Section::ProfileBuildPlugins,
    ),
];

/// A dependency coordinate found at a known location in the POM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub section: Section,
}

/// A parsed POM, reduced to the dependency coordinates needed to answer
/// "what section is this dependency declared in".
#[derive(Debug, Clone, Default)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub dependencies: Vec<LocatedDependency>,
}

impl Pom {
    /// Resolve the section a `(groupId, artifactId)` pair is declared
    /// under, preferring the first match in declaration-priority order when
    /// a coordinate (unusually) appears in more than one section.
    pub fn find_section(&self, group_id: &str, artifact_id: &str) -> Option<Section> {
        SECTION_CONTEXTS
            .iter()
            .map(|(_, section)| *section)
            .find(|section| {
                self.dependencies
                    .iter()
                    .any(|d| d.section == *section && d.group_id == group_id && d.artifact_id == artifact_id)
            })
    }
}

/// Parse a POM XML document.
pub fn parse_pom(xml: &str) -> Result<Pom, BumpbenchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    let mut current: Option<Section> = None;
    let mut pending_group = String::new();
    let mut pending_artifact = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                path.push(tag);
                text_buf.clear();

                let ctx = path_context(&path);
                if let Some(section) = section_for_context(&ctx) {
                    current = Some(section);
                    pending_group.clear();
                    pending_artifact.clear();
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(ref e)) => {
                let _ = e;
                let ctx = path_context(&path);
                let depth = path.len();

                if current.is_some() {
                    // Only direct children of the `<dependency>` element
                    // count; an `<exclusions>` block's coordinates must not
                    // clobber the dependency's own.
                    let direct_child = depth >= 2
                        && section_for_context(&path_context(&path[..depth - 1])).is_some();
                    if direct_child {
                        match path.last().map(|s| s.as_str()) {
                            Some("groupId") => pending_group = text_buf.clone(),
                            Some("artifactId") => pending_artifact = text_buf.clone(),
                            _ => {}
                        }
                    }
                    if section_for_context(&ctx).is_some() {
                        if let Some(section) = current.take() {
                            if !pending_group.is_empty() && !pending_artifact.is_empty() {
                                pom.dependencies.push(LocatedDependency {
                                    group_id: pending_group.clone(),
                                    artifact_id: pending_artifact.clone(),
                                    section,
                                });
                            }
                        }
                    }
                }

                if depth == 2 {
                    match path.last().map(|s| s.as_str()) {
                        Some("groupId") => pom.group_id = Some(text_buf.clone()),
                        Some("artifactId") => pom.artifact_id = Some(text_buf.clone()),
                        _ => {}
                    }
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BumpbenchError::Parse {
                    message: format!("failed to parse POM XML: {e}"),
                })
            }
            _ => {}
        }
    }

    Ok(pom)
}

fn section_for_context(ctx: &str) -> Option<Section> {
    SECTION_CONTEXTS
        .iter()
        .find(|(path, _)| *path == ctx)
        .map(|(_, section)| *section)
}

fn path_context(path: &[String]) -> String {
    path.join(">")
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<project>
  <groupId>com.example</groupId>
  <artifactId>demo</artifactId>
  <dependencies>
    <dependency>
      <groupId>org.eclipse.jetty</groupId>
      <artifactId>jetty-server</artifactId>
      <version>10.0.10</version>
    </dependency>
  </dependencies>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.fasterxml.jackson</groupId>
        <artifactId>jackson-bom</artifactId>
        <version>2.15.0</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <build>
    <plugins>
      <plugin>
        <groupId>org.apache.maven.plugins</groupId>
        <artifactId>maven-enforcer-plugin</artifactId>
        <dependencies>
          <dependency>
            <groupId>org.codehaus.mojo</groupId>
            <artifactId>extra-enforcer-rules</artifactId>
            <version>1.6.1</version>
          </dependency>
        </dependencies>
      </plugin>
    </plugins>
  </build>
  <profiles>
    <profile>
      <id>ci</id>
      <dependencies>
        <dependency>
          <groupId>org.example</groupId>
          <artifactId>ci-only</artifactId>
          <version>1.0</version>
        </dependency>
      </dependencies>
    </profile>
  </profiles>
</project>"#;

    #[test]
    fn finds_top_level_dependency() {
        let pom = parse_pom(POM).unwrap();
        assert_eq!(
            pom.find_section("org.eclipse.jetty", "jetty-server"),
            Some(Section::Dependencies)
        );
    }

    #[test]
    fn finds_dependency_management() {
        let pom = parse_pom(POM).unwrap();
        assert_eq!(
            pom.find_section("com.fasterxml.jackson", "jackson-bom"),
            Some(Section::DependencyManagement)
        );
    }

    #[test]
    fn finds_build_plugin_dependency() {
        let pom = parse_pom(POM).unwrap();
        assert_eq!(
            pom.find_section("org.codehaus.mojo", "extra-enforcer-rules"),
            Some(Section::BuildPlugins)
        );
    }

    #[test]
    fn finds_profile_dependency() {
        let pom = parse_pom(POM).unwrap();
        assert_eq!(
            pom.find_section("org.example", "ci-only"),
            Some(Section::ProfileDependencies)
        );
    }

    #[test]
    fn unfound_coordinate_returns_none() {
        let pom = parse_pom(POM).unwrap();
        assert_eq!(pom.find_section("nope", "nope"), None);
    }

    #[test]
    fn exclusions_do_not_clobber_the_dependency_coordinate() {
        let xml = r#"<project>
  <dependencies>
    <dependency>
      <groupId>org.eclipse.jetty</groupId>
      <artifactId>jetty-server</artifactId>
      <version>10.0.10</version>
      <exclusions>
        <exclusion>
          <groupId>javax.servlet</groupId>
          <artifactId>servlet-api</artifactId>
        </exclusion>
      </exclusions>
    </dependency>
  </dependencies>
</project>"#;
        let pom = parse_pom(xml).unwrap();
        assert_eq!(
            pom.find_section("org.eclipse.jetty", "jetty-server"),
            Some(Section::Dependencies)
        );
        assert_eq!(pom.find_section("javax.servlet", "servlet-api"), None);
    }
}
