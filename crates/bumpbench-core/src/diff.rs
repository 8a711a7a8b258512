//! Line-anchored extraction of a single-line Maven `<version>` bump from a
//! unified diff, backing both the single-line-bump filter and the
//! candidate-coordinate extraction.
//!
//! This module is pure text analysis with no network or Forge dependency so
//! it can be exercised directly against diff fixtures.

use regex::Regex;
use std::sync::OnceLock;

/// Everything the candidate model can read directly off the diff, before
/// the POM at the breaking commit is fetched to resolve `dependencySection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomVersionBump {
    pub file_path: String,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub scope: Option<String>,
    pub previous_version: String,
    pub new_version: String,
}

fn version_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<version>(.*)</version>$").unwrap())
}

fn id_line_re(tag: &str) -> Regex {
    Regex::new(&format!(r"^<{tag}>(.*)</{tag}>$")).unwrap()
}

/// Accept iff the diff touches exactly one file, with exactly one addition
/// and one deletion, the changed file is a `pom.xml`, and both the removed
/// and added lines are a `<version>...</version>` line sitting inside the
/// same `<dependency>...</dependency>` block. Returns the extracted
/// coordinate on acceptance, `None` on rejection.
pub fn single_line_pom_version_bump(diff: &str) -> Option<PomVersionBump> {
    let file_path = single_changed_pom_file(diff)?;
    let lines: Vec<&str> = diff.lines().collect();

    let mut addition_idx = None;
    let mut deletion_idx = None;
    let mut addition_count = 0;
    let mut deletion_count = 0;

    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }
        if let Some(rest) = line.strip_prefix('+') {
            addition_count += 1;
            if version_line_re().is_match(rest.trim()) {
                addition_idx = Some(i);
            }
        } else if let Some(rest) = line.strip_prefix('-') {
            deletion_count += 1;
            if version_line_re().is_match(rest.trim()) {
                deletion_idx = Some(i);
            }
        }
    }

    if addition_count != 1 || deletion_count != 1 {
        return None;
    }
    let (addition_idx, deletion_idx) = (addition_idx?, deletion_idx?);

    let previous_version = capture_version(lines[deletion_idx])?;
    let new_version = capture_version(lines[addition_idx])?;

    let anchor = addition_idx.min(deletion_idx);
    let block = dependency_block_bounds(&lines, anchor)?;

    let group_id = tag_value_in_block(&lines, block, "groupId");
    let artifact_id = tag_value_in_block(&lines, block, "artifactId");
    let scope = tag_value_in_block(&lines, block, "scope");

    Some(PomVersionBump {
        file_path,
        group_id,
        artifact_id,
        scope,
        previous_version,
        new_version,
    })
}

/// The path of the single file this diff touches, if it's exactly one file
/// and that file's path contains `pom.xml`.
fn single_changed_pom_file(diff: &str) -> Option<String> {
    let mut paths = Vec::new();
    for line in diff.lines() {
        if let Some(rest) = line.strip_prefix("+++ ") {
            if rest.trim() == "/dev/null" {
                continue;
            }
            let path = rest.trim_start_matches("b/").trim().to_string();
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    if paths.len() != 1 {
        return None;
    }
    let path = paths.into_iter().next().unwrap();
    if path.contains("pom.xml") {
        Some(path)
    } else {
        None
    }
}

fn capture_version(line: &str) -> Option<String> {
    let body = line.strip_prefix('+').or_else(|| line.strip_prefix('-'))?;
    version_line_re()
        .captures(body.trim())
        .map(|c| c[1].to_string())
}

/// Find the `(open, close)` line indices of the `<dependency>...</dependency>`
/// block enclosing `anchor`, by walking outward without crossing another
/// dependency boundary first. Returns `None` if `anchor` isn't inside one.
fn dependency_block_bounds(lines: &[&str], anchor: usize) -> Option<(usize, usize)> {
    let open = lines[..=anchor]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, line)| match diff_line_body(line).as_str() {
            "</dependency>" => Some(None),
            "<dependency>" => Some(Some(i)),
            _ => Option::None,
        })
        .flatten()?;

    let close = lines[anchor..]
        .iter()
        .enumerate()
        .find_map(|(offset, line)| match diff_line_body(line).as_str() {
            "<dependency>" if anchor + offset != open => Some(None),
            "</dependency>" => Some(Some(anchor + offset)),
            _ => Option::None,
        })
        .flatten()?;

    Some((open, close))
}

/// First line within `(open, close)` (exclusive of the boundary tags
/// themselves) matching `<tag>value</tag>`.
fn tag_value_in_block(lines: &[&str], (open, close): (usize, usize), tag: &str) -> Option<String> {
    let re = id_line_re(tag);
    lines[open + 1..close]
        .iter()
        .find_map(|line| re.captures(&diff_line_body(line)).map(|c| c[1].to_string()))
}

/// Strip the unified-diff marker (`+`, `-`, or a leading context space) and
/// trim, so context/addition/removal lines can be matched uniformly.
fn diff_line_body(line: &str) -> String {
    let trimmed = line
        .strip_prefix('+')
        .or_else(|| line.strip_prefix('-'))
        .or_else(|| line.strip_prefix(' '))
        .unwrap_or(line);
    trimmed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_BUMP: &str = "\
diff --git a/pom.xml b/pom.xml
--- a/pom.xml
+++ b/pom.xml
@@ -10,7 +10,7 @@
     <dependency>
       <groupId>org.eclipse.jetty</groupId>
       <artifactId>jetty-server</artifactId>
-      <version>9.4.17.v20190418</version>
+      <version>10.0.10</version>
     </dependency>
";

    #[test]
    fn accepts_single_line_version_bump_inside_dependency() {
        let bump = single_line_pom_version_bump(SIMPLE_BUMP).unwrap();
        assert_eq!(bump.previous_version, "9.4.17.v20190418");
        assert_eq!(bump.new_version, "10.0.10");
        assert_eq!(bump.group_id.as_deref(), Some("org.eclipse.jetty"));
        assert_eq!(bump.artifact_id.as_deref(), Some("jetty-server"));
        assert_eq!(bump.file_path, "pom.xml");
    }

    #[test]
    fn rejects_two_changed_files() {
        let diff = format!(
            "{SIMPLE_BUMP}diff --git a/README.md b/README.md\n--- a/README.md\n+++ b/README.md\n@@ -1 +1 @@\n-old\n+new\n"
        );
        assert!(single_line_pom_version_bump(&diff).is_none());
    }

    #[test]
    fn rejects_multiple_additions() {
        let diff = "\
--- a/pom.xml
+++ b/pom.xml
@@ -10,8 +10,8 @@
    <dependency>
      <groupId>g</groupId>
      <artifactId>a</artifactId>
-     <version>1.0</version>
+     <version>2.0</version>
+     <!-- bumped -->
    </dependency>
";
        assert!(single_line_pom_version_bump(diff).is_none());
    }

    #[test]
    fn rejects_non_pom_file() {
        let diff = "\
--- a/build.gradle
+++ b/build.gradle
@@ -1,3 +1,3 @@
   dependency {
-    version 1.0
+    version 2.0
   }
";
        assert!(single_line_pom_version_bump(diff).is_none());
    }

    #[test]
    fn rejects_version_line_outside_dependency_block() {
        let diff = "\
--- a/pom.xml
+++ b/pom.xml
@@ -1,3 +1,3 @@
<project>
-  <version>1.0</version>
+  <version>2.0</version>
</project>
";
        assert!(single_line_pom_version_bump(diff).is_none());
    }
}
