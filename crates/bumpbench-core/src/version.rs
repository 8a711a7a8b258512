//! Maven version-bump classification.
//!
//! Unlike `semver`, a Maven `<version>` is an arbitrary dot-separated token
//! stream that may carry qualifiers (`-SNAPSHOT`, `.v20190418`, ...). This
//! module only answers the narrow question the benchmark needs: given a
//! `(previousVersion, newVersion)` pair from a single-line POM bump, is the
//! change a `major`, `minor`, or `patch` release bump under the three-part
//! numeric reading of the version, or `other` when the versions don't fit
//! that shape.

use serde::{Deserialize, Serialize};

/// Classification of a version bump, per the semver-component growth rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionUpdateType {
    Major,
    Minor,
    Patch,
    Other,
}

/// Classify the bump from `previous` to `new`.
///
/// Both versions must parse as two or three dot-separated, purely numeric
/// components (a two-component version is read as `X.Y.0`); anything else
/// (extra components, non-numeric segments, qualifiers) yields `Other`.
pub fn classify(previous: &str, new: &str) -> VersionUpdateType {
    let (Some(a), Some(b)) = (parse_numeric_triple(previous), parse_numeric_triple(new)) else {
        return VersionUpdateType::Other;
    };

    if a[0] != b[0] {
        if b[0] > a[0] {
            VersionUpdateType::Major
        } else {
            VersionUpdateType::Other
        }
    } else if a[1] != b[1] {
        if b[1] > a[1] {
            VersionUpdateType::Minor
        } else {
            VersionUpdateType::Other
        }
    } else if a[2] != b[2] {
        if b[2] > a[2] {
            VersionUpdateType::Patch
        } else {
            VersionUpdateType::Other
        }
    } else {
        VersionUpdateType::Other
    }
}

/// Parse `"X.Y"` or `"X.Y.Z"` into `[X, Y, Z]`, padding a missing `Z` with
/// zero. Returns `None` if the component count is outside `2..=3` or any
/// component is not a plain non-negative integer.
fn parse_numeric_triple(version: &str) -> Option<[u64; 3]> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    let mut out = [0u64; 3];
    for (i, part) in parts.iter().enumerate() {
        out[i] = part.parse().ok()?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use VersionUpdateType::*;

    #[test]
    fn four_component_version_is_other() {
        assert_eq!(classify("9.4.17.v20190418", "10.0.10"), Other);
    }

    #[test]
    fn minor_bump() {
        assert_eq!(classify("2.6.0", "2.9.4"), Minor);
    }

    #[test]
    fn major_bump() {
        assert_eq!(classify("4.11.0", "5.3.1"), Major);
        assert_eq!(classify("5.1.49", "8.0.28"), Major);
    }

    #[test]
    fn minor_bump_across_two_component_boundary() {
        assert_eq!(classify("0.5.36", "0.6.0"), Minor);
    }

    #[test]
    fn patch_bump() {
        assert_eq!(classify("1.4.17", "1.4.18"), Patch);
    }

    #[test]
    fn two_component_versions_pad_with_zero() {
        assert_eq!(classify("1.2", "1.3"), Minor);
        assert_eq!(classify("1.2", "2.0"), Major);
    }

    #[test]
    fn identical_versions_are_other() {
        assert_eq!(classify("1.2.3", "1.2.3"), Other);
    }

    #[test]
    fn downgrade_is_other() {
        assert_eq!(classify("2.0.0", "1.9.9"), Other);
    }
}
