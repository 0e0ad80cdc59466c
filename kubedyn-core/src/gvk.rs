//! Group-version identification and canonical naming.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to parse group version: {0}")]
/// Failed to parse group version.
pub struct ParseGroupVersionError(pub String);

/// Separator between a group name and its version
pub const SEPARATOR: char = '/';

/// Compute the canonical registry name for a group and an optional version.
///
/// - `("apps", Some("v1"))` gives `"apps/v1"`
/// - `("apps", None)` gives `"apps"`, which names the preferred version of the group
/// - `("", Some("v1"))` gives `"v1"`, which names the core group at that version
/// - `("apps/v1", Some("v2"))` gives `"apps/v2"`: an explicit version wins over an embedded one
/// - `("apps/v1", None)` gives `"apps/v1"` unchanged
///
/// An empty `version` is treated as absent.
///
/// Both registry population and registry lookup go through this function.
pub fn resolve_api_name(group: &str, version: Option<&str>) -> String {
    let version = version.filter(|v| !v.is_empty());
    match group.split_once(SEPARATOR) {
        Some((real_group, _embedded)) => match version {
            Some(v) => format!("{real_group}{SEPARATOR}{v}"),
            None => group.to_string(),
        },
        None if group.is_empty() => version.unwrap_or_default().to_string(),
        None => match version {
            Some(v) => format!("{group}{SEPARATOR}{v}"),
            None => group.to_string(),
        },
    }
}

/// One API group at one version, as found in the discovery catalog
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersion {
    /// API group, empty for the core group
    pub group: String,
    /// Version
    pub version: String,
    /// Whether the server marks this as the preferred version of its group
    #[serde(default)]
    pub preferred: bool,
}

impl GroupVersion {
    /// Core group name
    pub const CORE_GROUP: &'static str = "";

    /// Construct from explicit group and version
    pub fn gv(group: &str, version: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            preferred: false,
        }
    }

    /// The core group at the given version, which is always preferred
    pub fn core(version: &str) -> Self {
        Self::gv(Self::CORE_GROUP, version).preferred(true)
    }

    /// Set whether this is the preferred version of its group
    #[must_use]
    pub fn preferred(mut self, preferred: bool) -> Self {
        self.preferred = preferred;
        self
    }

    /// Whether this is the core (legacy, unnamed) group
    pub fn is_core(&self) -> bool {
        self.group.is_empty()
    }

    /// Generate the apiVersion string used in a kind's yaml
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// The canonical registry name pinned to this version
    pub fn canonical_name(&self) -> String {
        resolve_api_name(&self.group, Some(&self.version))
    }

    /// Url path serving this group-version, without a trailing slash
    ///
    /// The core group lives under `/api`, every other group under `/apis`.
    pub fn url_path(&self) -> String {
        if self.is_core() {
            format!("/api/{}", self.version)
        } else {
            format!("/apis/{}/{}", self.group, self.version)
        }
    }
}

impl FromStr for GroupVersion {
    type Err = ParseGroupVersionError;

    fn from_str(gv: &str) -> Result<Self, Self::Err> {
        let (group, version) = match gv.split_once(SEPARATOR) {
            Some((g, v)) => (g, v),
            None => ("", gv),
        };
        if version.is_empty() || version.contains(SEPARATOR) {
            return Err(ParseGroupVersionError(gv.into()));
        }
        Ok(Self::gv(group, version))
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.api_version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_plain_groups() {
        assert_eq!(resolve_api_name("apps", Some("v1")), "apps/v1");
        assert_eq!(resolve_api_name("apps", None), "apps");
        assert_eq!(resolve_api_name("apps", Some("")), "apps");
    }

    #[test]
    fn resolves_core_group() {
        assert_eq!(resolve_api_name("", Some("v1")), "v1");
        assert_eq!(resolve_api_name("", Some("")), "");
        assert_eq!(resolve_api_name("", None), "");
    }

    #[test]
    fn explicit_version_overrides_embedded_one() {
        assert_eq!(resolve_api_name("foo/v1", Some("v2")), "foo/v2");
        assert_eq!(resolve_api_name("foo/v1", None), "foo/v1");
        assert_eq!(resolve_api_name("foo/v1", Some("")), "foo/v1");
    }

    #[test]
    fn canonical_names_match_lookups() {
        let gv = GroupVersion::gv("batch", "v1");
        assert_eq!(gv.canonical_name(), resolve_api_name("batch", Some("v1")));
        assert_eq!(gv.canonical_name(), resolve_api_name("batch/v1beta1", Some("v1")));
        assert_eq!(GroupVersion::core("v1").canonical_name(), "v1");
    }

    #[test]
    fn url_paths() {
        assert_eq!(GroupVersion::core("v1").url_path(), "/api/v1");
        assert_eq!(GroupVersion::gv("apps", "v1").url_path(), "/apis/apps/v1");
    }

    #[test]
    fn parse_group_version() {
        let gv: GroupVersion = "apiregistration.k8s.io/v1".parse().unwrap();
        assert_eq!(gv.group, "apiregistration.k8s.io");
        assert_eq!(gv.version, "v1");
        let core: GroupVersion = "v1".parse().unwrap();
        assert!(core.is_core());
        assert_eq!(core.to_string(), "v1");
        assert!("a/b/c".parse::<GroupVersion>().is_err());
        assert!("apps/".parse::<GroupVersion>().is_err());
    }
}
