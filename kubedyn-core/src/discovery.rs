//! Discovery documents served by the apiserver.
//!
//! These mirror the `meta/v1` `APIGroupList` and `APIResourceList` shapes, trimmed to the fields
//! needed to synthesize a client surface.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::gvk::GroupVersion;

/// One resource type served by a group-version
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Plural resource name, e.g. `pods`
    ///
    /// Sub-resources are named `parent/sub`, e.g. `pods/log`.
    pub name: String,
    /// Kind of the resource, e.g. `Pod`
    pub kind: String,
    /// Whether the resource lives inside a namespace
    #[serde(default)]
    pub namespaced: bool,
    /// Verbs supported by the resource
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verbs: Vec<String>,
    /// Short names, e.g. `po`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub short_names: Vec<String>,
}

impl ResourceDescriptor {
    /// Describe a resource without verbs or short names
    pub fn new(name: &str, kind: &str, namespaced: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced,
            verbs: vec![],
            short_names: vec![],
        }
    }

    /// Split a sub-resource name into its parent resource and sub-resource
    ///
    /// Returns `None` for a top level resource.
    pub fn subresource(&self) -> Option<(&str, &str)> {
        self.name.split_once('/')
    }

    /// Key under which the collection of this resource is exposed
    pub fn collection_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Key under which single instances of this resource are exposed
    pub fn singleton_key(&self) -> String {
        self.kind.to_lowercase()
    }
}

/// Resources served at one group-version, from `/api/{version}` or `/apis/{group}/{version}`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    /// The group-version these resources belong to, e.g. `apps/v1`
    #[serde(default)]
    pub group_version: String,
    /// The served resources
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
}

/// A group and version pair as listed under an API group
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionForDiscovery {
    /// `group/version`
    pub group_version: String,
    /// `version`
    pub version: String,
}

/// One API group and its served versions
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiGroup {
    /// Name of the group
    pub name: String,
    /// Versions served by the group
    #[serde(default)]
    pub versions: Vec<GroupVersionForDiscovery>,
    /// Version the server recommends for this group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_version: Option<GroupVersionForDiscovery>,
}

/// The root group catalog served at `/apis`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiGroupList {
    /// All served groups
    #[serde(default)]
    pub groups: Vec<ApiGroup>,
}

impl ApiGroupList {
    /// Flatten the catalog into one [`GroupVersion`] per served (group, version) pair
    ///
    /// Duplicate pairs are dropped, and only the server's preferred version of a group is
    /// marked preferred.
    pub fn group_versions(&self) -> Vec<GroupVersion> {
        let mut seen = HashSet::new();
        let mut out = vec![];
        for g in &self.groups {
            let preferred = g.preferred_version.as_ref().map(|p| p.version.as_str());
            for v in &g.versions {
                if !seen.insert((g.name.as_str(), v.version.as_str())) {
                    continue;
                }
                let is_preferred = preferred == Some(v.version.as_str());
                out.push(GroupVersion::gv(&g.name, &v.version).preferred(is_preferred));
            }
        }
        out
    }
}

/// Build information served at `/version`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerVersion {
    /// Major version
    #[serde(default)]
    pub major: String,
    /// Minor version
    #[serde(default)]
    pub minor: String,
    /// Full version, e.g. `v1.31.0`
    #[serde(default)]
    pub git_version: String,
    /// Platform the server was built for
    #[serde(default)]
    pub platform: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_list() {
        let list: ApiResourceList = serde_json::from_value(serde_json::json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": "apps/v1",
            "resources": [
                {"name": "deployments", "singularName": "", "namespaced": true, "kind": "Deployment", "verbs": ["get", "list"], "shortNames": ["deploy"]},
                {"name": "deployments/scale", "namespaced": true, "kind": "Scale", "verbs": ["get"]},
            ]
        }))
        .unwrap();
        assert_eq!(list.group_version, "apps/v1");
        assert_eq!(list.resources.len(), 2);
        assert_eq!(list.resources[0].short_names, vec!["deploy"]);
        assert_eq!(list.resources[0].subresource(), None);
        assert_eq!(list.resources[1].subresource(), Some(("deployments", "scale")));
    }

    #[test]
    fn keys_are_lowercased() {
        let ar = ResourceDescriptor::new("ClusterRoles", "ClusterRole", false);
        assert_eq!(ar.collection_key(), "clusterroles");
        assert_eq!(ar.singleton_key(), "clusterrole");
    }

    #[test]
    fn flattens_group_list() {
        let list: ApiGroupList = serde_json::from_value(serde_json::json!({
            "kind": "APIGroupList",
            "groups": [
                {
                    "name": "batch",
                    "versions": [
                        {"groupVersion": "batch/v1", "version": "v1"},
                        {"groupVersion": "batch/v1beta1", "version": "v1beta1"},
                        {"groupVersion": "batch/v1", "version": "v1"},
                    ],
                    "preferredVersion": {"groupVersion": "batch/v1", "version": "v1"}
                },
                {
                    "name": "example.com",
                    "versions": [{"groupVersion": "example.com/v2", "version": "v2"}]
                }
            ]
        }))
        .unwrap();
        let gvs = list.group_versions();
        assert_eq!(gvs, vec![
            GroupVersion::gv("batch", "v1").preferred(true),
            GroupVersion::gv("batch", "v1beta1"),
            GroupVersion::gv("example.com", "v2"),
        ]);
    }
}
