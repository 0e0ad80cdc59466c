//! Query parameters, transport options and patch bodies for resource operations
use std::collections::BTreeMap;

use serde_json::Value;

use crate::{Error, Result};

/// Extra query parameters for a resource operation
///
/// Keys are unique; inserting an existing key replaces its value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query(BTreeMap<String, String>);

impl Query {
    /// An empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace a parameter in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether no parameters are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the parameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Shallow merge where `other` wins on key collision
    #[must_use]
    pub fn merged(&self, other: &Query) -> Query {
        let mut out = self.clone();
        out.0.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    /// Render as a url path with the encoded query appended
    pub fn to_url(&self, path: &str) -> String {
        if self.is_empty() {
            return path.to_string();
        }
        let mut qp = form_urlencoded::Serializer::new(format!("{path}?"));
        qp.extend_pairs(self.iter());
        qp.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Query {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Transport options carried by a resource handle
///
/// Handles never mutate their options; [`RequestOptions::merge`] builds a new set.
///
/// Precedence for a single call, lowest first:
/// 1. options of the handle (including options merged in with `options(extra)`)
/// 2. the query passed to the call
/// 3. parameters the operation itself fixes, e.g. `watch=true`
///
/// The http method is never caller overridable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Extra http headers
    pub headers: BTreeMap<String, String>,
    /// Extra query parameters
    pub query: Query,
    /// Override whether responses are classified into `Status` failures
    ///
    /// `None` defers to the client configuration.
    pub cooked: Option<bool>,
}

impl RequestOptions {
    /// Add or replace a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add or replace a query parameter
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key, value);
        self
    }

    /// Set the cooked override
    #[must_use]
    pub fn cooked(mut self, cooked: bool) -> Self {
        self.cooked = Some(cooked);
        self
    }

    /// Additive merge where `extra` wins per key
    ///
    /// Merging the empty set is an identity.
    #[must_use]
    pub fn merge(&self, extra: &RequestOptions) -> RequestOptions {
        let mut headers = self.headers.clone();
        headers.extend(extra.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        RequestOptions {
            headers,
            query: self.query.merged(&extra.query),
            cooked: extra.cooked.or(self.cooked),
        }
    }
}

/// Media type of strategic merge patches
pub const STRATEGIC_MERGE_PATCH: &str = "application/strategic-merge-patch+json";
/// Media type of RFC7386 merge patches
pub const MERGE_PATCH: &str = "application/merge-patch+json";
/// Media type of RFC6902 json patches
pub const JSON_PATCH: &str = "application/json-patch+json";

/// A patch body together with its patch kind
#[derive(Clone, Debug, PartialEq)]
pub enum Patch {
    /// [Strategic merge patch](https://kubernetes.io/docs/tasks/manage-kubernetes-objects/update-api-object-kubectl-patch/#use-a-strategic-merge-patch-to-update-a-deployment)
    ///
    /// The default kind for a bare json body.
    Strategic(Value),
    /// [JSON merge patch](https://tools.ietf.org/html/rfc7386)
    Merge(Value),
    /// [JSON patch](https://tools.ietf.org/html/rfc6902), an ordered list of operations
    Json(json_patch::Patch),
}

impl Patch {
    /// Build a patch from a media type and a body
    ///
    /// Fails on unknown media types, and on json patches whose body is not a list of operations.
    pub fn from_content_type(content_type: &str, body: Value) -> Result<Self> {
        match content_type {
            STRATEGIC_MERGE_PATCH => Ok(Self::Strategic(body)),
            MERGE_PATCH => Ok(Self::Merge(body)),
            JSON_PATCH => serde_json::from_value(body)
                .map(Self::Json)
                .map_err(Error::SerializeBody),
            other => Err(Error::UnsupportedPatchType(other.to_string())),
        }
    }

    /// The `Content-Type` header for this patch
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Strategic(_) => STRATEGIC_MERGE_PATCH,
            Self::Merge(_) => MERGE_PATCH,
            Self::Json(_) => JSON_PATCH,
        }
    }

    pub(crate) fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Strategic(p) | Self::Merge(p) => serde_json::to_vec(p),
            Self::Json(p) => serde_json::to_vec(p),
        }
    }
}

impl From<Value> for Patch {
    fn from(body: Value) -> Self {
        Self::Strategic(body)
    }
}

impl From<json_patch::Patch> for Patch {
    fn from(ops: json_patch::Patch) -> Self {
        Self::Json(ops)
    }
}
