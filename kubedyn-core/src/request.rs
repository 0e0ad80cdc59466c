//! Request builder for the generic resource verbs
use http::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;

use crate::{
    params::{Patch, Query, RequestOptions},
    Error, Result,
};

const JSON_MIME: &str = "application/json";

/// A resource request builder
///
/// Takes the url path of a collection plus the transport options of the handle using it,
/// and supplies constructors for the generic operations.
/// Every constructor returns an `http::Request` with a path relative to the cluster url.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// The path component of a url
    pub url_path: String,
    /// Options applied to every request built
    pub options: RequestOptions,
}

impl Request {
    /// New request with a collection's url path
    pub fn new<S: Into<String>>(url_path: S) -> Self {
        Self {
            url_path: url_path.into(),
            options: RequestOptions::default(),
        }
    }

    /// Same path with `extra` merged into the options
    #[must_use]
    pub fn with_options(&self, extra: &RequestOptions) -> Self {
        Self {
            url_path: self.url_path.clone(),
            options: self.options.merge(extra),
        }
    }

    fn url(&self, path: &str, query: &Query, fixed: &Query) -> String {
        self.options.query.merged(query).merged(fixed).to_url(path)
    }

    fn named(&self, name: &str) -> String {
        format!("{}/{}", self.url_path, name)
    }

    fn build(
        &self,
        method: http::Method,
        url: String,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<http::Request<Vec<u8>>> {
        let mut req = http::Request::builder()
            .method(method)
            .uri(url)
            .header(ACCEPT, JSON_MIME);
        for (k, v) in &self.options.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let mut req = req.body(body).map_err(Error::BuildRequest)?;
        if let Some(ct) = content_type {
            req.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_str(ct).map_err(|e| Error::BuildRequest(e.into()))?);
        }
        Ok(req)
    }
}

/// Collection operations
impl Request {
    /// List a collection of a resource
    pub fn list(&self, query: &Query) -> Result<http::Request<Vec<u8>>> {
        let url = self.url(&self.url_path, query, &Query::new());
        self.build(http::Method::GET, url, vec![], None)
    }

    /// Create an instance of a resource
    pub fn create(&self, body: &Value, query: &Query) -> Result<http::Request<Vec<u8>>> {
        let url = self.url(&self.url_path, query, &Query::new());
        let data = serde_json::to_vec(body).map_err(Error::SerializeBody)?;
        self.build(http::Method::POST, url, data, Some(JSON_MIME))
    }

    /// Delete a collection of a resource
    pub fn delete_collection(&self, query: &Query) -> Result<http::Request<Vec<u8>>> {
        let url = self.url(&self.url_path, query, &Query::new());
        self.build(http::Method::DELETE, url, vec![], None)
    }

    /// Watch a collection, optionally from a given resource version
    ///
    /// `watch=true` always wins over caller parameters, as does an explicit `resource_version`.
    pub fn watch(&self, resource_version: Option<&str>, query: &Query) -> Result<http::Request<Vec<u8>>> {
        let mut fixed = Query::new().param("watch", "true");
        if let Some(rv) = resource_version {
            fixed.insert("resourceVersion", rv);
        }
        let url = self.url(&self.url_path, query, &fixed);
        self.build(http::Method::GET, url, vec![], None)
    }
}

/// Single instance operations
impl Request {
    /// Get a single instance
    pub fn get(&self, name: &str, query: &Query) -> Result<http::Request<Vec<u8>>> {
        let url = self.url(&self.named(name), query, &Query::new());
        self.build(http::Method::GET, url, vec![], None)
    }

    /// Replace an instance of a resource
    pub fn replace(&self, name: &str, body: &Value, query: &Query) -> Result<http::Request<Vec<u8>>> {
        let url = self.url(&self.named(name), query, &Query::new());
        let data = serde_json::to_vec(body).map_err(Error::SerializeBody)?;
        self.build(http::Method::PUT, url, data, Some(JSON_MIME))
    }

    /// Patch an instance of a resource
    ///
    /// The `Content-Type` header is always the media type of the patch kind.
    pub fn patch(&self, name: &str, patch: &Patch, query: &Query) -> Result<http::Request<Vec<u8>>> {
        let url = self.url(&self.named(name), query, &Query::new());
        let data = patch.serialize().map_err(Error::SerializeBody)?;
        self.build(http::Method::PATCH, url, data, Some(patch.content_type()))
    }

    /// Delete an instance of a resource
    pub fn delete(&self, name: &str, query: &Query) -> Result<http::Request<Vec<u8>>> {
        let url = self.url(&self.named(name), query, &Query::new());
        self.build(http::Method::DELETE, url, vec![], None)
    }
}

/// Build a bare GET for a discovery or version document
pub fn get_document(url_path: &str) -> Result<http::Request<Vec<u8>>> {
    http::Request::get(url_path)
        .header(ACCEPT, JSON_MIME)
        .body(vec![])
        .map_err(Error::BuildRequest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MERGE_PATCH;
    use serde_json::json;

    fn pods() -> Request {
        Request::new("/api/v1/namespaces/ns/pods")
    }

    #[test]
    fn list_path() {
        let req = pods().list(&Query::from([("labelSelector", "app=x")])).unwrap();
        assert_eq!(req.method(), http::Method::GET);
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods?labelSelector=app%3Dx");
        assert_eq!(req.headers().get(ACCEPT).unwrap(), JSON_MIME);
    }

    #[test]
    fn watch_fixes_watch_and_resource_version() {
        let query = Query::from([("watch", "false"), ("resourceVersion", "1"), ("timeoutSeconds", "10")]);
        let req = pods().watch(Some("42"), &query).unwrap();
        assert_eq!(
            req.uri(),
            "/api/v1/namespaces/ns/pods?resourceVersion=42&timeoutSeconds=10&watch=true"
        );
        let req = pods().watch(None, &query).unwrap();
        assert_eq!(
            req.uri(),
            "/api/v1/namespaces/ns/pods?resourceVersion=1&timeoutSeconds=10&watch=true"
        );
    }

    #[test]
    fn create_posts_json_to_collection() {
        let req = pods().create(&json!({"a": 1}), &Query::new()).unwrap();
        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods");
        assert_eq!(req.headers().get(CONTENT_TYPE).unwrap(), JSON_MIME);
        assert_eq!(req.body(), br#"{"a":1}"#);
    }

    #[test]
    fn singleton_paths() {
        assert_eq!(pods().get("p", &Query::new()).unwrap().uri(), "/api/v1/namespaces/ns/pods/p");
        let put = pods().replace("p", &json!({}), &Query::new()).unwrap();
        assert_eq!(put.method(), http::Method::PUT);
        assert_eq!(put.uri(), "/api/v1/namespaces/ns/pods/p");
        let del = pods().delete("p", &Query::from([("dryRun", "All")])).unwrap();
        assert_eq!(del.method(), http::Method::DELETE);
        assert_eq!(del.uri(), "/api/v1/namespaces/ns/pods/p?dryRun=All");
    }

    #[test]
    fn patch_content_type_cannot_be_overridden() {
        let opts = RequestOptions::default().header("content-type", "text/plain");
        let req = pods()
            .with_options(&opts)
            .patch("p", &Patch::Merge(json!({"a": 1})), &Query::new())
            .unwrap();
        assert_eq!(req.method(), http::Method::PATCH);
        let cts: Vec<_> = req.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(cts, vec![MERGE_PATCH]);
    }

    #[test]
    fn options_add_headers_and_query() {
        let opts = RequestOptions::default()
            .header("x-trace", "abc")
            .query_param("pretty", "true");
        let req = pods()
            .with_options(&opts)
            .list(&Query::from([("pretty", "false")]))
            .unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods?pretty=false");
        assert_eq!(req.headers().get("x-trace").unwrap(), "abc");
    }
}
