//! Client surfaces synthesized from discovered resource catalogs
//!
//! An [`ApiSurface`] covers one group-version. Cluster scoped resources are reachable on the
//! surface itself, namespaced resources through [`ApiSurface::ns`].
use std::{collections::BTreeMap, fmt};

use kubedyn_core::{GroupVersion, ResourceDescriptor};

use crate::Client;

mod handle;
pub use handle::{Collection, Singleton, SingletonFactory};

pub use kubedyn_core::{
    params::{Patch, Query, RequestOptions},
    watch::WatchEvent,
};

/// A handle found under a name, see [`Endpoints::endpoint`]
#[derive(Clone, Debug)]
pub enum Endpoint {
    /// Operations over a collection, keyed by lower-cased plural name
    Collection(Collection),
    /// Factory for named instances, keyed by lower-cased kind
    Singleton(SingletonFactory),
}

/// Something noticed while building a surface, that does not prevent building it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A sub-resource was listed; no operations were attached for it
    UnsupportedSubresource {
        /// Parent resource, e.g. `pods`
        resource: String,
        /// Sub-resource, e.g. `log`
        subresource: String,
    },
}

/// Collection handles and singleton factories by name
///
/// Collections are keyed by lower-cased plural name, singletons by lower-cased kind.
/// Lookups are case insensitive.
#[derive(Clone, Default)]
pub struct Endpoints {
    collections: BTreeMap<String, Collection>,
    singletons: BTreeMap<String, SingletonFactory>,
}

impl Endpoints {
    fn insert(&mut self, client: &Client, url_path: String, descriptor: &ResourceDescriptor) {
        let collection = Collection::new(client.clone(), url_path, descriptor.clone());
        self.singletons.insert(
            descriptor.singleton_key(),
            SingletonFactory::new(collection.clone()),
        );
        self.collections.insert(descriptor.collection_key(), collection);
    }

    /// Collection handle by plural name
    pub fn collection(&self, name: &str) -> Option<Collection> {
        self.collections.get(&name.to_lowercase()).cloned()
    }

    /// Singleton factory by kind
    pub fn singleton(&self, kind: &str) -> Option<SingletonFactory> {
        self.singletons.get(&kind.to_lowercase()).cloned()
    }

    /// Either handle by name, preferring a collection when a plural and a kind collide
    pub fn endpoint(&self, name: &str) -> Option<Endpoint> {
        self.collection(name)
            .map(Endpoint::Collection)
            .or_else(|| self.singleton(name).map(Endpoint::Singleton))
    }

    /// Names of the collections
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Names of the singleton factories
    pub fn singletons(&self) -> impl Iterator<Item = &str> {
        self.singletons.keys().map(String::as_str)
    }

    /// Whether there are no handles at all
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.singletons.is_empty()
    }
}

impl fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoints")
            .field("collections", &self.collections.keys().collect::<Vec<_>>())
            .field("singletons", &self.singletons.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The operations served by one group-version
///
/// Built once from the resource catalog of the group-version, and never changed afterwards.
#[derive(Clone)]
pub struct ApiSurface {
    client: Client,
    group_version: GroupVersion,
    cluster: Endpoints,
    namespaced: Vec<ResourceDescriptor>,
    resources: Vec<ResourceDescriptor>,
    diagnostics: Vec<Diagnostic>,
}

impl ApiSurface {
    /// Build the surface of `group_version` from its resource catalog
    ///
    /// - a sub-resource (`parent/sub`) gets no operations, and is recorded as a [`Diagnostic`]
    /// - a namespaced resource is only reachable through [`ApiSurface::ns`]
    /// - every other resource gets a collection handle and a singleton factory on the surface
    pub fn new(client: Client, group_version: GroupVersion, resources: Vec<ResourceDescriptor>) -> Self {
        let base_path = group_version.url_path();
        let mut cluster = Endpoints::default();
        let mut namespaced = vec![];
        let mut diagnostics = vec![];
        for descriptor in &resources {
            if let Some((resource, subresource)) = descriptor.subresource() {
                tracing::debug!(
                    "skipping unsupported subresource {}/{} in {}",
                    resource,
                    subresource,
                    group_version
                );
                diagnostics.push(Diagnostic::UnsupportedSubresource {
                    resource: resource.to_string(),
                    subresource: subresource.to_string(),
                });
            } else if descriptor.namespaced {
                namespaced.push(descriptor.clone());
            } else {
                let url_path = format!("{}/{}", base_path, descriptor.name);
                cluster.insert(&client, url_path, descriptor);
            }
        }
        Self {
            client,
            group_version,
            cluster,
            namespaced,
            resources,
            diagnostics,
        }
    }

    /// Canonical name of the surface, e.g. `apps/v1`, or `v1` for the core group
    pub fn name(&self) -> String {
        self.group_version.canonical_name()
    }

    /// The group-version this surface serves
    pub fn group_version(&self) -> &GroupVersion {
        &self.group_version
    }

    /// Collection handle of a cluster scoped resource, by plural name
    pub fn collection(&self, name: &str) -> Option<Collection> {
        self.cluster.collection(name)
    }

    /// Singleton factory of a cluster scoped resource, by kind
    pub fn singleton(&self, kind: &str) -> Option<SingletonFactory> {
        self.cluster.singleton(kind)
    }

    /// Either handle of a cluster scoped resource, see [`Endpoints::endpoint`]
    pub fn endpoint(&self, name: &str) -> Option<Endpoint> {
        self.cluster.endpoint(name)
    }

    /// Handles of the cluster scoped resources
    pub fn cluster(&self) -> &Endpoints {
        &self.cluster
    }

    /// Handles of the namespaced resources inside `namespace`
    ///
    /// Every call derives a fresh set of handles.
    pub fn ns(&self, namespace: &str) -> Endpoints {
        let base_path = self.group_version.url_path();
        let mut endpoints = Endpoints::default();
        for descriptor in &self.namespaced {
            let url_path = format!("{}/namespaces/{}/{}", base_path, namespace, descriptor.name);
            endpoints.insert(&self.client, url_path, descriptor);
        }
        endpoints
    }

    /// Descriptor of a resource by kind, case insensitive
    ///
    /// Sub-resources sharing the kind are not returned.
    pub fn resource(&self, kind: &str) -> Option<&ResourceDescriptor> {
        self.resources
            .iter()
            .find(|r| r.subresource().is_none() && r.kind.eq_ignore_ascii_case(kind))
    }

    /// All descriptors of the catalog, sub-resources included
    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    /// Diagnostics recorded while building
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Debug for ApiSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSurface")
            .field("group_version", &self.group_version)
            .field("cluster", &self.cluster)
            .field(
                "namespaced",
                &self.namespaced.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            )
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use futures::pin_mut;
    use http::{header::CONTENT_TYPE, Method, Request, Response};
    use kubedyn_core::params::{JSON_PATCH, MERGE_PATCH, STRATEGIC_MERGE_PATCH};
    use serde_json::{json, Value};
    use tower_test::mock;

    use crate::{client::Body, Error};

    fn catalog() -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::new("namespaces", "Namespace", false),
            ResourceDescriptor::new("namespaces/status", "Namespace", false),
            ResourceDescriptor::new("pods", "Pod", true),
            ResourceDescriptor::new("pods/log", "Pod", true),
            ResourceDescriptor::new("endpoints", "Endpoints", true),
        ]
    }

    fn surface(client: Client) -> ApiSurface {
        ApiSurface::new(client, GroupVersion::core("v1"), catalog())
    }

    fn ok(body: Value) -> Response<Body> {
        Response::builder()
            .body(Body::from(body.to_string().into_bytes()))
            .unwrap()
    }

    async fn body_json(request: Request<Body>) -> Value {
        use http_body_util::BodyExt;
        let bytes = request.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn namespaced_resources_only_under_ns() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let api = surface(Client::new(mock_service));

        assert!(api.collection("pods").is_none());
        assert!(api.singleton("pod").is_none());
        let ns = api.ns("x");
        assert_eq!(ns.collection("pods").unwrap().url_path(), "/api/v1/namespaces/x/pods");
        assert_eq!(ns.singleton("Pod").unwrap().resource().name, "pods");

        assert_eq!(api.collection("namespaces").unwrap().url_path(), "/api/v1/namespaces");
        assert!(api.singleton("namespace").is_some());
        assert!(api.ns("x").collection("namespaces").is_none());
        assert_eq!(api.name(), "v1");
    }

    #[tokio::test]
    async fn ns_is_fresh_per_call() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let api = surface(Client::new(mock_service));
        let a = api.ns("a");
        let b = api.ns("b");
        assert_eq!(a.collection("pods").unwrap().url_path(), "/api/v1/namespaces/a/pods");
        assert_eq!(b.collection("pods").unwrap().url_path(), "/api/v1/namespaces/b/pods");
        assert_eq!(api.ns("a").collections().collect::<Vec<_>>(), vec!["endpoints", "pods"]);
    }

    #[tokio::test]
    async fn subresources_are_diagnosed() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let api = surface(Client::new(mock_service));
        assert_eq!(api.diagnostics(), &[
            Diagnostic::UnsupportedSubresource {
                resource: "namespaces".into(),
                subresource: "status".into(),
            },
            Diagnostic::UnsupportedSubresource {
                resource: "pods".into(),
                subresource: "log".into(),
            },
        ]);
        assert!(api.collection("namespaces/status").is_none());
        assert_eq!(api.resources().len(), 5);
        assert_eq!(api.resource("pod").unwrap().name, "pods");
    }

    #[tokio::test]
    async fn plural_and_kind_collision_prefers_collection() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let api = surface(Client::new(mock_service));
        let ns = api.ns("x");
        assert!(matches!(ns.endpoint("endpoints"), Some(Endpoint::Collection(_))));
        assert!(ns.singleton("endpoints").is_some());
        assert!(matches!(ns.endpoint("pod"), Some(Endpoint::Singleton(_))));
        assert!(ns.endpoint("nope").is_none());
    }

    #[tokio::test]
    async fn singleton_create_posts_to_collection_with_name() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), Method::POST);
            assert_eq!(request.uri().path(), "/api/v1/namespaces/x/pods");
            let body = body_json(request).await;
            assert_json_eq!(body, json!({"metadata": {"name": "p"}, "spec": {}}));
            send.send_response(ok(body));
        });

        let api = surface(Client::new(mock_service));
        let pod = api.ns("x").singleton("pod").unwrap().named("p");
        let created = pod.create(&json!({"spec": {}}), &Query::new()).await.unwrap();
        assert_eq!(created["metadata"]["name"], "p");
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn singleton_update_puts_to_instance() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), Method::PUT);
            assert_eq!(request.uri().path(), "/api/v1/namespaces/y");
            let body = body_json(request).await;
            assert_eq!(body["metadata"]["name"], "y");
            send.send_response(ok(body));
        });

        let api = surface(Client::new(mock_service));
        let ns = api.singleton("namespace").unwrap().named("y");
        ns.update(&json!({"metadata": {}}), &Query::new()).await.unwrap();
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn patch_content_types() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            for expected in [STRATEGIC_MERGE_PATCH, MERGE_PATCH, JSON_PATCH] {
                let (request, send) = handle.next_request().await.expect("service not called");
                assert_eq!(request.method(), Method::PATCH);
                assert_eq!(request.uri().path(), "/api/v1/namespaces/x/pods/p");
                assert_eq!(request.uri().query(), Some("dryRun=All"));
                assert_eq!(request.headers()[CONTENT_TYPE], expected);
                send.send_response(ok(json!({})));
            }
        });

        let api = surface(Client::new(mock_service));
        let pod = api.ns("x").singleton("pod").unwrap().named("p");
        let query = Query::new().param("dryRun", "All");
        pod.patch(json!({"spec": {}}), &query).await.unwrap();
        pod.patch(Patch::Merge(json!({"spec": {}})), &query).await.unwrap();
        pod.patch_as(JSON_PATCH, json!([{"op": "remove", "path": "/spec"}]), &query)
            .await
            .unwrap();
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn unsupported_patch_type_fails_without_request() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let api = surface(Client::new(mock_service));
        let pod = api.ns("x").singleton("pod").unwrap().named("p");
        let res = pod.patch_as("text/plain", json!({}), &Query::new()).await;
        assert!(matches!(res, Err(Error::BuildRequest(_))));
    }

    #[tokio::test]
    async fn watch_merges_query() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            let query = request.uri().query().unwrap().to_string();
            assert!(query.contains("watch=true"));
            assert!(query.contains("resourceVersion=10"));
            assert!(query.contains("labelSelector=app"));
            send.send_response(ok(json!({"type": "ADDED", "object": {}})));
        });

        let api = surface(Client::new(mock_service));
        let pods = api.ns("x").collection("pods").unwrap();
        let query = Query::new().param("labelSelector", "app").param("watch", "false");
        let events = pods.watch(Some("10"), &query).await.unwrap();
        let events: Vec<_> = futures::TryStreamExt::try_collect(events).await.unwrap();
        assert_eq!(events, vec![WatchEvent::Added(json!({}))]);
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn options_are_additive() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.headers()["x-a"], "1");
            assert_eq!(request.headers()["x-b"], "2");
            assert_eq!(request.uri().query(), Some("limit=5"));
            send.send_response(ok(json!({"items": []})));

            let (request, send) = handle.next_request().await.expect("service not called");
            assert!(request.headers().get("x-a").is_none());
            send.send_response(ok(json!({"items": []})));
        });

        let api = surface(Client::new(mock_service));
        let pods = api.ns("x").collection("pods").unwrap();
        let tuned = pods
            .options(&RequestOptions::default().header("x-a", "1"))
            .options(&RequestOptions::default().header("x-b", "2").query_param("limit", "5"));
        let same = tuned.options(&RequestOptions::default());
        assert_eq!(format!("{same:?}"), format!("{tuned:?}"));
        tuned.list(&Query::new()).await.unwrap();
        pods.list(&Query::new()).await.unwrap();
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn raw_handles_skip_classification() {
        let failure = json!({"kind": "Status", "status": "Failure", "code": 404, "message": "gone"});
        let reply = failure.clone();
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            for _ in 0..2 {
                let (_, send) = handle.next_request().await.expect("service not called");
                send.send_response(
                    Response::builder()
                        .status(404)
                        .body(Body::from(reply.to_string().into_bytes()))
                        .unwrap(),
                );
            }
        });

        let api = surface(Client::new(mock_service));
        let pod = api.ns("x").singleton("pod").unwrap().named("p");
        assert!(matches!(pod.get(&Query::new()).await, Err(Error::Api(s)) if s.message == "gone"));
        let raw = pod.options(&RequestOptions::default().cooked(false));
        assert_json_eq!(raw.get(&Query::new()).await.unwrap(), failure);
        spawned.await.unwrap();
    }
}
