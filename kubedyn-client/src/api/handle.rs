use std::fmt;

use futures::stream::BoxStream;
use kubedyn_core::{Patch, Query, Request, RequestOptions, ResourceDescriptor, WatchEvent};
use serde_json::{json, Value};

use crate::{Client, Result};

/// Operations over the collection of one resource type
///
/// Obtained from [`ApiSurface::collection`](super::ApiSurface::collection), or from the
/// [`Endpoints`](super::Endpoints) of a namespace.
#[derive(Clone)]
pub struct Collection {
    client: Client,
    request: Request,
    descriptor: ResourceDescriptor,
}

impl Collection {
    pub(crate) fn new(client: Client, url_path: String, descriptor: ResourceDescriptor) -> Self {
        Self {
            client,
            request: Request::new(url_path),
            descriptor,
        }
    }

    /// The descriptor this collection was built from
    pub fn resource(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Path of the collection, relative to the cluster url
    pub fn url_path(&self) -> &str {
        &self.request.url_path
    }

    /// An equivalent handle with `extra` merged into the transport options of every later call
    ///
    /// Keys in `extra` win over keys already set; `self` is left untouched.
    #[must_use]
    pub fn options(&self, extra: &RequestOptions) -> Self {
        Self {
            client: self.client.clone(),
            request: self.request.with_options(extra),
            descriptor: self.descriptor.clone(),
        }
    }

    /// List the collection
    pub async fn list(&self, query: &Query) -> Result<Value> {
        let req = self.request.list(query)?;
        self.client.request_value(req, self.cooked()).await
    }

    /// Create an object in the collection
    pub async fn create(&self, body: &Value, query: &Query) -> Result<Value> {
        let req = self.request.create(body, query)?;
        self.client.request_value(req, self.cooked()).await
    }

    /// Delete the objects of the collection selected by `query`
    pub async fn delete_collection(&self, query: &Query) -> Result<Value> {
        let req = self.request.delete_collection(query)?;
        self.client.request_value(req, self.cooked()).await
    }

    /// Watch the collection, optionally from a resource version
    ///
    /// The request itself fails when the server rejects the watch; after that, events are
    /// yielded as they arrive, and the stream ends after the first decoding error.
    pub async fn watch(
        &self,
        resource_version: Option<&str>,
        query: &Query,
    ) -> Result<BoxStream<'static, Result<WatchEvent>>> {
        let req = self.request.watch(resource_version, query)?;
        self.client.request_events(req).await
    }

    fn cooked(&self) -> bool {
        self.request.options.cooked.unwrap_or(self.client.is_cooked())
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("url_path", &self.request.url_path)
            .field("kind", &self.descriptor.kind)
            .field("options", &self.request.options)
            .finish_non_exhaustive()
    }
}

/// Produces [`Singleton`] handles for named instances of one resource type
#[derive(Clone)]
pub struct SingletonFactory {
    collection: Collection,
}

impl SingletonFactory {
    pub(crate) fn new(collection: Collection) -> Self {
        Self { collection }
    }

    /// The descriptor this factory was built from
    pub fn resource(&self) -> &ResourceDescriptor {
        self.collection.resource()
    }

    /// A handle on the instance called `name`
    pub fn named(&self, name: &str) -> Singleton {
        Singleton {
            collection: self.collection.clone(),
            name: name.to_string(),
        }
    }
}

impl fmt::Debug for SingletonFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonFactory")
            .field("url_path", &self.collection.request.url_path)
            .field("kind", &self.collection.descriptor.kind)
            .finish_non_exhaustive()
    }
}

/// Operations over one named instance of a resource type
#[derive(Clone)]
pub struct Singleton {
    collection: Collection,
    name: String,
}

impl Singleton {
    /// Name of the instance
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The descriptor this handle was built from
    pub fn resource(&self) -> &ResourceDescriptor {
        self.collection.resource()
    }

    /// An equivalent handle with `extra` merged into the transport options of every later call
    #[must_use]
    pub fn options(&self, extra: &RequestOptions) -> Self {
        Self {
            collection: self.collection.options(extra),
            name: self.name.clone(),
        }
    }

    /// Get the instance
    pub async fn get(&self, query: &Query) -> Result<Value> {
        let req = self.collection.request.get(&self.name, query)?;
        self.send(req).await
    }

    /// Create the instance
    ///
    /// Posts to the collection path, with `metadata.name` defaulted to the name of this handle.
    pub async fn create(&self, body: &Value, query: &Query) -> Result<Value> {
        let body = with_default_name(body, &self.name);
        let req = self.collection.request.create(&body, query)?;
        self.send(req).await
    }

    /// Replace the instance
    ///
    /// `metadata.name` is defaulted to the name of this handle.
    pub async fn update(&self, body: &Value, query: &Query) -> Result<Value> {
        let body = with_default_name(body, &self.name);
        let req = self.collection.request.replace(&self.name, &body, query)?;
        self.send(req).await
    }

    /// Patch the instance
    ///
    /// A plain json value is sent as a strategic merge patch.
    pub async fn patch(&self, patch: impl Into<Patch>, query: &Query) -> Result<Value> {
        let req = self.collection.request.patch(&self.name, &patch.into(), query)?;
        self.send(req).await
    }

    /// Patch the instance with a patch kind given by its media type
    ///
    /// Fails for media types other than the strategic merge, merge and json patch types.
    pub async fn patch_as(&self, content_type: &str, body: Value, query: &Query) -> Result<Value> {
        let patch = Patch::from_content_type(content_type, body)?;
        self.patch(patch, query).await
    }

    /// Delete the instance
    pub async fn delete(&self, query: &Query) -> Result<Value> {
        let req = self.collection.request.delete(&self.name, query)?;
        self.send(req).await
    }

    async fn send(&self, req: http::Request<Vec<u8>>) -> Result<Value> {
        self.collection
            .client
            .request_value(req, self.collection.cooked())
            .await
    }
}

impl fmt::Debug for Singleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Singleton")
            .field("url_path", &self.collection.request.url_path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// Deep merge `{metadata: {name}}` under `body`; values present in `body` win.
fn with_default_name(body: &Value, name: &str) -> Value {
    merge_defaults(json!({ "metadata": { "name": name } }), body)
}

fn merge_defaults(defaults: Value, value: &Value) -> Value {
    match (defaults, value) {
        (Value::Object(mut merged), Value::Object(over)) => {
            for (k, v) in over {
                let entry = match merged.remove(k) {
                    Some(default) => merge_defaults(default, v),
                    None => v.clone(),
                };
                merged.insert(k.clone(), entry);
            }
            Value::Object(merged)
        }
        (Value::Object(defaults), Value::Null) => Value::Object(defaults),
        (_, value) => value.clone(),
    }
}
