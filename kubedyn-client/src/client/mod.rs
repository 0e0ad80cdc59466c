//! A basic API client for interacting with a Kubernetes-style API server
//!
//! The [`Client`] sends requests through a tower stack and classifies responses
//! into values or [`Status`] failures.
//!
//! It is used by [`Discovery`](crate::Discovery) to fetch the discovery documents,
//! and by the handles in [`api`](crate::api) to perform resource operations.
use futures::{future::BoxFuture, stream::BoxStream, StreamExt, TryStreamExt};
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use kubedyn_core::{
    discovery::{ApiGroupList, ApiResourceList, ServerVersion},
    request::get_document,
    response::{classify, ResponseBody},
    GroupVersion, WatchEvent,
};
pub use kubedyn_core::response::Status;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::{buffer::Buffer, util::BoxService, BoxError, Layer, Service, ServiceExt};
use tower_http::map_response_body::MapResponseBodyLayer;

use crate::{config::DEFAULT_CORE_VERSION, Config, Error, Result};

mod body;
mod builder;
mod config_ext;
mod decoder;
pub mod middleware;
#[cfg(feature = "rustls-tls")] mod tls;

pub use body::Body;
pub use builder::{ClientBuilder, DynBody};
pub use config_ext::ConfigExt;
pub use decoder::{decode_events, DecodeError, WatchEventCodec};
#[cfg(feature = "rustls-tls")] pub use tls::rustls_tls::Error as RustlsTlsError;

/// Client for connecting with an API server.
///
/// The easiest way to instantiate the client is with an existing [`Config`]
/// using [`Client::try_from`].
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    // - `Buffer` for cheap clone
    // - `BoxFuture` for dynamic response future type
    inner: Buffer<Request<Body>, BoxFuture<'static, Result<Response<Body>, BoxError>>>,
    core_version: String,
    cooked: bool,
}

impl Client {
    /// Create a [`Client`] using a custom `Service` stack.
    ///
    /// [`ConfigExt`](crate::client::ConfigExt) provides extensions for
    /// building a custom stack.
    ///
    /// To create with the default stack with a [`Config`], use
    /// [`Client::try_from`].
    ///
    /// # Example
    ///
    /// ```rust
    /// # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
    /// use kubedyn_client::{client::{Body, ConfigExt}, Client, Config};
    /// use hyper_util::rt::TokioExecutor;
    /// use tower::ServiceBuilder;
    ///
    /// let config = Config::from_url("http://localhost:8080")?;
    /// let service = ServiceBuilder::new()
    ///     .layer(config.base_uri_layer())
    ///     .option_layer(config.auth_layer()?)
    ///     .map_err(tower::BoxError::from)
    ///     .service(hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build_http::<Body>());
    /// let client = Client::new(service);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new<S, B>(service: S) -> Self
    where
        S: Service<Request<Body>, Response = Response<B>> + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: http_body::Body<Data = bytes::Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        // Transform response body to `crate::client::Body` and use type erased error to avoid type parameters.
        let service = MapResponseBodyLayer::new(Body::wrap_body)
            .layer(service)
            .map_err(|e| e.into());
        Self {
            inner: Buffer::new(BoxService::new(service), 1024),
            core_version: DEFAULT_CORE_VERSION.to_string(),
            cooked: true,
        }
    }

    /// Use another version for the core group during discovery
    #[must_use]
    pub fn with_core_version(mut self, version: impl Into<String>) -> Self {
        self.core_version = version.into();
        self
    }

    /// Set whether responses are classified into [`Status`] failures by default
    #[must_use]
    pub fn with_cooked(mut self, cooked: bool) -> Self {
        self.cooked = cooked;
        self
    }

    /// Version of the core group used during discovery
    pub fn core_version(&self) -> &str {
        &self.core_version
    }

    /// Whether responses are classified into [`Status`] failures by default
    pub fn is_cooked(&self) -> bool {
        self.cooked
    }

    /// Perform a raw HTTP request against the API and return the raw response back.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        let mut svc = self.inner.clone();
        let res = svc
            .ready()
            .await
            .map_err(Error::Service)?
            .call(request)
            .await
            .map_err(|err| {
                // Error decorating request
                err.downcast::<Error>()
                    .map(|e| *e)
                    // Error requesting
                    .or_else(|err| err.downcast::<hyper::Error>().map(|err| Error::HyperError(*err)))
                    // Error from another middleware
                    .unwrap_or_else(Error::Service)
            })?;
        Ok(res)
    }

    /// Perform a raw HTTP request and read the whole body
    ///
    /// The body is interpreted as json when it parses, and kept as text otherwise.
    pub async fn request_body(&self, request: Request<Vec<u8>>) -> Result<(StatusCode, ResponseBody)> {
        let res = self.send(request.map(Body::from)).await?;
        let status = res.status();
        let body_bytes = res.into_body().collect().await?.to_bytes();
        let text = String::from_utf8(body_bytes.to_vec()).map_err(Error::FromUtf8)?;
        Ok((status, ResponseBody::from_text(text)))
    }

    /// Perform a raw HTTP request and classify the response
    ///
    /// With `cooked`, a failure [`Status`] (parsed or synthesized from a plain text rejection)
    /// becomes [`Error::Api`]. Without it, the body is returned as is.
    pub async fn request_value(&self, request: Request<Vec<u8>>, cooked: bool) -> Result<Value> {
        let (status, body) = self.request_body(request).await?;
        classify(status, body, cooked).map_err(|s| {
            tracing::debug!("Unsuccessful: {:?}", s);
            Error::Api(s)
        })
    }

    /// Perform a raw HTTP request against the API and deserialize the response
    /// as JSON to some known type.
    ///
    /// Any non-success response is an [`Error::Api`].
    pub async fn request<T>(&self, request: Request<Vec<u8>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let (status, body) = self.request_body(request).await?;
        if !status.is_success() {
            return Err(Error::Api(failure_status(status, body)));
        }
        serde_json::from_value(body.into_value()).map_err(|e| {
            tracing::warn!("failed to deserialize response: {:?}", e);
            Error::SerdeError(e)
        })
    }

    /// Perform a raw request and get back a stream of [`WatchEvent`] objects
    ///
    /// A rejected watch request fails here rather than producing a stream.
    /// The stream ends after the first decoding error.
    pub async fn request_events(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<BoxStream<'static, Result<WatchEvent>>> {
        let res = self.send(request.map(Body::from)).await?;
        let status = res.status();
        tracing::trace!("headers: {:?}", res.headers());
        if !status.is_success() {
            let body_bytes = res.into_body().collect().await?.to_bytes();
            let text = String::from_utf8(body_bytes.to_vec()).map_err(Error::FromUtf8)?;
            return Err(Error::Api(failure_status(status, ResponseBody::from_text(text))));
        }

        let chunks = res.into_body().into_data_stream();
        Ok(decode_events(chunks).map_err(Error::Decode).boxed())
    }
}

/// Low level discovery methods.
///
/// Consider using [`Discovery`](crate::Discovery) for a synthesized client surface.
impl Client {
    /// Returns apiserver version.
    pub async fn apiserver_version(&self) -> Result<ServerVersion> {
        self.request(get_document("/version")?).await
    }

    /// Lists api groups that apiserver serves.
    pub async fn list_api_groups(&self) -> Result<ApiGroupList> {
        self.request(get_document("/apis")?).await
    }

    /// Lists resources served in a given group-version.
    ///
    /// The core group is served under `/api`, every other group under `/apis`.
    pub async fn list_resources(&self, gv: &GroupVersion) -> Result<ApiResourceList> {
        self.request(get_document(&gv.url_path())?).await
    }

    /// Lists resources served in a given `group/version` of a named group.
    pub async fn list_api_group_resources(&self, apiversion: &str) -> Result<ApiResourceList> {
        self.request(get_document(&format!("/apis/{apiversion}"))?).await
    }

    /// Lists resources served in particular `core` group version.
    pub async fn list_core_api_resources(&self, version: &str) -> Result<ApiResourceList> {
        self.request(get_document(&format!("/api/{version}"))?).await
    }
}

// A failure status for a non-success response, even when the body is no `Status`.
fn failure_status(code: StatusCode, body: ResponseBody) -> Status {
    match classify(code, body, true) {
        Err(status) => status,
        Ok(value) => {
            tracing::warn!("Unsuccessful data error parse: {}", value);
            Status::failure(
                code.as_u16(),
                code.canonical_reason().unwrap_or_default(),
                &value.to_string(),
            )
        }
    }
}

impl TryFrom<Config> for Client {
    type Error = Error;

    /// Builds a default [`Client`] from a [`Config`], see [`ClientBuilder`] if more customization is required
    fn try_from(config: Config) -> Result<Self> {
        Ok(ClientBuilder::try_from(config)?.build())
    }
}
