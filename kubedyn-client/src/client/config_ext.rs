use http::HeaderValue;
#[cfg(feature = "rustls-tls")]
use hyper_util::client::legacy::connect::HttpConnector;
use secrecy::ExposeSecret;

#[cfg(feature = "rustls-tls")] use super::tls;
use super::middleware::{AddAuthorizationLayer, BaseUriLayer};
use crate::{Config, Error, Result};

/// Extensions to [`Config`](crate::Config) for custom [`Client`](crate::Client).
///
/// See [`Client::new`](crate::Client::new) for an example.
///
/// This trait is sealed and cannot be implemented.
pub trait ConfigExt: private::Sealed {
    /// Layer to set the base URI of requests to the configured server.
    fn base_uri_layer(&self) -> BaseUriLayer;

    /// Optional layer to send the configured bearer token in the `Authorization` header.
    ///
    /// Fails when the token cannot be sent as a header value.
    fn auth_layer(&self) -> Result<Option<AddAuthorizationLayer>>;

    /// Create [`hyper_rustls::HttpsConnector`] based on config.
    ///
    /// # Example
    ///
    /// ```rust
    /// # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
    /// # use kubedyn_client::{client::{Body, ConfigExt}, Config};
    /// # use hyper_util::rt::TokioExecutor;
    /// let config = Config::from_url("https://localhost:6443")?;
    /// let https = config.rustls_https_connector()?;
    /// let hyper_client: hyper_util::client::legacy::Client<_, Body> = hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build(https);
    /// # Ok(())
    /// # }
    /// ```
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls-tls")))]
    #[cfg(feature = "rustls-tls")]
    fn rustls_https_connector(&self) -> Result<hyper_rustls::HttpsConnector<HttpConnector>>;

    /// Create [`hyper_rustls::HttpsConnector`] based on config and `connector`.
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls-tls")))]
    #[cfg(feature = "rustls-tls")]
    fn rustls_https_connector_with_connector<H>(
        &self,
        connector: H,
    ) -> Result<hyper_rustls::HttpsConnector<H>>;

    /// Create [`rustls::ClientConfig`] based on config.
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls-tls")))]
    #[cfg(feature = "rustls-tls")]
    fn rustls_client_config(&self) -> Result<rustls::ClientConfig>;
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Config {}
}

impl ConfigExt for Config {
    fn base_uri_layer(&self) -> BaseUriLayer {
        BaseUriLayer::new(self.cluster_url.clone())
    }

    fn auth_layer(&self) -> Result<Option<AddAuthorizationLayer>> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let token = token.expose_secret();
        // AddAuthorizationLayer panics on values that are not valid headers
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(Error::InvalidBearerToken)?;
        Ok(Some(AddAuthorizationLayer::bearer(token).as_sensitive(true)))
    }

    #[cfg(feature = "rustls-tls")]
    fn rustls_client_config(&self) -> Result<rustls::ClientConfig> {
        tls::rustls_tls::rustls_client_config(self.identity_pem.as_deref(), self.root_cert.as_deref())
            .map_err(Error::RustlsTls)
    }

    #[cfg(feature = "rustls-tls")]
    fn rustls_https_connector(&self) -> Result<hyper_rustls::HttpsConnector<HttpConnector>> {
        let mut connector = HttpConnector::new();
        connector.enforce_http(false);
        self.rustls_https_connector_with_connector(connector)
    }

    #[cfg(feature = "rustls-tls")]
    fn rustls_https_connector_with_connector<H>(
        &self,
        connector: H,
    ) -> Result<hyper_rustls::HttpsConnector<H>> {
        let rustls_config = self.rustls_client_config()?;
        let mut builder = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(rustls_config)
            .https_or_http();
        if let Some(tsn) = self.tls_server_name.as_ref() {
            builder = builder.with_server_name(tsn.clone());
        }
        Ok(builder.enable_http1().wrap_connector(connector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_token_no_auth_layer() {
        let cfg = Config::from_url("http://localhost:8080").unwrap();
        assert!(cfg.auth_layer().unwrap().is_none());
    }

    #[tokio::test]
    async fn requests_carry_token_below_base_url() {
        use futures::pin_mut;
        use http::{header::AUTHORIZATION, Request, Response};
        use tower::{ServiceBuilder, ServiceExt};
        use tower_test::mock;

        let cfg = Config::from_url("https://example.com/cluster")
            .unwrap()
            .with_token("abc");
        let (mock_service, handle) = mock::pair::<Request<Vec<u8>>, Response<Vec<u8>>>();
        let service = ServiceBuilder::new()
            .layer(cfg.base_uri_layer())
            .option_layer(cfg.auth_layer().unwrap())
            .service(mock_service);

        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            for _ in 0..2 {
                let (request, send) = handle.next_request().await.expect("service not called");
                assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer abc");
                assert!(request.headers().get(AUTHORIZATION).unwrap().is_sensitive());
                send.send_response(Response::new(request.uri().to_string().into_bytes()));
            }
        });

        let mut seen = vec![];
        for path in ["/api/v1", "/apis/apps/v1?watch=true"] {
            let req = Request::get(path).body(vec![]).unwrap();
            let res = service.clone().oneshot(req).await.unwrap();
            seen.push(String::from_utf8(res.into_body()).unwrap());
        }
        spawned.await.unwrap();
        assert_eq!(seen, vec![
            "https://example.com/cluster/api/v1",
            "https://example.com/cluster/apis/apps/v1?watch=true",
        ]);
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let cfg = Config::from_url("http://localhost:8080")
            .unwrap()
            .with_token("abc\ndef");
        assert!(matches!(cfg.auth_layer(), Err(Error::InvalidBearerToken(_))));
    }
}
