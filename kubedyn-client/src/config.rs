//! Connection configuration for a [`Client`][crate::Client].
//!
//! Loading configuration from kubeconfig files or the cluster environment is left to the
//! caller; a [`Config`] is assembled from its parts with [`Config::new`] and the `with_` setters.
use std::time::Duration;

use http::uri::PathAndQuery;
use secrecy::SecretString;

use crate::{Error, Result};

/// Configuration object detailing the cluster url, credentials, root certificates, and timeouts.
#[derive(Debug, Clone)]
pub struct Config {
    /// The configured cluster url, whose path always ends with `/`
    pub cluster_url: http::Uri,
    /// The configured root certificates, DER encoded
    pub root_cert: Option<Vec<Vec<u8>>>,
    /// Timeout for establishing a connection
    ///
    /// A value of `None` means no timeout
    pub connect_timeout: Option<Duration>,
    /// Timeout for reading from an established connection
    ///
    /// A value of `None` means no timeout. Watches can idle for a long time, so this is unset by default.
    pub read_timeout: Option<Duration>,
    /// Timeout for writing to an established connection
    pub write_timeout: Option<Duration>,
    /// Server name to verify the server certificate against, when it differs from the url host
    pub tls_server_name: Option<String>,
    /// Version of the implicit core group
    pub core_version: String,
    /// Whether responses are classified into `Status` failures by default
    ///
    /// Handles can override this with `RequestOptions::cooked`.
    pub cooked: bool,
    /// Client certificate and private key in PEM.
    pub(crate) identity_pem: Option<Vec<u8>>,
    /// Bearer token sent with every request
    pub(crate) token: Option<SecretString>,
}

/// Default version of the core group
pub const DEFAULT_CORE_VERSION: &str = "v1";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

impl Config {
    /// Construct a new config where only the `cluster_url` is set by the user,
    /// and everything else receives a default value.
    ///
    /// The path of the url is normalized to end with `/`. Fails when the url lacks a scheme or a host.
    pub fn new(cluster_url: http::Uri) -> Result<Self> {
        Ok(Self {
            cluster_url: normalize_base_url(cluster_url)?,
            root_cert: None,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            read_timeout: None,
            write_timeout: None,
            tls_server_name: None,
            core_version: DEFAULT_CORE_VERSION.to_string(),
            cooked: true,
            identity_pem: None,
            token: None,
        })
    }

    /// Parse the cluster url and construct a default config from it
    pub fn from_url(cluster_url: &str) -> Result<Self> {
        let url = cluster_url.parse::<http::Uri>().map_err(Error::InvalidUri)?;
        Self::new(url)
    }

    /// Send `Authorization: Bearer <token>` with every request
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Trust the `CERTIFICATE` entries of a PEM bundle as root certificates
    pub fn with_root_certs_pem(mut self, bundle: &[u8]) -> Result<Self> {
        let ders = pem::parse_many(bundle)
            .map_err(Error::InvalidCertificate)?
            .into_iter()
            .filter(|p| p.tag() == "CERTIFICATE")
            .map(pem::Pem::into_contents)
            .collect::<Vec<_>>();
        self.root_cert.get_or_insert_with(Vec::new).extend(ders);
        Ok(self)
    }

    /// Authenticate with a client certificate and private key, concatenated in PEM
    #[must_use]
    pub fn with_identity_pem(mut self, identity: Vec<u8>) -> Self {
        self.identity_pem = Some(identity);
        self
    }

    /// Use another version for the core group
    #[must_use]
    pub fn with_core_version(mut self, version: impl Into<String>) -> Self {
        self.core_version = version.into();
        self
    }

    /// Whether a bearer token is configured
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

// Guarantee a trailing separator so relative api paths resolve below the base path.
fn normalize_base_url(url: http::Uri) -> Result<http::Uri> {
    if url.scheme().is_none() || url.authority().is_none() {
        return Err(Error::InvalidClusterUrl(url.to_string()));
    }
    if url.path().ends_with('/') {
        return Ok(url);
    }
    let original = url.to_string();
    let mut parts = url.into_parts();
    let normalized = match &parts.path_and_query {
        Some(pandq) => match pandq.query() {
            Some(q) => format!("{}/?{}", pandq.path(), q),
            None => format!("{}/", pandq.path()),
        },
        None => "/".to_string(),
    };
    parts.path_and_query = Some(
        PathAndQuery::try_from(normalized).map_err(|_| Error::InvalidClusterUrl(original.clone()))?,
    );
    http::Uri::from_parts(parts).map_err(|_| Error::InvalidClusterUrl(original))
}
