//! Error handling in [`kubedyn_client`][crate]
use thiserror::Error;

pub use crate::client::DecodeError;
pub use kubedyn_core::Status;

/// Possible errors when working with [`kubedyn_client`][crate]
#[derive(Error, Debug)]
pub enum Error {
    /// A `Status` failure returned by the server, or synthesized from a plain text rejection
    ///
    /// Only produced for cooked requests.
    #[error("ApiError: {0} ({0:?})")]
    Api(#[source] Status),

    /// Hyper error
    #[error("HyperError: {0}")]
    HyperError(#[source] hyper::Error),

    /// Service error
    #[error("ServiceError: {0}")]
    Service(#[source] tower::BoxError),

    /// UTF-8 Error
    #[error("UTF-8 Error: {0}")]
    FromUtf8(#[source] std::string::FromUtf8Error),

    /// Failed to construct a URI.
    #[error("InvalidUri: {0}")]
    InvalidUri(#[source] http::uri::InvalidUri),

    /// The cluster url is not an absolute url with a scheme and a host.
    #[error("invalid cluster url {0:?}: expected scheme and host")]
    InvalidClusterUrl(String),

    /// Common error case when requesting parsing into own structs
    #[error("Error deserializing response: {0}")]
    SerdeError(#[source] serde_json::Error),

    /// Failed to build request
    #[error("Failed to build request: {0}")]
    BuildRequest(#[source] kubedyn_core::Error),

    /// A watch stream could not be decoded
    ///
    /// This terminates the stream it came from.
    #[error("Error decoding watch stream: {0}")]
    Decode(#[source] DecodeError),

    /// Discovery errors
    #[error("Error from discovery: {0}")]
    Discovery(#[source] DiscoveryError),

    /// A group lookup named a group-version that was not discovered
    #[error("api {0:?} is not available")]
    NotAvailable(String),

    /// The configured bearer token is not a valid header value
    #[error("invalid bearer token: {0}")]
    InvalidBearerToken(#[source] http::header::InvalidHeaderValue),

    /// Root certificates could not be parsed as PEM
    #[error("invalid PEM certificate: {0}")]
    InvalidCertificate(#[source] pem::PemError),

    /// Cluster url uses https, but no tls stack is enabled
    #[error("TLS required but no TLS stack selected")]
    TlsRequired,

    /// Errors from Rustls
    #[cfg(feature = "rustls-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls-tls")))]
    #[error("rustls tls error: {0}")]
    RustlsTls(#[source] crate::client::RustlsTlsError),
}

#[derive(Error, Debug)]
// Redundant with the error messages and machine names
#[allow(missing_docs)]
/// Possible errors when using API discovery
pub enum DiscoveryError {
    #[error("failed to list api groups: {0}")]
    ApiGroups(#[source] Box<Error>),
    #[error("failed to list resources of {group_version}: {source}")]
    GroupVersion {
        group_version: String,
        #[source]
        source: Box<Error>,
    },
}

impl From<kubedyn_core::Error> for Error {
    fn from(e: kubedyn_core::Error) -> Self {
        Error::BuildRequest(e)
    }
}
