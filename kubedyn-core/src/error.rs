use thiserror::Error;

/// Possible errors when building a request
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to build the `http::Request`
    #[error("failed to build request: {0}")]
    BuildRequest(#[source] http::Error),

    /// Failed to serialize the request body
    #[error("failed to serialize body: {0}")]
    SerializeBody(#[source] serde_json::Error),

    /// The requested patch media type is not one of the supported kinds
    #[error("unsupported patch type: {0}")]
    UnsupportedPatchType(String),
}
