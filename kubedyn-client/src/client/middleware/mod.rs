//! Middleware types returned from `ConfigExt` methods.
pub use tower_http::auth::{AddAuthorization, AddAuthorizationLayer};

mod base_uri;

pub use base_uri::{BaseUri, BaseUriLayer};
