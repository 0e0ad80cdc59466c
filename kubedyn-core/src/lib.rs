//! Types and client-less behavior shared by the `kubedyn` client
//!
//! This crate holds everything that can be expressed without a network connection:
//! the discovery documents served by the apiserver, the canonical naming of group-versions,
//! request construction for the generic resource verbs, classification of responses into
//! success or [`Status`](response::Status) failures, and the watch event shape.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod discovery;
pub use discovery::{ApiResourceList, ResourceDescriptor, ServerVersion};

pub mod gvk;
pub use gvk::{resolve_api_name, GroupVersion};

pub mod params;
pub use params::{Patch, Query, RequestOptions};

pub mod request;
pub use request::Request;

pub mod response;
pub use response::{ResponseBody, Status};

pub mod watch;
pub use watch::WatchEvent;

mod error;
pub use error::Error;

/// Convient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
