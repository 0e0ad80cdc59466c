//! Kubernetes client built from runtime api discovery
//!
//! Rather than shipping a typed binding for every resource kind, this crate asks the apiserver
//! what it serves when connecting, and synthesizes a navigable surface of operations from
//! the answer.
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::TryStreamExt;
//! use kubedyn_client::{core::Query, Client, Config, Discovery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_url("https://127.0.0.1:6443")?.with_token("secret-token");
//!     let client = Client::try_from(config)?;
//!
//!     // Query the catalog and build a surface for every served group-version
//!     let registry = Discovery::new(client).run().await?;
//!
//!     // Core resources are reachable directly
//!     let namespaces = registry.collection("namespaces").expect("core group serves namespaces");
//!     let list = namespaces.list(&Query::new()).await?;
//!     println!("{}", list["items"]);
//!
//!     // Namespaced resources go through `ns`
//!     let pods = registry.ns("default");
//!     let pod = pods.singleton("pod").expect("pods are namespaced").named("my-pod");
//!     println!("{}", pod.get(&Query::new()).await?);
//!
//!     // Other groups are looked up by name, with an optional version
//!     let apps = registry.group("apps", None)?;
//!     let deployments = apps.ns("default").collection("deployments").expect("apps serves deployments");
//!     let mut events = deployments.watch(None, &Query::new()).await?;
//!     while let Some(event) = events.try_next().await? {
//!         println!("{} {:?}", event.event_type(), event.object());
//!     }
//!     Ok(())
//! }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;

#[doc(inline)]
pub use api::ApiSurface;
#[doc(inline)]
pub use client::Client;
#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use discovery::{Discovery, Registry};
#[doc(inline)]
pub use error::Error;

/// Re-exports from kubedyn_core
pub use kubedyn_core as core;

/// Convient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
