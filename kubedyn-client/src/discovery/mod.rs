//! Runtime API discovery, and the registry of surfaces it builds.
use std::{collections::HashMap, fmt, sync::Arc};

use futures::future::try_join_all;
use kubedyn_core::{resolve_api_name, GroupVersion, ResourceDescriptor};

use crate::{
    api::{ApiSurface, Collection, Endpoint, Endpoints, SingletonFactory},
    error::DiscoveryError,
    Client, Error, Result,
};

/// How the Discovery client decides what api groups to build
enum DiscoveryMode {
    /// Only allow explicitly listed apigroups
    Allow(Vec<String>),
    /// Allow all apigroups except the ones listed
    Block(Vec<String>),
}

impl DiscoveryMode {
    fn is_queryable(&self, gv: &GroupVersion) -> bool {
        if gv.is_core() {
            return true;
        }
        match &self {
            Self::Allow(allowed) => allowed.contains(&gv.group),
            Self::Block(blocked) => !blocked.contains(&gv.group),
        }
    }
}

/// Connects to an API server by discovering what it serves.
///
/// Running discovery goes through three phases:
/// - fetch the root group catalog from `/apis`
/// - fetch the resource catalog of every served group-version, plus the core group under `/api`,
///   and build an [`ApiSurface`] for each, concurrently
/// - once every build has settled, collect the surfaces into a [`Registry`]
///
/// Either every surface is built, or discovery fails as a whole.
pub struct Discovery {
    client: Client,
    core_version: String,
    mode: DiscoveryMode,
}

impl Discovery {
    /// Construct a discovery client
    ///
    /// The core group version defaults to the one configured on the client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        let core_version = client.core_version().to_string();
        let mode = DiscoveryMode::Block(vec![]);
        Self {
            client,
            core_version,
            mode,
        }
    }

    /// Use another version for the core group
    #[must_use]
    pub fn core_version(mut self, version: &str) -> Self {
        self.core_version = version.to_string();
        self
    }

    /// Configure the discovery client to only build the listed apigroups
    ///
    /// The core group is always built.
    #[must_use]
    pub fn filter(mut self, allow: &[&str]) -> Self {
        self.mode = DiscoveryMode::Allow(allow.iter().map(ToString::to_string).collect());
        self
    }

    /// Configure the discovery client to build all apigroups except the listed ones
    ///
    /// The core group is always built.
    #[must_use]
    pub fn exclude(mut self, deny: &[&str]) -> Self {
        self.mode = DiscoveryMode::Block(deny.iter().map(ToString::to_string).collect());
        self
    }

    /// Run discovery and build the [`Registry`]
    ///
    /// This issues `N+2` queries to the api server, where `N` is the number of non-core
    /// group-versions built.
    ///
    /// ```no_run
    /// use kubedyn_client::{Client, Config, Discovery};
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = Client::try_from(Config::from_url("http://localhost:8080")?)?;
    /// let registry = Discovery::new(client).exclude(&["metrics.k8s.io"]).run().await?;
    /// for name in registry.groups() {
    ///     let surface = registry.get(name).expect("listed groups are present");
    ///     println!("{name}: {:?}", surface.cluster().collections().collect::<Vec<_>>());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run(self) -> Result<Registry> {
        tracing::debug!("discovering api groups");
        let api_groups = self.client.list_api_groups().await.map_err(|e| {
            tracing::warn!("failed to list api groups: {}", e);
            Error::Discovery(DiscoveryError::ApiGroups(Box::new(e)))
        })?;

        let core = GroupVersion::core(&self.core_version);
        let gvs = api_groups
            .group_versions()
            .into_iter()
            .filter(|gv| !gv.is_core() && self.mode.is_queryable(gv))
            .collect::<Vec<_>>();

        tracing::debug!("building {} api surfaces", gvs.len() + 1);
        let (core, others) = futures::try_join!(
            build_surface(&self.client, core),
            try_join_all(gvs.into_iter().map(|gv| build_surface(&self.client, gv))),
        )?;

        let registry = Registry::new(core, others);
        tracing::debug!("discovery ready with {} group versions", registry.canonical.len());
        Ok(registry)
    }
}

async fn build_surface(client: &Client, gv: GroupVersion) -> Result<ApiSurface> {
    let list = client.list_resources(&gv).await.map_err(|e| {
        tracing::warn!("failed to list resources of {}: {}", gv, e);
        Error::Discovery(DiscoveryError::GroupVersion {
            group_version: gv.api_version(),
            source: Box::new(e),
        })
    })?;
    Ok(ApiSurface::new(client.clone(), gv, list.resources))
}

/// Every surface built by [`Discovery`], by canonical name
///
/// A surface is found under:
/// - `group/version`, e.g. `apps/v1`
/// - the bare group name when the version is the preferred one of its group, e.g. `apps`
/// - the bare version for the core group, e.g. `v1`, and the empty name, since the core
///   group is always preferred
///
/// The core surface is also reachable directly on the registry, through
/// [`collection`](Registry::collection), [`singleton`](Registry::singleton),
/// [`ns`](Registry::ns) and friends.
pub struct Registry {
    surfaces: HashMap<String, Arc<ApiSurface>>,
    canonical: Vec<String>,
    core: Arc<ApiSurface>,
}

impl Registry {
    fn new(core: ApiSurface, others: Vec<ApiSurface>) -> Self {
        let core = Arc::new(core);
        let mut surfaces = HashMap::new();
        let mut canonical = vec![];
        for surface in std::iter::once(core.clone()).chain(others.into_iter().map(Arc::new)) {
            let gv = surface.group_version().clone();
            if gv.preferred {
                surfaces.insert(resolve_api_name(&gv.group, None), surface.clone());
            }
            canonical.push(gv.canonical_name());
            surfaces.insert(gv.canonical_name(), surface);
        }
        canonical.sort();
        Self {
            surfaces,
            canonical,
            core,
        }
    }

    /// The surface of a group, at an explicit version or its preferred one
    ///
    /// `name` may also be a full `group/version`, whose version is then overridden by `version`.
    /// Fails with [`Error::NotAvailable`] when nothing was discovered under the resolved name.
    pub fn group(&self, name: &str, version: Option<&str>) -> Result<&ApiSurface> {
        let canonical = resolve_api_name(name, version);
        self.get(&canonical).ok_or_else(|| Error::NotAvailable(canonical))
    }

    /// The surface under a canonical name
    pub fn get(&self, canonical: &str) -> Option<&ApiSurface> {
        self.surfaces.get(canonical).map(|s| &**s)
    }

    /// Whether anything was discovered under a canonical name
    pub fn has_group(&self, canonical: &str) -> bool {
        self.surfaces.contains_key(canonical)
    }

    /// Sorted `group/version` names of all built surfaces
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.canonical.iter().map(String::as_str)
    }

    /// The core surface
    pub fn core(&self) -> &ApiSurface {
        &self.core
    }

    /// Collection handle of a cluster scoped core resource
    pub fn collection(&self, name: &str) -> Option<Collection> {
        self.core.collection(name)
    }

    /// Singleton factory of a cluster scoped core resource
    pub fn singleton(&self, kind: &str) -> Option<SingletonFactory> {
        self.core.singleton(kind)
    }

    /// Either handle of a cluster scoped core resource
    pub fn endpoint(&self, name: &str) -> Option<Endpoint> {
        self.core.endpoint(name)
    }

    /// Handles of the namespaced core resources inside `namespace`
    pub fn ns(&self, namespace: &str) -> Endpoints {
        self.core.ns(namespace)
    }

    /// Descriptor of a core resource by kind
    pub fn resource(&self, kind: &str) -> Option<&ResourceDescriptor> {
        self.core.resource(kind)
    }

    /// Descriptors of the core group
    pub fn resources(&self) -> &[ResourceDescriptor] {
        self.core.resources()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.surfaces.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("Registry").field("names", &names).finish()
    }
}
