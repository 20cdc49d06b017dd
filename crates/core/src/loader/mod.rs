//! On-demand class loading backed by the artifact repository.
//!
//! The loader is an explicit service: whoever needs dynamic loading gets an
//! `Arc<ArtifactClassLoader>` handed to it, and [`LoaderCell`] guarantees a
//! context builds at most one. Its parent and `offline` flag are fixed at
//! construction.
//!
//! Only construction is synchronised. Two threads asking for the same
//! undefined class may both fetch and parse it; the first definition wins and
//! both callers get that one.

pub mod class;
pub mod resource;

pub use class::{LoadedClass, MethodShape};
pub use resource::ResourceCache;

use crate::config::LoaderConfig;
use crate::error::Result;
use codestore_api::models::naming;
use codestore_api::{ArtifactRepository, ClassResolutionError};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

/// Something classes can be requested from by binary name.
pub trait ClassLoader: Send + Sync {
    fn name(&self) -> &str;

    fn load_class(&self, name: &str) -> std::result::Result<Arc<LoadedClass>, ClassResolutionError>;
}

pub struct ArtifactClassLoader {
    artifacts: Arc<dyn ArtifactRepository>,
    parent: Option<Arc<dyn ClassLoader>>,
    offline: bool,
    defined: DashMap<String, Arc<LoadedClass>>,
    resources: ResourceCache,
}

impl ArtifactClassLoader {
    pub fn new(
        artifacts: Arc<dyn ArtifactRepository>,
        parent: Option<Arc<dyn ClassLoader>>,
        offline: bool,
        resources: ResourceCache,
    ) -> Self {
        Self {
            artifacts,
            parent,
            offline,
            defined: DashMap::new(),
            resources,
        }
    }

    pub fn from_config(
        artifacts: Arc<dyn ArtifactRepository>,
        parent: Option<Arc<dyn ClassLoader>>,
        config: &LoaderConfig,
    ) -> Self {
        let resources =
            ResourceCache::new(config.resource_cache_dir(), config.resource_freshness());
        Self::new(artifacts, parent, config.offline, resources)
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.contains_key(name)
    }

    pub fn defined_count(&self) -> usize {
        self.defined.len()
    }

    /// Fetch, define and return `name` from the artifact repository.
    pub fn find(&self, name: &str) -> std::result::Result<Arc<LoadedClass>, ClassResolutionError> {
        if self.offline {
            return Err(ClassResolutionError::Offline(name.to_string()));
        }
        let bytes = self
            .artifacts
            .fetch_content(name)
            .map_err(|source| ClassResolutionError::Repository {
                name: name.to_string(),
                source,
            })?
            .ok_or_else(|| ClassResolutionError::NotFound(name.to_string()))?;

        let class = LoadedClass::parse(name, &bytes)?;
        if class.name() != name {
            return Err(ClassResolutionError::NameMismatch {
                requested: name.to_string(),
                found: class.name().to_string(),
            });
        }
        debug!("defined {} ({} bytes)", name, bytes.len());
        Ok(self.define(class))
    }

    fn define(&self, class: LoadedClass) -> Arc<LoadedClass> {
        self.defined
            .entry(class.name().to_string())
            .or_insert_with(|| Arc::new(class))
            .value()
            .clone()
    }

    /// `file://` URL of the class bytes, for callers that cannot take bytes.
    ///
    /// Accepts `a/Foo.class` as well as `a.Foo`. `None` when offline or when
    /// the class is not stored.
    pub fn find_resource(&self, resource: &str) -> Result<Option<Url>> {
        if self.offline {
            return Ok(None);
        }
        let class_name = naming::resource_to_class_name(resource);
        self.resources
            .materialize(&class_name, || self.artifacts.fetch_content(&class_name))
    }
}

impl ClassLoader for ArtifactClassLoader {
    fn name(&self) -> &str {
        "artifact"
    }

    fn load_class(&self, name: &str) -> std::result::Result<Arc<LoadedClass>, ClassResolutionError> {
        if let Some(class) = self.defined.get(name) {
            return Ok(class.value().clone());
        }
        if let Some(parent) = &self.parent {
            match parent.load_class(name) {
                Ok(class) => return Ok(class),
                Err(e) if e.is_not_found() => {
                    trace!("{} not found by parent {}", name, parent.name());
                }
                Err(e) => return Err(e),
            }
        }
        self.find(name)
    }
}

/// Construct-once holder for a context's loader.
pub struct LoaderCell {
    cell: OnceCell<Arc<ArtifactClassLoader>>,
}

impl LoaderCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// The loader, building it with `init` on first use only.
    pub fn get_or_init(&self, init: impl FnOnce() -> ArtifactClassLoader) -> Arc<ArtifactClassLoader> {
        self.cell.get_or_init(|| Arc::new(init())).clone()
    }

    pub fn get(&self) -> Option<Arc<ArtifactClassLoader>> {
        self.cell.get().cloned()
    }
}

impl Default for LoaderCell {
    fn default() -> Self {
        Self::new()
    }
}
