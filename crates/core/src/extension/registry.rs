use super::discovery;
use super::scanner::ArtifactIndexScanner;
use crate::loader::{ClassLoader, LoadedClass};
use codestore_api::{BoxError, ConstructorKind, Extension, ExtensionInstantiationError};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns a discovered class into a live instance.
pub trait ExtensionLinker: Send + Sync {
    fn construct(
        &self,
        class: &LoadedClass,
        kind: ConstructorKind,
    ) -> Result<Arc<dyn Extension>, ExtensionInstantiationError>;
}

type Constructor = Box<dyn Fn() -> Result<Arc<dyn Extension>, BoxError> + Send + Sync>;

/// Constructor registered for one class, tagged with how the class is built.
pub enum Binding {
    Default(Constructor),
    Factory(Constructor),
}

impl Binding {
    pub fn kind(&self) -> ConstructorKind {
        match self {
            Binding::Default(_) => ConstructorKind::Default,
            Binding::Factory(_) => ConstructorKind::Factory,
        }
    }

    fn call(&self) -> Result<Arc<dyn Extension>, BoxError> {
        match self {
            Binding::Default(ctor) | Binding::Factory(ctor) => ctor(),
        }
    }
}

/// Registration table mapping class names to native constructors.
#[derive(Default)]
pub struct BindingTable {
    bindings: HashMap<String, Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the public no-arg constructor of `class`.
    pub fn bind_default<E, F>(mut self, class: impl Into<String>, ctor: F) -> Self
    where
        E: Extension,
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.bindings.insert(
            class.into(),
            Binding::Default(Box::new(move || Ok(Arc::new(ctor()) as Arc<dyn Extension>))),
        );
        self
    }

    /// Bind the public static `get()` of `class`.
    pub fn bind_factory<E, F>(mut self, class: impl Into<String>, get: F) -> Self
    where
        E: Extension,
        F: Fn() -> Result<E, BoxError> + Send + Sync + 'static,
    {
        self.bindings.insert(
            class.into(),
            Binding::Factory(Box::new(move || {
                get().map(|e| Arc::new(e) as Arc<dyn Extension>)
            })),
        );
        self
    }

    pub fn binding(&self, class: &str) -> Option<&Binding> {
        self.bindings.get(class)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl ExtensionLinker for BindingTable {
    fn construct(
        &self,
        class: &LoadedClass,
        kind: ConstructorKind,
    ) -> Result<Arc<dyn Extension>, ExtensionInstantiationError> {
        let binding =
            self.bindings
                .get(class.name())
                .ok_or_else(|| ExtensionInstantiationError::Unbound {
                    class: class.name().to_string(),
                    kind,
                })?;
        if binding.kind() != kind {
            return Err(ExtensionInstantiationError::ConstructorMismatch {
                class: class.name().to_string(),
                expected: kind,
                bound: binding.kind(),
            });
        }
        binding
            .call()
            .map_err(|source| ExtensionInstantiationError::Construction {
                class: class.name().to_string(),
                source,
            })
    }
}

/// One instantiated extension.
#[derive(Clone)]
pub struct ExtensionInstance {
    class_name: String,
    weight: i32,
    instance: Arc<dyn Extension>,
}

impl ExtensionInstance {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn instance(&self) -> &Arc<dyn Extension> {
        &self.instance
    }

    pub fn downcast_ref<T: Extension>(&self) -> Option<&T> {
        self.instance.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for ExtensionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionInstance")
            .field("class_name", &self.class_name)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Immutable view of the extensions of one interface, ordered by weight.
#[derive(Debug, Clone)]
pub struct ExtensionSet {
    items: Arc<[ExtensionInstance]>,
}

impl ExtensionSet {
    pub fn iter(&self) -> std::slice::Iter<'_, ExtensionInstance> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ExtensionInstance> {
        self.items.get(index)
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.items.iter().map(ExtensionInstance::class_name).collect()
    }

    pub fn weights(&self) -> Vec<i32> {
        self.items.iter().map(ExtensionInstance::weight).collect()
    }
}

impl<'a> IntoIterator for &'a ExtensionSet {
    type Item = &'a ExtensionInstance;
    type IntoIter = std::slice::Iter<'a, ExtensionInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Discovers marked classes once, then instantiates them per interface.
///
/// The scan happens on the first successful [`invoke`](Self::invoke) and is
/// never repeated for the lifetime of the registry; a failed scan is retried
/// on the next call.
pub struct ExtensionRegistry {
    scanner: ArtifactIndexScanner,
    loader: Arc<dyn ClassLoader>,
    linker: Arc<dyn ExtensionLinker>,
    discovered: OnceCell<Arc<[Arc<LoadedClass>]>>,
}

impl ExtensionRegistry {
    pub fn new(
        scanner: ArtifactIndexScanner,
        loader: Arc<dyn ClassLoader>,
        linker: Arc<dyn ExtensionLinker>,
    ) -> Self {
        Self {
            scanner,
            loader,
            linker,
            discovered: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.discovered.get().is_some()
    }

    /// Names of every marked class found by the scan, once it has run.
    pub fn discovered(&self) -> Option<Vec<String>> {
        self.discovered
            .get()
            .map(|classes| classes.iter().map(|c| c.name().to_string()).collect())
    }

    /// Instances of every marked class assignable to `interface`, lightest first.
    pub fn invoke(&self, interface: &str) -> Result<ExtensionSet, ExtensionInstantiationError> {
        let discovered = self.discovered.get_or_try_init(|| {
            let classes = discovery::discover(&self.scanner, self.loader.as_ref())?;
            info!(
                "Discovered {} classes marked {}",
                classes.len(),
                self.scanner.annotation()
            );
            Ok::<_, ExtensionInstantiationError>(Arc::from(classes))
        })?;

        let mut instances = Vec::new();
        for class in discovered.iter() {
            if !discovery::is_assignable(class, interface, self.loader.as_ref())? {
                continue;
            }
            let kind = discovery::constructor_kind(class)?;
            let instance = self.linker.construct(class, kind)?;
            debug!("instantiated {} via {}", class.name(), kind);
            instances.push(ExtensionInstance {
                class_name: class.name().to_string(),
                weight: instance.weight(),
                instance,
            });
        }
        instances.sort_by_key(ExtensionInstance::weight);

        Ok(ExtensionSet {
            items: Arc::from(instances),
        })
    }
}
