use codestore_api::{ArtifactRepository, CompilerBackend, SourceRepository, TransactionManager};
use codestore_core::compile::CompileReport;
use codestore_core::extension::{
    AnnotationScanner, ArtifactIndexScanner, ExtensionLinker, ExtensionRegistry, ExtensionSet,
};
use codestore_core::loader::{ArtifactClassLoader, ClassLoader, LoadedClass, LoaderCell};
use codestore_core::store::{
    LocalTransactionManager, MemoryArtifactRepository, MemorySourceRepository,
};
use codestore_core::{
    BindingTable, CodeStoreConfig, CodeStoreError, CompilationOrchestrator, Result,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

/// One managed code store: repositories, the compile pipeline, the class
/// loader and the extension registry sharing a single configuration.
///
/// The loader is built on first use and reused for the lifetime of the
/// store, as is the registry built on top of it.
pub struct CodeStore {
    config: CodeStoreConfig,
    sources: Arc<dyn SourceRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    transactions: Arc<dyn TransactionManager>,
    backend: Option<Arc<dyn CompilerBackend>>,
    linker: Arc<dyn ExtensionLinker>,
    parent: Option<Arc<dyn ClassLoader>>,
    loader: LoaderCell,
    registry: OnceCell<ExtensionRegistry>,
}

impl CodeStore {
    pub fn builder(
        sources: Arc<dyn SourceRepository>,
        artifacts: Arc<dyn ArtifactRepository>,
    ) -> CodeStoreBuilder {
        CodeStoreBuilder {
            config: CodeStoreConfig::default(),
            sources,
            artifacts,
            transactions: None,
            backend: None,
            linker: None,
            parent: None,
        }
    }

    pub fn config(&self) -> &CodeStoreConfig {
        &self.config
    }

    pub fn sources(&self) -> &Arc<dyn SourceRepository> {
        &self.sources
    }

    pub fn artifacts(&self) -> &Arc<dyn ArtifactRepository> {
        &self.artifacts
    }

    /// Run a compile pass with the configured options.
    pub fn compile(&self) -> Result<CompileReport> {
        let backend = self.backend.clone().ok_or_else(|| {
            CodeStoreError::Config("no compiler backend configured".to_string())
        })?;
        let orchestrator =
            CompilationOrchestrator::new(self.sources.clone(), self.artifacts.clone(), backend);
        orchestrator.compile(&self.config.compiler.compile_options())
    }

    pub fn class_loader(&self) -> Arc<ArtifactClassLoader> {
        self.loader.get_or_init(|| {
            info!(
                "Creating artifact class loader (offline: {})",
                self.config.loader.offline
            );
            ArtifactClassLoader::from_config(
                self.artifacts.clone(),
                self.parent.clone(),
                &self.config.loader,
            )
        })
    }

    pub fn load_class(&self, name: &str) -> Result<Arc<LoadedClass>> {
        Ok(self.class_loader().load_class(name)?)
    }

    pub fn extension_registry(&self) -> &ExtensionRegistry {
        self.registry.get_or_init(|| {
            let extensions = &self.config.extensions;
            let scanner = AnnotationScanner::new(extensions.marker.clone())
                .with_packages(extensions.packages.iter().cloned());
            ExtensionRegistry::new(
                ArtifactIndexScanner::new(
                    self.artifacts.clone(),
                    self.transactions.clone(),
                    scanner,
                ),
                self.class_loader(),
                self.linker.clone(),
            )
        })
    }

    /// Extensions implementing `interface`, lightest weight first.
    pub fn invoke(&self, interface: &str) -> Result<ExtensionSet> {
        Ok(self.extension_registry().invoke(interface)?)
    }
}

pub struct CodeStoreBuilder {
    config: CodeStoreConfig,
    sources: Arc<dyn SourceRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    transactions: Option<Arc<dyn TransactionManager>>,
    backend: Option<Arc<dyn CompilerBackend>>,
    linker: Option<Arc<dyn ExtensionLinker>>,
    parent: Option<Arc<dyn ClassLoader>>,
}

impl CodeStoreBuilder {
    pub fn config(mut self, config: CodeStoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transactions(mut self, transactions: Arc<dyn TransactionManager>) -> Self {
        self.transactions = Some(transactions);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompilerBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn linker(mut self, linker: Arc<dyn ExtensionLinker>) -> Self {
        self.linker = Some(linker);
        self
    }

    /// Loader consulted before the artifact repository.
    pub fn parent_loader(mut self, parent: Arc<dyn ClassLoader>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn build(self) -> Result<CodeStore> {
        self.config.validate()?;
        Ok(CodeStore {
            config: self.config,
            sources: self.sources,
            artifacts: self.artifacts,
            transactions: self
                .transactions
                .unwrap_or_else(|| Arc::new(LocalTransactionManager::new()) as Arc<_>),
            backend: self.backend,
            linker: self
                .linker
                .unwrap_or_else(|| Arc::new(BindingTable::new()) as Arc<_>),
            parent: self.parent,
            loader: LoaderCell::new(),
            registry: OnceCell::new(),
        })
    }
}

/// Bootstraps a store over fresh in-memory repositories.
pub fn build_in_memory_store(
    config: CodeStoreConfig,
    backend: Arc<dyn CompilerBackend>,
    bindings: BindingTable,
) -> Result<(CodeStore, Arc<MemorySourceRepository>)> {
    let sources = Arc::new(MemorySourceRepository::new());
    let store = CodeStore::builder(sources.clone(), Arc::new(MemoryArtifactRepository::new()))
        .config(config)
        .backend(backend)
        .linker(Arc::new(bindings))
        .build()?;
    Ok((store, sources))
}

/// Initializes the logging system for a specific component.
/// This delegates to the core logging module.
pub fn init_logging(component: &str) -> Option<impl Drop> {
    Some(codestore_core::logging::init_logging(component, false))
}
