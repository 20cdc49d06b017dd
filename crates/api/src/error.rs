use crate::extension::ConstructorKind;

/// Boxed error used at collaborator boundaries (backends, extension constructors).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure talking to either the source or the artifact repository.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{store} entry not found: {key}")]
    NotFound { store: &'static str, key: String },
    #[error("{store} storage failure: {message}")]
    Storage {
        store: &'static str,
        message: String,
    },
    #[error("content of {key} is not valid UTF-8")]
    Encoding { key: String },
    #[error("transaction error: {0}")]
    Transaction(String),
}

impl RepositoryError {
    pub fn storage(store: &'static str, message: impl Into<String>) -> Self {
        RepositoryError::Storage {
            store,
            message: message.into(),
        }
    }
}

/// Rejected request against the in-memory file manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileManagerError {
    #[error("unsupported output kind {kind} for {name}")]
    UnsupportedKind { name: String, kind: String },
    #[error("location {0} is not writable")]
    NotWritable(String),
    #[error("location {0} cannot be listed")]
    NotListable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClassResolutionError {
    #[error("class loader is offline, cannot resolve {0}")]
    Offline(String),
    #[error("class not found: {0}")]
    NotFound(String),
    #[error("malformed classfile for {name}: {reason}")]
    Malformed { name: String, reason: String },
    #[error("requested {requested} but classfile declares {found}")]
    NameMismatch { requested: String, found: String },
    #[error("repository error while resolving {name}: {source}")]
    Repository {
        name: String,
        #[source]
        source: RepositoryError,
    },
}

impl ClassResolutionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClassResolutionError::NotFound(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtensionInstantiationError {
    #[error("extension scan failed: {0}")]
    Scan(#[from] RepositoryError),
    #[error(transparent)]
    Resolution(#[from] ClassResolutionError),
    #[error(
        "{class} exposes neither a public no-arg constructor nor a public static no-arg `get`"
    )]
    NoConstructor { class: String },
    #[error("no {kind} binding registered for {class}")]
    Unbound {
        class: String,
        kind: ConstructorKind,
    },
    #[error("{class} declares a {expected} constructor but is bound as {bound}")]
    ConstructorMismatch {
        class: String,
        expected: ConstructorKind,
        bound: ConstructorKind,
    },
    #[error("constructing {class} failed: {source}")]
    Construction {
        class: String,
        #[source]
        source: BoxError,
    },
}
