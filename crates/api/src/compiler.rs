//! Boundary to the compilation backend.
//!
//! The backend sees the code store only through [`FileManager`]: a listing
//! over the sources of the running pass and an output sink for classfiles.
//! Nothing here refers to a real filesystem.

use crate::error::{BoxError, FileManagerError, RepositoryError};
use crate::models::SourceId;
use crate::models::naming;
use crate::repository::SourceRepository;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Source,
    Class,
    Other,
}

impl FileKind {
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Source => ".java",
            FileKind::Class => ".class",
            FileKind::Other => "",
        }
    }

    pub fn from_path(path: &str) -> Option<FileKind> {
        if path.ends_with(FileKind::Source.extension()) {
            Some(FileKind::Source)
        } else if path.ends_with(FileKind::Class.extension()) {
            Some(FileKind::Class)
        } else {
            None
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Source => f.write_str("source"),
            FileKind::Class => f.write_str("class"),
            FileKind::Other => f.write_str("other"),
        }
    }
}

/// Where the backend looks for, or writes, files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// Sources of the running pass.
    SourcePath,
    /// Compiled output of the running pass.
    ClassOutput,
    /// Whatever the backend ships with (JDK classes etc.).
    PlatformClassPath,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::SourcePath => f.write_str("SOURCE_PATH"),
            Location::ClassOutput => f.write_str("CLASS_OUTPUT"),
            Location::PlatformClassPath => f.write_str("PLATFORM_CLASS_PATH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    MandatoryWarning,
    Note,
    Other,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning | Severity::MandatoryWarning => f.write_str("warning"),
            Severity::Note => f.write_str("note"),
            Severity::Other => f.write_str("other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Qualified name of the source the diagnostic refers to, if any.
    pub source: Option<String>,
    pub line: Option<u64>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            source: None,
            line: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn at(mut self, source: impl Into<String>, line: Option<u64>) -> Self {
        self.source = Some(source.into());
        self.line = line;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, "{source}:{line}: ")?,
            (Some(source), None) => write!(f, "{source}: ")?,
            _ => {}
        }
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Receives diagnostics as the backend produces them.
pub trait DiagnosticListener {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Command-line style options forwarded verbatim to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub args: Vec<String>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

impl<S: Into<String>> FromIterator<S> for CompileOptions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(Into::into).collect(),
        }
    }
}

struct UnitInner {
    name: String,
    id: SourceId,
    uri: String,
    repository: Arc<dyn SourceRepository>,
    content: OnceCell<Arc<str>>,
    failure: Mutex<Option<RepositoryError>>,
}

/// One stored source handed to the backend for a single pass.
///
/// Content is checked out of the repository on first request only and then
/// shared by every clone of the unit.
#[derive(Clone)]
pub struct CompilationUnit {
    inner: Arc<UnitInner>,
}

impl CompilationUnit {
    pub fn new(
        qualified_name: impl Into<String>,
        id: SourceId,
        repository: Arc<dyn SourceRepository>,
    ) -> Self {
        let name = qualified_name.into();
        let uri = naming::to_virtual_uri(&name, FileKind::Source);
        Self {
            inner: Arc::new(UnitInner {
                name,
                id,
                uri,
                repository,
                content: OnceCell::new(),
                failure: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    pub fn kind(&self) -> FileKind {
        FileKind::Source
    }

    pub fn content(&self) -> Result<Arc<str>, RepositoryError> {
        let inner = &self.inner;
        inner
            .content
            .get_or_try_init(|| {
                let bytes = inner.repository.fetch_content(inner.id)?;
                String::from_utf8(bytes)
                    .map(Arc::from)
                    .map_err(|_| RepositoryError::Encoding {
                        key: inner.name.clone(),
                    })
            })
            .cloned()
            .inspect_err(|e| {
                *inner.failure.lock().unwrap() = Some(e.clone());
            })
    }

    /// Whether the content has been checked out yet.
    pub fn is_loaded(&self) -> bool {
        self.inner.content.get().is_some()
    }

    /// Last checkout failure seen by any clone of this unit.
    pub fn fetch_failure(&self) -> Option<RepositoryError> {
        self.inner.failure.lock().unwrap().clone()
    }
}

impl fmt::Debug for CompilationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationUnit")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("uri", &self.inner.uri)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// File/location model the backend compiles against.
pub trait FileManager {
    /// Units under `package` at `location`.
    fn list(
        &self,
        location: Location,
        package: &str,
        kinds: &[FileKind],
        recurse: bool,
    ) -> Result<Vec<CompilationUnit>, FileManagerError>;

    fn infer_binary_name(&self, location: Location, unit: &CompilationUnit) -> Option<String>;

    /// Accept the bytes of one emitted file. `sibling` is the unit the backend
    /// was compiling when it produced the output, when known.
    fn write_output(
        &mut self,
        location: Location,
        binary_name: &str,
        kind: FileKind,
        sibling: Option<&CompilationUnit>,
        bytes: Vec<u8>,
    ) -> Result<(), FileManagerError>;
}

/// A compiler that turns units into classfiles.
pub trait CompilerBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Compile every unit in one invocation. `Ok(false)` means the backend
    /// reported failure through diagnostics; `Err` means it could not run.
    fn compile(
        &self,
        options: &CompileOptions,
        files: &mut dyn FileManager,
        diagnostics: &mut dyn DiagnosticListener,
        units: &[CompilationUnit],
    ) -> Result<bool, BoxError>;
}
