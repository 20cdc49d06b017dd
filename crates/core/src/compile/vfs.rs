//! In-memory file manager bridging the repositories to the backend.
//!
//! Sources are addressed by qualified name, outputs by binary name; virtual
//! paths only exist as identifiers and never touch a disk.

use codestore_api::models::naming;
use codestore_api::{CompilationUnit, FileKind, FileManager, FileManagerError, Location};
use std::collections::BTreeMap;
use tracing::debug;

/// One classfile captured during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub bytes: Vec<u8>,
    /// Qualified name of the unit the backend attributed the output to.
    pub sibling: Option<String>,
}

pub struct StoreFileManager {
    units: BTreeMap<String, CompilationUnit>,
    outputs: BTreeMap<String, CapturedOutput>,
}

impl StoreFileManager {
    pub fn new(units: impl IntoIterator<Item = CompilationUnit>) -> Self {
        Self {
            units: units
                .into_iter()
                .map(|u| (u.name().to_string(), u))
                .collect(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.units.contains_key(qualified_name)
    }

    pub fn source_unit(&self, qualified_name: &str) -> Option<&CompilationUnit> {
        self.units.get(qualified_name)
    }

    /// Resolve a synthetic path such as `/a/Foo.java` back to its unit.
    pub fn unit_for_path(&self, path: &str) -> Option<&CompilationUnit> {
        match naming::from_virtual_path(path)? {
            (name, FileKind::Source) => self.units.get(&name),
            _ => None,
        }
    }

    pub fn units(&self) -> impl Iterator<Item = &CompilationUnit> {
        self.units.values()
    }

    pub fn outputs(&self) -> &BTreeMap<String, CapturedOutput> {
        &self.outputs
    }

    pub fn into_outputs(self) -> BTreeMap<String, CapturedOutput> {
        self.outputs
    }
}

impl FileManager for StoreFileManager {
    fn list(
        &self,
        location: Location,
        package: &str,
        kinds: &[FileKind],
        recurse: bool,
    ) -> Result<Vec<CompilationUnit>, FileManagerError> {
        match location {
            Location::SourcePath => {}
            // Platform classes are the backend's own business.
            Location::PlatformClassPath => return Ok(Vec::new()),
            Location::ClassOutput => {
                return Err(FileManagerError::NotListable(location.to_string()));
            }
        }
        if !kinds.contains(&FileKind::Source) {
            return Ok(Vec::new());
        }
        Ok(self
            .units
            .values()
            .filter(|u| naming::in_package(u.name(), package, recurse))
            .cloned()
            .collect())
    }

    fn infer_binary_name(&self, location: Location, unit: &CompilationUnit) -> Option<String> {
        match location {
            Location::SourcePath if self.units.contains_key(unit.name()) => {
                Some(unit.name().to_string())
            }
            _ => None,
        }
    }

    fn write_output(
        &mut self,
        location: Location,
        binary_name: &str,
        kind: FileKind,
        sibling: Option<&CompilationUnit>,
        bytes: Vec<u8>,
    ) -> Result<(), FileManagerError> {
        if location != Location::ClassOutput {
            return Err(FileManagerError::NotWritable(location.to_string()));
        }
        if kind != FileKind::Class {
            return Err(FileManagerError::UnsupportedKind {
                name: binary_name.to_string(),
                kind: kind.to_string(),
            });
        }
        debug!("captured {} ({} bytes)", binary_name, bytes.len());
        self.outputs.insert(
            binary_name.to_string(),
            CapturedOutput {
                bytes,
                sibling: sibling.map(|u| u.name().to_string()),
            },
        );
        Ok(())
    }
}
