//! Code store configuration, loadable from a JSON document.
//!
//! ```json
//! {
//!   "loader": { "offline": false, "resource_freshness_secs": 3600 },
//!   "compiler": { "options": ["-g", "-parameters"] },
//!   "extensions": { "marker": "org.codestore.api.Extension", "packages": ["org.acme"] }
//! }
//! ```
//!
//! Every section and field is optional and falls back to its default.

use crate::error::{CodeStoreError, Result};
use codestore_api::CompileOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeStoreConfig {
    pub loader: LoaderConfig,
    pub compiler: CompilerConfig,
    pub extensions: ExtensionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Refuse every lookup against the artifact repository.
    pub offline: bool,
    /// Directory for materialised resources; a per-process temp dir if unset.
    pub resource_cache_dir: Option<PathBuf>,
    /// Materialised resources older than this are rewritten.
    pub resource_freshness_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            offline: false,
            resource_cache_dir: None,
            resource_freshness_secs: 3600,
        }
    }
}

impl LoaderConfig {
    pub fn resource_freshness(&self) -> Duration {
        Duration::from_secs(self.resource_freshness_secs)
    }

    pub fn resource_cache_dir(&self) -> PathBuf {
        self.resource_cache_dir.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("codestore-{}", std::process::id()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub options: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            options: vec!["-g".to_string()],
        }
    }
}

impl CompilerConfig {
    pub fn compile_options(&self) -> CompileOptions {
        self.options.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Binary name of the marker annotation type.
    pub marker: String,
    /// Package prefixes to scan; empty scans every artifact.
    pub packages: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            marker: "org.codestore.api.Extension".to_string(),
            packages: Vec::new(),
        }
    }
}

impl CodeStoreConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extensions.marker.trim().is_empty() {
            return Err(CodeStoreError::Config(
                "extensions.marker must name an annotation type".to_string(),
            ));
        }
        if self.loader.resource_freshness_secs == 0 {
            return Err(CodeStoreError::Config(
                "loader.resource_freshness_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
