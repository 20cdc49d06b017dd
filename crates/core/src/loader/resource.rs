//! File-URL side channel for tooling that wants a URL instead of bytes.

use crate::error::{CodeStoreError, Result};
use codestore_api::RepositoryError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;
use url::Url;

/// One file per class name under `dir`, rewritten once older than `freshness`.
#[derive(Debug, Clone)]
pub struct ResourceCache {
    dir: PathBuf,
    freshness: Duration,
}

impl ResourceCache {
    pub fn new(dir: impl Into<PathBuf>, freshness: Duration) -> Self {
        Self {
            dir: dir.into(),
            freshness,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, class_name: &str) -> PathBuf {
        self.dir.join(format!("{class_name}.class"))
    }

    pub fn is_fresh(&self, path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age < self.freshness)
    }

    /// URL of the cached file for `class_name`. `fetch` only runs when the
    /// file is missing or stale; `Ok(None)` when it reports the class absent.
    pub fn materialize<F>(&self, class_name: &str, fetch: F) -> Result<Option<Url>>
    where
        F: FnOnce() -> std::result::Result<Option<Vec<u8>>, RepositoryError>,
    {
        let path = std::path::absolute(self.path_for(class_name))?;
        if !self.is_fresh(&path) {
            let Some(bytes) = fetch()? else {
                return Ok(None);
            };
            fs::create_dir_all(&self.dir)?;
            // Each writer stages its own file; the last rename wins.
            let mut staged = NamedTempFile::new_in(&self.dir)?;
            staged.write_all(&bytes)?;
            staged.persist(&path).map_err(|e| e.error)?;
            debug!("materialized {} to {}", class_name, path.display());
        }
        Url::from_file_path(&path).map(Some).map_err(|_| {
            CodeStoreError::Config(format!(
                "resource cache path {} cannot be expressed as a URL",
                path.display()
            ))
        })
    }
}
