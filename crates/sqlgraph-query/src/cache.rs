//! File-backed result caching.
//!
//! A query result is serialized to a file the first time it is computed and
//! read back from that file afterwards, until the file is removed. Shared
//! entity instances are written as nested copies; sharing is not restored
//! on load.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlgraph_core::{CacheError, Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A result cache stored as JSON in a single file.
///
/// # Example
///
/// ```ignore
/// let cache = FileCache::new("/tmp/users.json");
/// let users: Vec<EntityRef<User>> =
///     cache.load_or_insert_with(|| Select::new(&conn, "select {User.*} from users").select_beans())?;
/// ```
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(
        &self,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Error {
        Error::Cache(CacheError {
            path: self.path.display().to_string(),
            message: message.into(),
            source: Some(Box::new(source)),
        })
    }

    /// The cached value, or `None` when nothing is cached yet. An empty
    /// file counts as nothing cached.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error("unable to read cache file", e)),
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| self.error("unable to deserialize cached result", e))
    }

    /// Write `value`, replacing anything cached before.
    pub fn store<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| self.error("unable to serialize result", e))?;
        fs::write(&self.path, bytes).map_err(|e| self.error("unable to write cache file", e))
    }

    /// Return the cached value, or compute it with `compute`, store it and
    /// return it.
    pub fn load_or_insert_with<T, F>(&self, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if let Some(cached) = self.load()? {
            tracing::debug!(path = %self.path.display(), "result cache hit");
            return Ok(cached);
        }
        let value = compute()?;
        self.store(&value)?;
        tracing::debug!(path = %self.path.display(), "result cached");
        Ok(value)
    }

    /// Drop the cached value. Missing files are ignored.
    pub fn invalidate(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error("unable to remove cache file", e)),
        }
    }
}
