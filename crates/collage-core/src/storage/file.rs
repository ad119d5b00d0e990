//! File-backed state store.

use super::{BoxFuture, StateStore, StorageError, StorageResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each key as `<key>.json` in a directory.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a store in the default location.
    ///
    /// On Linux: `~/.local/share/collage/state/`
    /// On Windows: `%LOCALAPPDATA%\collage\state\`
    pub fn default_location() -> StorageResult<Self> {
        Self::new(Self::default_path()?)
    }

    /// The directory `default_location` uses.
    pub fn default_path() -> StorageResult<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Ok(base.join("collage").join("state"))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_key))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> BoxFuture<'_, StorageResult<Option<String>>> {
        let path = self.key_path(key);
        Box::pin(async move {
            match fs::read_to_string(&path) {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StorageError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))),
            }
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.key_path(key);
        Box::pin(async move {
            fs::write(&path, value).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
            })
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.key_path(key);
        Box::pin(async move {
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StorageError::Io(format!(
                    "Failed to delete {}: {}",
                    path.display(),
                    e
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        block_on(store.set("canvas_state", "{\"layers\":[]}".to_string())).unwrap();
        assert!(dir.path().join("canvas_state.json").exists());
        assert_eq!(
            block_on(store.get("canvas_state")).unwrap().as_deref(),
            Some("{\"layers\":[]}")
        );

        block_on(store.remove("canvas_state")).unwrap();
        assert_eq!(block_on(store.get("canvas_state")).unwrap(), None);
    }

    #[test]
    fn test_key_is_sanitized() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        block_on(store.set("../escape", "x".to_string())).unwrap();
        assert!(dir.path().join("___escape.json").exists());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::new(&nested).unwrap();
        assert_eq!(store.base_path(), nested.as_path());
        assert!(nested.is_dir());
    }
}
