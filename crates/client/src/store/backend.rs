//! Raw string storage backends.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Raw key/value persistence.
///
/// Implementations store opaque strings. Envelopes, versioning and quota
/// live in [`Store`](super::Store).
pub trait StorageBackend: Send + Sync + 'static {
    /// Read the value for `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the value exists but cannot be read.
    fn read(&self, key: &str) -> io::Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the value cannot be written.
    fn write(&self, key: &str, value: &str) -> io::Result<()>;

    /// Delete `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the value exists but cannot be removed.
    fn delete(&self, key: &str) -> io::Result<()>;
}

/// In-memory backend for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a data directory.
///
/// Writes go to a temporary file that is renamed into place, and all
/// mutations are serialized through a mutex.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Open (creating if needed) a data directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// The data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key: {key:?}"),
            ));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| io::Error::other("file store lock poisoned"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        let _guard = self.lock()?;
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.lock()?;
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert!(backend.read("k").unwrap().is_none());
        backend.write("k", "v").unwrap();
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("v"));
        backend.delete("k").unwrap();
        backend.delete("k").unwrap();
        assert!(backend.read("k").unwrap().is_none());
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("nested")).unwrap();
        backend.write("kisanSetuCart", "[]").unwrap();
        assert!(dir.path().join("nested/kisanSetuCart.json").exists());
        assert_eq!(backend.read("kisanSetuCart").unwrap().as_deref(), Some("[]"));

        backend.delete("kisanSetuCart").unwrap();
        assert!(backend.read("kisanSetuCart").unwrap().is_none());
        // Deleting twice is fine.
        backend.delete("kisanSetuCart").unwrap();
    }

    #[test]
    fn test_file_backend_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let err = backend.write("../escape", "x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(backend.read("").is_err());
    }
}
