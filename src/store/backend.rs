use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Key-value storage for persisted collections plus a place to keep audio
/// blobs
///
/// Writes are last-writer-wins; there is no coordination between processes
/// sharing the same backend.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Store a blob and return a locator for it
    fn put_blob(&self, name: &str, bytes: &[u8]) -> Result<String>;

    /// Delete a blob previously returned by `put_blob`
    fn remove_blob(&self, locator: &str) -> Result<()>;
}

/// Backend that keeps each key in `<data_dir>/<key>.json` and blobs under
/// `<data_dir>/audio/`
pub struct FileBackend {
    data_dir: PathBuf,
}

impl FileBackend {
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();

        // Create data directories if they don't exist
        fs::create_dir_all(data_dir.join("audio"))?;

        // blob locators are stored in records and must not depend on the cwd
        let data_dir = fs::canonicalize(data_dir)?;

        info!("File storage initialized at {}", data_dir.display());

        Ok(Self { data_dir })
    }

    /// Absolute path of the data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        check_name(key)?;
        Ok(self.data_dir.join(format!("{}.json", key)))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| Error::PersistenceCorrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp = path.with_extension("json.tmp");

        // write-then-rename so a crash never leaves a half-written file
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        debug!("Saved {} ({} bytes)", path.display(), value.len());
        Ok(())
    }

    fn put_blob(&self, name: &str, bytes: &[u8]) -> Result<String> {
        check_name(name)?;
        let path = self.data_dir.join("audio").join(name);

        fs::write(&path, bytes)?;

        info!("Stored blob {} ({} bytes)", path.display(), bytes.len());
        Ok(path.display().to_string())
    }

    fn remove_blob(&self, locator: &str) -> Result<()> {
        let path = Path::new(locator);
        let audio_dir = self.data_dir.join("audio");
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

        if path.parent() != Some(audio_dir.as_path()) || check_name(name).is_err() {
            return Err(Error::not_found("Blob", locator));
        }

        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::not_found("Blob", locator)),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory backend
#[derive(Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<String, String>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of a stored blob
    pub fn blob(&self, locator: &str) -> Option<Vec<u8>> {
        read_lock(&self.blobs).get(locator).cloned()
    }

    pub fn blob_count(&self) -> usize {
        read_lock(&self.blobs).len()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(read_lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        write_lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn put_blob(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let locator = format!("memory://audio/{}", name);
        write_lock(&self.blobs).insert(locator.clone(), bytes.to_vec());
        Ok(locator)
    }

    fn remove_blob(&self, locator: &str) -> Result<()> {
        write_lock(&self.blobs)
            .remove(locator)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("Blob", locator))
    }
}

// a poisoned map is still a valid map
fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keys and blob names become file names
fn check_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');

    if valid {
        Ok(())
    } else {
        Err(Error::Io(format!("invalid storage name {:?}", name)))
    }
}
