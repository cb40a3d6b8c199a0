//!
//! # Locked JSON documents
//!
//! Reads are lenient (a missing or empty file is the default document),
//! writes are atomic (temp file in the same directory, then rename) and both
//! happen while holding a process-local mutex and an exclusive advisory lock
//! on `<file>.lock`.
//!
use std::collections::HashMap;
use std::fs::{File, OpenOptions, create_dir_all, read_to_string};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::error::{ConfigError, Result, config_file_error};

/// Serialize `value` as JSON indented with tabs.
///
/// Object keys come out sorted as long as maps are `BTreeMap`s, which keeps
/// the on-disk files byte-stable across parse/serialize cycles.
pub fn to_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

fn process_lock(path: &Path) -> &'static Mutex<()> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    locks
        .entry(path.to_path_buf())
        .or_insert_with(|| Box::leak(Box::new(Mutex::new(()))))
}

/// A JSON document on disk with a companion lock file
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Acquire the process-local mutex and the cross-process file lock.
    ///
    /// Blocks until both are available; released when the guard is dropped.
    pub fn lock(&self) -> Result<FileGuard<'_>> {
        let process_guard = process_lock(&self.path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            create_dir_all(parent)
                .map_err(|e| config_file_error(format!("parent {:?}", parent), e))?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| config_file_error(format!("{:?}", self.lock_path), e))?;
        FileExt::lock_exclusive(&lock_file)
            .map_err(|e| config_file_error(format!("lock {:?}", self.lock_path), e))?;
        trace!(path = ?self.path, "acquired lock");

        Ok(FileGuard {
            file: self,
            lock_file,
            _process_guard: process_guard,
        })
    }

    /// Lock, read and release in one go.
    pub fn load<T: DeserializeOwned + Default>(&self) -> Result<T> {
        self.lock()?.read()
    }
}

/// Proof that the caller holds the lock of a [`JsonFile`]
pub struct FileGuard<'a> {
    file: &'a JsonFile,
    lock_file: File,
    _process_guard: MutexGuard<'static, ()>,
}

impl FileGuard<'_> {
    pub fn read<T: DeserializeOwned + Default>(&self) -> Result<T> {
        let path = &self.file.path;
        debug!(?path, "loading from");
        let content = match read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(err) => return Err(config_file_error(format!("{:?}", path), err)),
        };
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&content).map_err(|source| ConfigError::CorruptConfigurationFile {
            path: path.clone(),
            source,
        })
    }

    /// Replace the document atomically.
    pub fn write<T: Serialize>(&self, value: &T) -> Result<()> {
        let path = &self.file.path;
        let bytes = to_json_bytes(value).map_err(|source| {
            ConfigError::CorruptConfigurationFile {
                path: path.clone(),
                source,
            }
        })?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| config_file_error(format!("temp file in {:?}", dir), e))?;
        temp.write_all(&bytes)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| config_file_error(format!("{:?}", temp.path()), e))?;
        temp.persist(path)
            .map_err(|e| config_file_error(format!("{:?}", path), e.error))?;
        debug!(?path, "saved");
        Ok(())
    }
}

impl Drop for FileGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.lock_file) {
            debug!(path = ?self.file.lock_path, %err, "failed to release lock");
        }
    }
}
