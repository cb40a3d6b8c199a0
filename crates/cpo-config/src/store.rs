//!
//! # Credentials and settings store
//!
//! Two flat documents under the data directory. Credentials map names to
//! strings and never expose empty values; settings map names to arbitrary
//! JSON scalars.
//!
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use cpo_types::defaults::{CREDENTIALS_FILE_NAME, SETTINGS_FILE_NAME};

use crate::error::{ConfigError, Result};
use crate::file::JsonFile;

pub type CredentialsDocument = BTreeMap<String, Value>;
pub type SettingsDocument = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
    credentials: JsonFile,
    settings: JsonFile,
    /// bumped on every credentials write through this store or its clones
    credentials_revision: Arc<AtomicU64>,
}

impl ConfigStore {
    /// Store rooted in [`crate::cpo_home`]
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(crate::cpo_home()?))
    }

    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            credentials: JsonFile::new(dir.join(CREDENTIALS_FILE_NAME)),
            settings: JsonFile::new(dir.join(SETTINGS_FILE_NAME)),
            credentials_revision: Arc::new(AtomicU64::new(0)),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn credentials_path(&self) -> &Path {
        self.credentials.path()
    }

    pub fn settings_path(&self) -> &Path {
        self.settings.path()
    }

    /// Typed setting, `None` when unset
    pub fn get_setting<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let settings: SettingsDocument = self.settings.load()?;
        match settings.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| ConfigError::InvalidSetting {
                    name: name.to_owned(),
                    source,
                }),
        }
    }

    pub fn get_setting_or<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T> {
        Ok(self.get_setting(name)?.unwrap_or(default))
    }

    pub fn set_setting<T: Serialize>(&self, name: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|source| ConfigError::InvalidSetting {
            name: name.to_owned(),
            source,
        })?;
        let guard = self.settings.lock()?;
        let mut settings: SettingsDocument = guard.read()?;
        settings.insert(name.to_owned(), value);
        guard.write(&settings)?;
        debug!(name, "setting stored");
        Ok(())
    }

    /// Returns whether the setting was present
    pub fn unset_setting(&self, name: &str) -> Result<bool> {
        let guard = self.settings.lock()?;
        let mut settings: SettingsDocument = guard.read()?;
        let removed = settings.remove(name).is_some();
        if removed {
            guard.write(&settings)?;
        }
        Ok(removed)
    }

    pub fn settings(&self) -> Result<SettingsDocument> {
        self.settings.load()
    }

    /// Merge `credentials` into the stored document.
    ///
    /// An empty string removes the key.
    pub fn merge_credentials(&self, credentials: BTreeMap<String, String>) -> Result<()> {
        let guard = self.credentials.lock()?;
        let mut document: CredentialsDocument = guard.read()?;
        for (key, value) in credentials {
            if value.is_empty() {
                document.remove(&key);
            } else {
                document.insert(key, Value::String(value));
            }
        }
        guard.write(&document)?;
        self.credentials_revision.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub(crate) fn credentials_revision(&self) -> u64 {
        self.credentials_revision.load(Ordering::SeqCst)
    }

    pub fn get_credential(&self, name: &str) -> Result<Option<String>> {
        Ok(self.credentials()?.remove(name))
    }

    /// All stored credentials with non-empty values, scalars rendered as strings
    pub fn credentials(&self) -> Result<BTreeMap<String, String>> {
        let document: CredentialsDocument = self.credentials.load()?;
        Ok(document
            .into_iter()
            .filter_map(|(key, value)| scalar_to_string(value).map(|value| (key, value)))
            .filter(|(_, value)| !value.is_empty())
            .collect())
    }
}

pub(crate) fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
