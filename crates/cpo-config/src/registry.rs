//!
//! # Cluster registry
//!
//! Known clusters keyed by API server URL, plus the current-cluster pointer.
//! Every mutation reloads `clusters.json` while holding its lock, applies the
//! change and writes the document back before the lock is released.
//!
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use comfy_table::{Row, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use cpo_types::defaults::{CLUSTERS_FILE_NAME, KEY_ALIAS, KEY_SERVER, KEY_TYPE, KEY_USERNAME};

use crate::cluster::{Cluster, ClusterData, ClusterFactory, ClusterType, default_factories};
use crate::error::{ConfigError, Result};
use crate::file::{FileGuard, JsonFile};
use crate::store::{ConfigStore, scalar_to_string};

/// On-disk shape of `clusters.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterData>,
    #[serde(default)]
    pub current_cluster: String,
}

impl RegistryDocument {
    /// server URL for `alias_or_server`, matching server URLs before aliases
    pub fn resolve(&self, alias_or_server: &str) -> Option<String> {
        if self.clusters.contains_key(alias_or_server) {
            return Some(alias_or_server.to_owned());
        }
        if alias_or_server.is_empty() {
            return None;
        }
        self.clusters
            .iter()
            .find(|(_, data)| data.alias().as_deref() == Some(alias_or_server))
            .map(|(server, _)| server.clone())
    }

    fn check_alias_available(&self, alias: &str, owner: Option<&str>) -> Result<()> {
        if alias.is_empty() {
            return Ok(());
        }
        let taken = self.clusters.iter().any(|(server, data)| {
            Some(server.as_str()) != owner && data.alias().as_deref() == Some(alias)
        });
        if taken {
            Err(ConfigError::DuplicateAlias(alias.to_owned()))
        } else {
            Ok(())
        }
    }

    fn normalize(&mut self) {
        if !self.current_cluster.is_empty() && !self.clusters.contains_key(&self.current_cluster)
        {
            debug!(current = %self.current_cluster, "dangling current cluster reset");
            self.current_cluster.clear();
        }
    }
}

pub struct ClusterRegistry {
    file: JsonFile,
    store: ConfigStore,
    factories: BTreeMap<&'static str, Arc<dyn ClusterFactory>>,
    /// merged view and the credentials revision it was built from
    credentials_view: Mutex<Option<(u64, BTreeMap<String, String>)>>,
}

impl ClusterRegistry {
    /// Registry rooted in [`crate::cpo_home`]
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(crate::cpo_home()?))
    }

    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            file: JsonFile::new(dir.join(CLUSTERS_FILE_NAME)),
            store: ConfigStore::open(dir),
            factories: default_factories(),
            credentials_view: Mutex::new(None),
        }
    }

    /// Register an additional cluster factory, replacing any factory with
    /// the same type id.
    pub fn with_factory(mut self, factory: Arc<dyn ClusterFactory>) -> Self {
        self.factories
            .insert(factory.cluster_type().type_id(), factory);
        self
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    fn factory(&self, type_id: &str) -> Result<&Arc<dyn ClusterFactory>> {
        self.factories
            .get(type_id)
            .ok_or_else(|| ConfigError::UnknownClusterType(type_id.to_owned()))
    }

    fn read(guard: &FileGuard<'_>) -> Result<RegistryDocument> {
        let mut document: RegistryDocument = guard.read()?;
        document.normalize();
        Ok(document)
    }

    fn write(&self, guard: &FileGuard<'_>, document: &RegistryDocument) -> Result<()> {
        guard.write(document)?;
        self.invalidate();
        Ok(())
    }

    fn invalidate(&self) {
        if let Ok(mut view) = self.credentials_view.lock() {
            view.take();
        }
    }

    /// Snapshot of the whole document
    pub fn document(&self) -> Result<RegistryDocument> {
        let guard = self.file.lock()?;
        Self::read(&guard)
    }

    fn build(&self, server: &str, data: &ClusterData) -> Result<Cluster> {
        let type_id = data
            .type_id()
            .unwrap_or_else(|| ClusterType::GenericOpenShift.type_id().to_owned());
        Ok(self
            .factory(&type_id)?
            .from_server_and_data(server, data.clone()))
    }

    #[instrument(skip(self, data))]
    pub fn add(
        &self,
        alias: Option<&str>,
        server: &str,
        type_id: &str,
        data: ClusterData,
    ) -> Result<Cluster> {
        let factory = self.factory(type_id)?;

        let mut record = data;
        record.insert(KEY_TYPE, type_id);
        match alias.filter(|a| !a.is_empty()) {
            Some(alias) => {
                record.insert(KEY_ALIAS, alias);
            }
            None => {
                record.remove(KEY_ALIAS);
            }
        }
        factory.validate(&record)?;

        let guard = self.file.lock()?;
        let mut document = Self::read(&guard)?;
        if document.clusters.contains_key(server) {
            return Err(ConfigError::DuplicateServer(server.to_owned()));
        }
        if let Some(alias) = record.alias() {
            document.check_alias_available(&alias, None)?;
        }
        document.clusters.insert(server.to_owned(), record.clone());
        self.write(&guard, &document)?;
        info!(server, "cluster added");

        Ok(factory.from_server_and_data(server, record))
    }

    /// Overwrite individual attributes. An empty `alias` removes the alias.
    #[instrument(skip(self, patch))]
    pub fn add_data(&self, alias_or_server: &str, patch: ClusterData) -> Result<()> {
        self.update(alias_or_server, |data| {
            data.merge(patch);
        })
    }

    /// Replace all attributes; the cluster type is kept.
    #[instrument(skip(self, data))]
    pub fn set_data(&self, alias_or_server: &str, data: ClusterData) -> Result<()> {
        self.update(alias_or_server, |existing| {
            let cluster_type = existing.get(KEY_TYPE).cloned();
            *existing = data;
            if let Some(cluster_type) = cluster_type {
                existing.insert(KEY_TYPE, cluster_type);
            }
        })
    }

    fn update<F>(&self, alias_or_server: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ClusterData),
    {
        let guard = self.file.lock()?;
        let mut document = Self::read(&guard)?;
        let server = document
            .resolve(alias_or_server)
            .ok_or_else(|| ConfigError::ClusterNotFound(alias_or_server.to_owned()))?;

        let mut data = document.clusters.get(&server).cloned().unwrap_or_default();
        apply(&mut data);
        if matches!(data.get(KEY_ALIAS), Some(Value::String(alias)) if alias.is_empty()) {
            data.remove(KEY_ALIAS);
        }
        if let Some(alias) = data.alias() {
            document.check_alias_available(&alias, Some(&server))?;
        }
        document.clusters.insert(server, data);
        self.write(&guard, &document)
    }

    pub fn get(&self, alias_or_server: &str) -> Result<Option<Cluster>> {
        let document = self.document()?;
        match document.resolve(alias_or_server) {
            Some(server) => {
                let data = &document.clusters[&server];
                self.build(&server, data).map(Some)
            }
            None => Ok(None),
        }
    }

    /// All clusters ordered by server URL
    pub fn list(&self) -> Result<Vec<Cluster>> {
        let document = self.document()?;
        document
            .clusters
            .iter()
            .map(|(server, data)| self.build(server, data))
            .collect()
    }

    pub fn list_as_table(&self) -> Result<Table> {
        let document = self.document()?;
        let mut table = Table::new();
        table.set_header(Row::from(["", "SERVER", "ALIAS", "TYPE", "USERNAME"]));
        for (server, data) in &document.clusters {
            let current = if *server == document.current_cluster {
                "*"
            } else {
                ""
            };
            let label = data
                .type_id()
                .and_then(|type_id| self.factories.get(type_id.as_str()))
                .map(|factory| factory.type_label())
                .unwrap_or("");
            table.add_row(Row::from([
                current.to_owned(),
                server.clone(),
                data.alias().unwrap_or_default(),
                label.to_owned(),
                data.get_str(KEY_USERNAME).unwrap_or_default(),
            ]));
        }
        table.load_preset(comfy_table::presets::NOTHING);
        Ok(table)
    }

    #[instrument(skip(self))]
    pub fn set_current(&self, alias_or_server: &str) -> Result<()> {
        let guard = self.file.lock()?;
        let mut document = Self::read(&guard)?;
        let server = document
            .resolve(alias_or_server)
            .ok_or_else(|| ConfigError::ClusterNotFound(alias_or_server.to_owned()))?;
        document.current_cluster = server;
        self.write(&guard, &document)
    }

    pub fn get_current(&self) -> Result<Option<Cluster>> {
        let document = self.document()?;
        if document.current_cluster.is_empty() {
            return Ok(None);
        }
        let data = &document.clusters[&document.current_cluster];
        self.build(&document.current_cluster, data).map(Some)
    }

    #[instrument(skip(self))]
    pub fn remove(&self, alias_or_server: &str) -> Result<Cluster> {
        let guard = self.file.lock()?;
        let mut document = Self::read(&guard)?;
        let server = document
            .resolve(alias_or_server)
            .ok_or_else(|| ConfigError::ClusterNotFound(alias_or_server.to_owned()))?;
        let data = document.clusters.remove(&server).unwrap_or_default();
        if document.current_cluster == server {
            document.current_cluster.clear();
        }
        self.write(&guard, &document)?;
        info!(%server, "cluster removed");
        self.build(&server, &data)
    }

    /// Stored user credentials overlaid with the current cluster's
    /// attributes and its `server`, without `alias`.
    ///
    /// Used to prefill command options the user omitted.
    pub fn current_credentials_view(&self) -> Result<BTreeMap<String, String>> {
        let revision = self.store.credentials_revision();
        if let Ok(cached) = self.credentials_view.lock() {
            if let Some((built_from, view)) = cached.as_ref() {
                if *built_from == revision {
                    return Ok(view.clone());
                }
            }
        }

        let mut view = self.store.credentials()?;
        let document = self.document()?;
        if let Some(data) = document.clusters.get(&document.current_cluster) {
            for (key, value) in data.iter() {
                if let Some(value) = scalar_to_string(value.clone()).filter(|v| !v.is_empty()) {
                    view.insert(key.clone(), value);
                }
            }
            view.insert(KEY_SERVER.to_owned(), document.current_cluster.clone());
        }
        view.remove(KEY_ALIAS);

        if let Ok(mut cached) = self.credentials_view.lock() {
            *cached = Some((revision, view.clone()));
        }
        Ok(view)
    }

    /// Same as [`ConfigStore::merge_credentials`] on [`Self::store`]
    pub fn merge_credentials(&self, credentials: BTreeMap<String, String>) -> Result<()> {
        self.store.merge_credentials(credentials)
    }
}
