//!
//! # Cluster types
//!
//! A cluster is its API server URL plus an open attribute map. The `type`
//! attribute selects the [`ClusterFactory`] that validates the map and
//! builds the typed [`Cluster`].
//!
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cpo_types::defaults::{
    KEY_ALIAS, KEY_CLUSTER_NAME, KEY_INSECURE_SKIP_TLS_VERIFY, KEY_PASSWORD, KEY_TOKEN, KEY_TYPE,
    KEY_USERNAME,
};

use crate::error::{ConfigError, Result};
use crate::store::scalar_to_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterType {
    GenericOpenShift,
    ManagedCloudOpenShift,
    Provisioner,
}

impl ClusterType {
    pub const ALL: [ClusterType; 3] = [
        ClusterType::GenericOpenShift,
        ClusterType::ManagedCloudOpenShift,
        ClusterType::Provisioner,
    ];

    /// identifier stored in the `type` attribute
    pub fn type_id(&self) -> &'static str {
        match self {
            Self::GenericOpenShift => "openshift",
            Self::ManagedCloudOpenShift => "ibmcloud",
            Self::Provisioner => "fyre",
        }
    }

    pub fn from_type_id(type_id: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.type_id() == type_id)
            .ok_or_else(|| ConfigError::UnknownClusterType(type_id.to_owned()))
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_id())
    }
}

/// Free-form attributes of a registered cluster.
///
/// Unknown keys are preserved on read and on write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterData(BTreeMap<String, Value>);

impl ClusterData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String view of a scalar attribute; empty strings read as absent
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .cloned()
            .and_then(scalar_to_string)
            .filter(|s| !s.is_empty())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn alias(&self) -> Option<String> {
        self.get_str(KEY_ALIAS)
    }

    pub fn type_id(&self) -> Option<String> {
        self.get_str(KEY_TYPE)
    }

    /// Per-key overwrite
    pub fn merge(&mut self, patch: ClusterData) {
        self.0.extend(patch.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for ClusterData {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ClusterData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A registered cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    server: String,
    cluster_type: ClusterType,
    data: ClusterData,
}

impl Cluster {
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn cluster_type(&self) -> ClusterType {
        self.cluster_type
    }

    pub fn data(&self) -> &ClusterData {
        &self.data
    }

    pub fn alias(&self) -> Option<String> {
        self.data.alias()
    }

    pub fn username(&self) -> Option<String> {
        self.data.get_str(KEY_USERNAME)
    }

    pub fn password(&self) -> Option<String> {
        self.data.get_str(KEY_PASSWORD)
    }

    pub fn token(&self) -> Option<String> {
        self.data.get_str(KEY_TOKEN)
    }

    pub fn insecure_skip_tls_verify(&self) -> bool {
        self.data.get_bool(KEY_INSECURE_SKIP_TLS_VERIFY)
    }

    pub fn cluster_name(&self) -> Option<String> {
        self.data.get_str(KEY_CLUSTER_NAME)
    }
}

/// Builds typed clusters for one cluster type
pub trait ClusterFactory: Send + Sync {
    fn cluster_type(&self) -> ClusterType;

    /// Human readable name used in tables
    fn type_label(&self) -> &'static str;

    /// attributes that must be present when the cluster is added
    fn required_keys(&self) -> &'static [&'static str] {
        &[]
    }

    fn validate(&self, data: &ClusterData) -> Result<()> {
        match self
            .required_keys()
            .iter()
            .find(|key| data.get_str(key).is_none())
        {
            Some(key) => Err(ConfigError::MissingClusterData {
                cluster_type: self.type_label().to_owned(),
                key: (*key).to_owned(),
            }),
            None => Ok(()),
        }
    }

    fn from_server_and_data(&self, server: &str, data: ClusterData) -> Cluster {
        Cluster {
            server: server.to_owned(),
            cluster_type: self.cluster_type(),
            data,
        }
    }
}

struct GenericOpenShiftFactory;

impl ClusterFactory for GenericOpenShiftFactory {
    fn cluster_type(&self) -> ClusterType {
        ClusterType::GenericOpenShift
    }

    fn type_label(&self) -> &'static str {
        "OpenShift"
    }
}

struct ManagedCloudOpenShiftFactory;

impl ClusterFactory for ManagedCloudOpenShiftFactory {
    fn cluster_type(&self) -> ClusterType {
        ClusterType::ManagedCloudOpenShift
    }

    fn type_label(&self) -> &'static str {
        "Red Hat OpenShift on IBM Cloud"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &[KEY_CLUSTER_NAME]
    }
}

struct ProvisionerFactory;

impl ClusterFactory for ProvisionerFactory {
    fn cluster_type(&self) -> ClusterType {
        ClusterType::Provisioner
    }

    fn type_label(&self) -> &'static str {
        "OCP+"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &[KEY_CLUSTER_NAME]
    }
}

/// Factory table wired at process start, keyed by type id
pub fn default_factories() -> BTreeMap<&'static str, Arc<dyn ClusterFactory>> {
    let factories: [Arc<dyn ClusterFactory>; 3] = [
        Arc::new(GenericOpenShiftFactory),
        Arc::new(ManagedCloudOpenShiftFactory),
        Arc::new(ProvisionerFactory),
    ];
    factories
        .into_iter()
        .map(|factory| (factory.cluster_type().type_id(), factory))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_type_ids() {
        for cluster_type in ClusterType::ALL {
            assert_eq!(
                ClusterType::from_type_id(cluster_type.type_id()).expect("type"),
                cluster_type
            );
        }
        assert!(matches!(
            ClusterType::from_type_id("aks"),
            Err(ConfigError::UnknownClusterType(_))
        ));
    }

    #[test]
    fn test_factory_validation() {
        let factories = default_factories();
        let ibmcloud = &factories["ibmcloud"];
        let data: ClusterData = [(KEY_USERNAME, "u")].into_iter().collect();

        let err = ibmcloud.validate(&data).expect_err("missing cluster name");
        assert!(matches!(err, ConfigError::MissingClusterData { key, .. } if key == KEY_CLUSTER_NAME));
        assert!(factories["openshift"].validate(&data).is_ok());
    }

    #[test]
    fn test_cluster_accessors() {
        let data: ClusterData = [
            (KEY_ALIAS, Value::from("a")),
            (KEY_INSECURE_SKIP_TLS_VERIFY, Value::from(true)),
            (KEY_TOKEN, Value::from("")),
            ("color", Value::from("blue")),
        ]
        .into_iter()
        .collect();
        let cluster = default_factories()["openshift"].from_server_and_data("https://api.a:6443", data);

        assert_eq!(cluster.alias().as_deref(), Some("a"));
        assert!(cluster.insecure_skip_tls_verify());
        assert_eq!(cluster.token(), None);
        assert_eq!(cluster.data().get_str("color").as_deref(), Some("blue"));
    }
}
