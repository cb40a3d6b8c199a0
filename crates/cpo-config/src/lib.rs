//! # Cloud Pak Operations configuration
//!
//! Persistent, per-user state of the `cpo` CLI:
//!
//! - [`ConfigStore`]: flat credentials and settings documents
//! - [`ClusterRegistry`]: the set of known clusters and the current cluster
//!
//! Every document lives in the data directory returned by [`cpo_home`] and is
//! guarded by a companion lock file, see [`JsonFile`].

mod cluster;
mod error;
mod file;
mod registry;
mod store;

pub use cluster::{Cluster, ClusterData, ClusterFactory, ClusterType, default_factories};
pub use error::{ConfigError, Result};
pub use file::{JsonFile, FileGuard, to_json_bytes};
pub use registry::{ClusterRegistry, RegistryDocument};
pub use store::ConfigStore;

use std::path::PathBuf;

use cpo_types::defaults::{CLI_CONFIG_DIR, CPO_HOME_ENV};

/// find the directory holding all persisted state. precedent is:
/// 1) environment variable `CPO_HOME`
/// 2) home directory `~/.cpo`
pub fn cpo_home() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CPO_HOME_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir()
        .map(|home| home.join(CLI_CONFIG_DIR))
        .ok_or(ConfigError::NoHomeDirectory)
}
