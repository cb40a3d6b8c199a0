//!
//! # Plug-in packages
//!
//! A distribution is a directory holding `distribution.json`. Its entry
//! points in the `cpo.plugins` group name package directories. A package
//! carries a `package.json` marker whose `doc` is the command hierarchy
//! path the package attaches at. Every other `*.json` file of a package is
//! a leaf module declaring commands; subdirectories with a marker are
//! command groups.
//!
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use cpo_types::defaults::PLUGIN_ENTRY_POINT_GROUP;

use crate::error::{DispatchError, Result};

pub const DISTRIBUTION_FILE_NAME: &str = "distribution.json";
pub const PACKAGE_MARKER_FILE_NAME: &str = "package.json";

#[derive(Debug, Deserialize)]
struct DistributionManifest {
    name: String,
    version: String,
    #[serde(default)]
    entry_points: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PackageMarker {
    #[serde(default)]
    pub doc: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LeafModule {
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommandSpec {
    #[serde(default)]
    pub help: String,
    pub exec: Vec<String>,
}

/// A package advertised by an installed distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPackage {
    pub distribution: String,
    /// groups from the root, already in CLI form
    pub hierarchy_path: Vec<String>,
    pub path: PathBuf,
}

/// `attr_name` to `attr-name`
pub fn cli_name(name: &str) -> String {
    name.replace('_', "-")
}

fn read_json<T: DeserializeOwned>(path: &Path) -> std::result::Result<T, String> {
    let bytes = fs::read(path).map_err(|err| err.to_string())?;
    serde_json::from_slice(&bytes).map_err(|err| err.to_string())
}

pub(crate) fn read_marker(distribution: &str, dir: &Path) -> Result<PackageMarker> {
    let marker = dir.join(PACKAGE_MARKER_FILE_NAME);
    if !marker.is_file() {
        return Err(DispatchError::InvalidPackage {
            distribution: distribution.to_owned(),
            path: dir.to_owned(),
            reason: format!("missing {PACKAGE_MARKER_FILE_NAME}"),
        });
    }
    read_json(&marker).map_err(|reason| DispatchError::InvalidPackage {
        distribution: distribution.to_owned(),
        path: marker,
        reason,
    })
}

pub(crate) fn read_module(distribution: &str, path: &Path) -> Result<LeafModule> {
    let module: LeafModule = read_json(path).map_err(|reason| DispatchError::InvalidPackage {
        distribution: distribution.to_owned(),
        path: path.to_owned(),
        reason,
    })?;
    if let Some((name, _)) = module.commands.iter().find(|(_, spec)| spec.exec.is_empty()) {
        return Err(DispatchError::InvalidPackage {
            distribution: distribution.to_owned(),
            path: path.to_owned(),
            reason: format!("command {name} has an empty exec"),
        });
    }
    Ok(module)
}

/// Subpackages and leaf modules of a package, each sorted by file name
pub(crate) fn package_entries(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    let mut subpackages = Vec::new();
    let mut modules = Vec::new();
    for path in entries {
        if path.is_dir() {
            if path.join(PACKAGE_MARKER_FILE_NAME).is_file() {
                subpackages.push(path);
            }
        } else if path.extension().is_some_and(|ext| ext == "json")
            && path.file_name().is_some_and(|name| name != PACKAGE_MARKER_FILE_NAME)
        {
            modules.push(path);
        }
    }
    Ok((subpackages, modules))
}

fn hierarchy_path(doc: &str) -> Vec<String> {
    doc.trim()
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(cli_name)
        .collect()
}

fn read_distribution(dir: &Path, seen: &mut BTreeSet<String>) -> Result<Vec<PluginPackage>> {
    let manifest_path = dir.join(DISTRIBUTION_FILE_NAME);
    let manifest: DistributionManifest =
        read_json(&manifest_path).map_err(|reason| DispatchError::InvalidDistribution {
            path: manifest_path.clone(),
            reason,
        })?;
    semver::Version::parse(&manifest.version).map_err(|err| DispatchError::InvalidDistribution {
        path: manifest_path.clone(),
        reason: format!("version {}: {err}", manifest.version),
    })?;
    if !seen.insert(manifest.name.clone()) {
        warn!(distribution = %manifest.name, path = %dir.display(), "distribution shadowed by an earlier one");
        return Ok(Vec::new());
    }

    let Some(entry_points) = manifest.entry_points.get(PLUGIN_ENTRY_POINT_GROUP) else {
        return Ok(Vec::new());
    };
    entry_points
        .iter()
        .map(|(entry, relative)| {
            let path = dir.join(relative);
            let marker = read_marker(&manifest.name, &path)?;
            debug!(distribution = %manifest.name, entry, path = %path.display(), doc = %marker.doc, "plug-in package");
            Ok(PluginPackage {
                distribution: manifest.name.clone(),
                hierarchy_path: hierarchy_path(&marker.doc),
                path,
            })
        })
        .collect()
}

/// Packages of every distribution found on `search_path`. A directory on
/// the path is either a distribution itself or holds distributions.
pub fn discover_plugins(search_path: &[PathBuf]) -> Result<Vec<PluginPackage>> {
    let mut seen = BTreeSet::new();
    let mut packages = Vec::new();
    for dir in search_path {
        if !dir.is_dir() {
            continue;
        }
        if dir.join(DISTRIBUTION_FILE_NAME).is_file() {
            packages.extend(read_distribution(dir, &mut seen)?);
            continue;
        }
        let mut children = fs::read_dir(dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        children.sort();
        for child in children {
            if child.join(DISTRIBUTION_FILE_NAME).is_file() {
                packages.extend(read_distribution(&child, &mut seen)?);
            }
        }
    }
    Ok(packages)
}

/// `$CPO_PLUGIN_PATH` followed by `<cpo home>/plugins`
pub fn default_search_path() -> Vec<PathBuf> {
    let mut path: Vec<PathBuf> = std::env::var_os(cpo_types::defaults::CPO_PLUGIN_PATH_ENV)
        .map(|value| std::env::split_paths(&value).collect())
        .unwrap_or_default();
    if let Ok(home) = cpo_config::cpo_home() {
        path.push(home.join(cpo_types::defaults::PLUGINS_DIR_NAME));
    }
    path
}

/// Plug-ins on the default search path, discovered once per process
pub fn installed_plugins() -> Result<&'static [PluginPackage]> {
    static INSTALLED: OnceCell<Vec<PluginPackage>> = OnceCell::new();
    INSTALLED
        .get_or_try_init(|| discover_plugins(&default_search_path()))
        .map(Vec::as_slice)
}

#[cfg(test)]
pub(crate) mod test {
    use serde_json::json;

    use super::*;

    /// Write `distribution.json` and a package whose marker doc is `doc`
    pub(crate) fn write_distribution(root: &Path, name: &str, doc: &str) -> PathBuf {
        let dir = root.join(name);
        let package = dir.join("commands");
        fs::create_dir_all(&package).expect("mkdir");
        fs::write(
            dir.join(DISTRIBUTION_FILE_NAME),
            json!({
                "name": name,
                "version": "1.0.0",
                "entry_points": {"cpo.plugins": {"commands": "commands"}},
            })
            .to_string(),
        )
        .expect("write");
        write_marker(&package, doc);
        package
    }

    pub(crate) fn write_marker(dir: &Path, doc: &str) {
        fs::create_dir_all(dir).expect("mkdir");
        fs::write(dir.join(PACKAGE_MARKER_FILE_NAME), json!({"doc": doc}).to_string())
            .expect("write");
    }

    pub(crate) fn write_module(dir: &Path, file: &str, commands: &[(&str, &[&str])]) {
        let commands: serde_json::Map<String, serde_json::Value> = commands
            .iter()
            .map(|(name, exec)| {
                (
                    (*name).to_owned(),
                    json!({"help": format!("Run {name}"), "exec": exec}),
                )
            })
            .collect();
        fs::write(dir.join(file), json!({"commands": commands}).to_string()).expect("write");
    }

    #[test]
    fn test_discover() {
        let root = tempfile::tempdir().expect("tempdir");
        write_distribution(root.path(), "p1", "cluster/fyre_tools");
        write_distribution(root.path(), "p2", "");
        fs::create_dir_all(root.path().join("not-a-distribution")).expect("mkdir");

        let packages = discover_plugins(&[root.path().to_owned()]).expect("discover");
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].distribution, "p1");
        assert_eq!(packages[0].hierarchy_path, ["cluster", "fyre-tools"]);
        assert!(packages[1].hierarchy_path.is_empty());
    }

    #[test]
    fn test_package_without_marker_is_rejected() {
        let root = tempfile::tempdir().expect("tempdir");
        let package = write_distribution(root.path(), "p1", "");
        fs::remove_file(package.join(PACKAGE_MARKER_FILE_NAME)).expect("remove");

        let err = discover_plugins(&[root.path().to_owned()]).expect_err("no marker");
        assert!(matches!(err, DispatchError::InvalidPackage { distribution, .. } if distribution == "p1"));
    }

    #[test]
    fn test_first_distribution_wins() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        write_distribution(first.path(), "p1", "a");
        write_distribution(second.path(), "p1", "b");

        let packages =
            discover_plugins(&[first.path().to_owned(), second.path().to_owned()]).expect("discover");
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].hierarchy_path, ["a"]);
    }

    #[test]
    fn test_empty_exec_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_module(dir.path(), "tools.json", &[("broken", &[])]);
        assert!(read_module("p1", &dir.path().join("tools.json")).is_err());
    }
}
