use std::io::Error as IoError;
use std::path::PathBuf;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file {msg}")]
    ConfigFileError { msg: String, source: IoError },
    #[error("Corrupt configuration file {path:?}: {source}")]
    CorruptConfigurationFile {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unable to determine the home directory")]
    NoHomeDirectory,
    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),
    #[error("A cluster with server URL {0} already exists")]
    DuplicateServer(String),
    #[error("Alias {0} is already in use")]
    DuplicateAlias(String),
    #[error("Unknown cluster type: {0}")]
    UnknownClusterType(String),
    #[error("{cluster_type} clusters require the '{key}' attribute")]
    MissingClusterData { cluster_type: String, key: String },
    #[error("Invalid value for setting {name}: {source}")]
    InvalidSetting {
        name: String,
        source: serde_json::Error,
    },
}

pub(crate) fn config_file_error(msg: impl Into<String>, source: IoError) -> ConfigError {
    ConfigError::ConfigFileError {
        msg: msg.into(),
        source,
    }
}
