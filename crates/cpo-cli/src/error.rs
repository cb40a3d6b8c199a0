use std::path::PathBuf;

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;

/// Failures assembling or running the command tree
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    /// Two distributions define the same leaf command
    #[error("Command {command} is defined by both {first} and {second}")]
    DuplicateCommand {
        command: String,
        first: String,
        second: String,
    },
    /// A name is a command in one distribution and a group in another
    #[error("{command} is a command in {leaf} but a command group in {group}")]
    CommandTypeConflict {
        command: String,
        leaf: String,
        group: String,
    },
    #[error("Invalid plug-in package {path} in {distribution}: {reason}")]
    InvalidPackage {
        distribution: String,
        path: PathBuf,
        reason: String,
    },
    #[error("Invalid plug-in distribution {path}: {reason}")]
    InvalidDistribution { path: PathBuf, reason: String },
    #[error("Unable to find {program} for plug-in {distribution}")]
    PluginNotFound {
        program: String,
        distribution: String,
    },
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("Unable to render the command tree")]
    Render(#[from] std::fmt::Error),
}
