//! # Root CLI
//!
//! Commands of the `cpo` executable. Plug-in commands are resolved against
//! the merged command tree before clap sees the command line and run as
//! child processes; everything else is parsed by the clap-derived
//! [`Cli`].

mod cluster;
mod context;
mod cp4d;
mod dispatch;
mod error;
mod openshift;
mod plugin;
mod settings;
mod user;
mod version;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cpo_types::defaults::{CLI_NAME, CPO_LOG_LEVEL_ENV, SETTING_LOG_LEVEL};

pub use context::CliContext;
pub use dispatch::{
    BUILTIN_DISTRIBUTION, CommandGroup, CommandLeaf, CommandNode, CommandTree, PluginExec,
    PluginPackage, Resolution, cli_name, default_search_path, discover_plugins,
    installed_plugins, run_plugin,
};
pub use error::DispatchError;

use self::cluster::ClusterCmd;
use self::cp4d::Cp4dCmd;
use self::openshift::OpenShiftCmd;
use self::plugin::PluginCmd;
use self::settings::SettingsCmd;
use self::user::UserCmd;
use self::version::VersionOpt;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Accepted values of `--log-level`
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Args, Clone, Default)]
pub struct GlobalOptions {
    /// Log level, forwarded to plug-ins
    #[arg(
        long,
        global = true,
        value_name = "level",
        value_parser = LOG_LEVELS,
        env = CPO_LOG_LEVEL_ENV
    )]
    log_level: Option<String>,
}

/// Cloud Pak Operations command line interface
#[derive(Debug, Parser)]
#[command(
    name = CLI_NAME,
    version,
    about = "Cloud Pak Operations CLI",
    arg_required_else_help = true,
    max_term_width = 100
)]
pub struct Cli {
    #[command(flatten)]
    global_opts: GlobalOptions,
    #[command(subcommand)]
    command: RootCmd,
}

#[derive(Debug, Subcommand)]
enum RootCmd {
    /// Manage registered OpenShift clusters
    #[command(subcommand, name = "cluster")]
    Cluster(ClusterCmd),

    /// Manage stored user credentials
    #[command(subcommand, name = "user")]
    User(UserCmd),

    /// Manage persistent settings
    #[command(subcommand, name = "settings")]
    Settings(SettingsCmd),

    /// OpenShift cluster operations
    #[command(subcommand, name = "openshift")]
    OpenShift(OpenShiftCmd),

    /// Install and manage IBM Cloud Pak for Data
    #[command(subcommand, name = "cp4d")]
    Cp4d(Cp4dCmd),

    /// Inspect installed plug-ins
    #[command(subcommand, name = "plugin")]
    Plugin(PluginCmd),

    /// Print version information
    #[command(name = "version")]
    Version(VersionOpt),
}

impl Cli {
    pub async fn process(self, context: &CliContext, tree: &CommandTree) -> Result<()> {
        match self.command {
            RootCmd::Cluster(cmd) => cmd.process(context).await,
            RootCmd::User(cmd) => cmd.process(context),
            RootCmd::Settings(cmd) => cmd.process(context),
            RootCmd::OpenShift(cmd) => cmd.process(context).await,
            RootCmd::Cp4d(cmd) => cmd.process(context).await,
            RootCmd::Plugin(cmd) => cmd.process(tree),
            RootCmd::Version(opt) => opt.process(),
        }
    }
}

/// Run `cpo` with the arguments of this process; returns the exit code
pub async fn run() -> i32 {
    let args = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    run_with_args(args).await
}

/// Run `cpo` with `args`, program name first
pub async fn run_with_args(args: Vec<String>) -> i32 {
    let context = CliContext::open_default();
    let log_level = resolve_log_level(&args, context.as_ref().ok());
    init_logger(log_level.as_deref());

    let result = match context {
        Ok(context) => dispatch(&args, &context, log_level.as_deref()).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            report(&err, log_level.as_deref());
            1
        }
    }
}

/// `--log-level` from the command line, then `CPO_LOG_LEVEL`, then the
/// stored setting
fn resolve_log_level(args: &[String], context: Option<&CliContext>) -> Option<String> {
    let from_args = args.iter().enumerate().find_map(|(index, arg)| {
        if arg == "--log-level" {
            args.get(index + 1).cloned()
        } else {
            arg.strip_prefix("--log-level=").map(str::to_owned)
        }
    });
    from_args
        .or_else(|| std::env::var(CPO_LOG_LEVEL_ENV).ok())
        .or_else(|| {
            context.and_then(|context| {
                context
                    .store()
                    .get_setting::<String>(SETTING_LOG_LEVEL)
                    .ok()
                    .flatten()
            })
        })
        .filter(|level| LOG_LEVELS.contains(&level.as_str()))
}

/// Log to stderr. Without a level `RUST_LOG` applies, then `warn`.
fn init_logger(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

async fn dispatch(args: &[String], context: &CliContext, log_level: Option<&str>) -> Result<i32> {
    let tree = CommandTree::new(Cli::command(), installed_plugins()?);

    let words = args.get(1..).unwrap_or_default();
    if let Resolution::Plugin { leaf, args } = tree.resolve(words)? {
        debug!(command = leaf.name(), distribution = leaf.distribution(), "plug-in command");
        return Ok(run_plugin(leaf, &args, log_level)?);
    }

    match Cli::try_parse_from(args) {
        Ok(cli) => {
            cli.process(context, &tree).await?;
            Ok(0)
        }
        Err(err) => {
            // help and usage output should list plug-in commands too
            let err = match tree.augment(Cli::command())?.try_get_matches_from(args) {
                Err(augmented) => augmented,
                Ok(_) => err,
            };
            err.print()?;
            Ok(if err.use_stderr() { 1 } else { 0 })
        }
    }
}

fn report(err: &anyhow::Error, log_level: Option<&str>) {
    if let Some(usage) = err.downcast_ref::<clap::Error>() {
        let _ = usage.print();
        return;
    }
    if matches!(log_level, Some("debug" | "trace")) {
        eprintln!("Error: {err:?}");
    } else {
        eprintln!("Error: {err:#}");
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;

    fn parse(command: &str) -> Result<Cli, clap::error::Error> {
        Cli::try_parse_from(command.split_whitespace())
    }

    fn args(command: &str) -> Vec<String> {
        command.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn test_command_definitions() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_log_level() {
        let cli = parse("cpo cluster list --log-level debug").expect("valid command");
        assert_eq!(cli.global_opts.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, RootCmd::Cluster(ClusterCmd::List(_))));

        assert!(parse("cpo --log-level loud cluster list").is_err());
    }

    #[test]
    fn test_cluster_add() {
        let cli = parse(
            "cpo cluster add --server https://api.a:6443 --alias a --username u --password p",
        )
        .expect("valid command");
        assert!(matches!(cli.command, RootCmd::Cluster(ClusterCmd::Add(_))));
        assert!(parse("cpo cluster add --alias a").is_err());
        assert!(parse("cpo cluster add --server https://api.a:6443 --type nope").is_err());
    }

    #[test]
    fn test_storage_options_conflict() {
        assert!(parse("cpo cp4d install --storage-class a --storage-vendor b").is_err());
        assert!(
            parse("cpo cp4d install-service --service-name wkc -o spec.a=1 -o b=x").is_ok()
        );
    }

    #[test]
    fn test_log_level_resolution() {
        assert_eq!(
            resolve_log_level(&args("cpo --log-level trace cluster list"), None).as_deref(),
            Some("trace")
        );
        assert_eq!(
            resolve_log_level(&args("cpo cluster list --log-level=info"), None).as_deref(),
            Some("info")
        );

        let dir = tempfile::tempdir().expect("temp dir");
        let context = CliContext::new(std::sync::Arc::new(cpo_config::ClusterRegistry::open(
            dir.path(),
        )));
        context
            .store()
            .set_setting(SETTING_LOG_LEVEL, "debug")
            .expect("setting");
        if std::env::var_os(CPO_LOG_LEVEL_ENV).is_none() {
            assert_eq!(
                resolve_log_level(&args("cpo cluster list"), Some(&context)).as_deref(),
                Some("debug")
            );
        }
    }
}
