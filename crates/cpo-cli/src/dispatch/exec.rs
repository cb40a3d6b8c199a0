use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use cpo_types::defaults::CPO_LOG_LEVEL_ENV;

use crate::error::{DispatchError, Result};

use super::CommandLeaf;

/// Locate a plug-in program: paths with a separator are relative to the
/// declaring module, bare names are looked up on `PATH` and then next to
/// the module.
fn find_program(leaf: &CommandLeaf, program: &str) -> Result<PathBuf> {
    let dir = leaf
        .exec()
        .map(|exec| exec.dir.clone())
        .unwrap_or_default();
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        let path = dir.join(program);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(not_found(leaf, program))
        };
    }
    which::which(program)
        .or_else(|_| which::which_in(program, Some(&dir), "."))
        .map_err(|_| not_found(leaf, program))
}

fn not_found(leaf: &CommandLeaf, program: &str) -> DispatchError {
    DispatchError::PluginNotFound {
        program: program.to_owned(),
        distribution: leaf.distribution().to_owned(),
    }
}

/// Run a plug-in command and return the exit code the CLI should use
pub fn run_plugin(leaf: &CommandLeaf, args: &[String], log_level: Option<&str>) -> Result<i32> {
    let Some((program, fixed_args)) = leaf.exec().and_then(|exec| exec.argv.split_first()) else {
        return Err(not_found(leaf, leaf.name()));
    };
    let path = find_program(leaf, program)?;
    debug!(
        command = leaf.name(),
        distribution = leaf.distribution(),
        "launching plug-in: {} {}",
        path.display(),
        args.join(" ")
    );

    let mut command = Command::new(&path);
    command.args(fixed_args).args(args);
    if let Some(level) = log_level {
        command.env(CPO_LOG_LEVEL_ENV, level);
    }
    let status = command.status()?;

    if let Some(code) = status.code() {
        return Ok(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            eprintln!("Plug-in killed via {signal} signal");
            return Ok(128 + signal);
        }
    }

    Ok(1)
}

#[cfg(test)]
mod test {
    use std::fs;

    use crate::dispatch::package::test::{write_distribution, write_module};
    use crate::dispatch::{CommandNode, CommandTree, discover_plugins};

    use super::*;

    fn leaf_of<'a>(tree: &'a CommandTree, name: &str) -> &'a CommandLeaf {
        match tree.root().child(name).expect("children") {
            Some(CommandNode::Leaf(leaf)) => leaf,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_is_forwarded() {
        let root = tempfile::tempdir().expect("tempdir");
        let package = write_distribution(root.path(), "p1", "");
        write_module(&package, "codes.json", &[("fail", &["sh", "-c", "exit \"$0\""])]);

        let plugins = discover_plugins(&[root.path().to_owned()]).expect("discover");
        let tree = CommandTree::new(clap::Command::new("cpo"), &plugins);
        let code = run_plugin(leaf_of(&tree, "fail"), &["7".to_owned()], None).expect("run");
        assert_eq!(code, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_program_runs_from_module_dir() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().expect("tempdir");
        let package = write_distribution(root.path(), "p1", "");
        let script = package.join("hello.sh");
        fs::write(&script, "#!/bin/sh\n[ \"$CPO_LOG_LEVEL\" = debug ] || exit 3\nexit 0\n")
            .expect("write");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");
        write_module(&package, "hello.json", &[("hello", &["./hello.sh"])]);

        let plugins = discover_plugins(&[root.path().to_owned()]).expect("discover");
        let tree = CommandTree::new(clap::Command::new("cpo"), &plugins);
        let code = run_plugin(leaf_of(&tree, "hello"), &[], Some("debug")).expect("run");
        assert_eq!(code, 0);
    }

    #[test]
    fn test_missing_program() {
        let root = tempfile::tempdir().expect("tempdir");
        let package = write_distribution(root.path(), "p1", "");
        write_module(&package, "gone.json", &[("gone", &["cpo-no-such-program-anywhere"])]);

        let plugins = discover_plugins(&[root.path().to_owned()]).expect("discover");
        let tree = CommandTree::new(clap::Command::new("cpo"), &plugins);
        let err = run_plugin(leaf_of(&tree, "gone"), &[], None).expect_err("missing");
        assert!(matches!(err, DispatchError::PluginNotFound { distribution, .. } if distribution == "p1"));
    }
}
