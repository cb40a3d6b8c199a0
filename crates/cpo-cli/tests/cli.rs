// End-to-end runs of the `cpo` binary against a temporary data directory.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;

fn cpo(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cpo").expect("cpo binary");
    cmd.env("CPO_HOME", home)
        .env_remove("CPO_PLUGIN_PATH")
        .env_remove("CPO_LOG_LEVEL")
        .env_remove("RUST_LOG");
    cmd
}

fn run(home: &Path, line: &str) -> assert_cmd::assert::Assert {
    cpo(home).args(line.split_whitespace()).assert()
}

#[test]
fn register_and_switch_clusters() {
    let home = tempfile::tempdir().expect("temp dir");
    let home = home.path();

    run(home, "cluster add --server https://api.a:6443 --alias a --username u --password p")
        .success();
    run(home, "cluster add --server https://api.b:6443 --alias b --username u --password p")
        .success();

    run(home, "cluster use a").success();
    run(home, "cluster current")
        .success()
        .stdout("https://api.a:6443\n");

    run(home, "cluster use b").success();
    run(home, "cluster current")
        .success()
        .stdout("https://api.b:6443\n");

    run(home, "cluster remove b").success();
    run(home, "cluster current").success().stdout("");

    run(home, "cluster list")
        .success()
        .stdout(predicate::str::contains("https://api.a:6443"))
        .stdout(predicate::str::contains("https://api.b:6443").not());
}

#[test]
fn alias_collision_leaves_registry_untouched() {
    let home = tempfile::tempdir().expect("temp dir");
    let home = home.path();

    run(home, "cluster add --server https://api.a:6443 --alias a --username u --password p")
        .success();
    let before = fs::read(home.join("clusters.json")).expect("registry file");

    run(home, "cluster add --server https://api.c:6443 --alias a --username u --password p")
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Alias a is already in use"));

    let after = fs::read(home.join("clusters.json")).expect("registry file");
    assert_eq!(before, after);
}

#[test]
fn unknown_cluster_is_reported() {
    let home = tempfile::tempdir().expect("temp dir");
    run(home.path(), "cluster use nope")
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error: "))
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn settings_round_trip() {
    let home = tempfile::tempdir().expect("temp dir");
    let home = home.path();

    run(home, "settings set watch_timeout_seconds 600").success();
    run(home, "settings get watch_timeout_seconds")
        .success()
        .stdout("600\n");
    run(home, "settings unset watch_timeout_seconds").success();
    run(home, "settings get watch_timeout_seconds").success().stdout("");
    run(home, "settings set watch_timeout_seconds soon").failure().code(1);
}

fn install_plugin(home: &Path) {
    let distribution = home.join("plugins").join("greeter");
    let package = distribution.join("commands");
    fs::create_dir_all(&package).expect("mkdir");
    fs::write(
        distribution.join("distribution.json"),
        json!({
            "name": "greeter",
            "version": "0.1.0",
            "entry_points": {"cpo.plugins": {"commands": "commands"}},
        })
        .to_string(),
    )
    .expect("write");
    fs::write(package.join("package.json"), json!({"doc": "cluster"}).to_string())
        .expect("write");
    fs::write(
        package.join("greet.json"),
        json!({"commands": {"say_hello": {
            "help": "Greet someone",
            "exec": ["sh", "-c", "echo \"hello $* $CPO_LOG_LEVEL\"", "sh"],
        }}})
        .to_string(),
    )
    .expect("write");
}

#[cfg(unix)]
#[test]
fn plugin_commands_run_and_show_in_help() {
    let home = tempfile::tempdir().expect("temp dir");
    let home = home.path();
    install_plugin(home);

    run(home, "--log-level info cluster say-hello world")
        .success()
        .stdout("hello world info\n");

    run(home, "cluster --help")
        .success()
        .stdout(predicate::str::contains("say-hello"))
        .stdout(predicate::str::contains("(plug-in: greeter)"));

    run(home, "plugin list")
        .success()
        .stdout(predicate::str::contains("say-hello"));
}

#[test]
fn version_is_printed() {
    let home = tempfile::tempdir().expect("temp dir");
    run(home.path(), "--version")
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    run(home.path(), "version")
        .success()
        .stdout(predicate::str::contains("Cloud Pak Operations CLI"));
}
