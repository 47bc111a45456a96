//! Integration tests for the `kn` binary entry point.
//!
//! Each test points the configuration at a fresh temporary directory so the
//! user's real context cache is never touched.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

fn kn(home: &TempDir) -> assert_cmd::Command {
    let mut command = cargo_bin_cmd!("kn");
    command
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("KN_CONFIG_DIR", home.path().join("kn"))
        .env("KN_PLUGINS_DIR", home.path().join("plugins"))
        .env_remove("KN_NO_CONTEXT_SHARING");
    command
}

#[test]
fn help_lists_builtin_commands() {
    let home = TempDir::new().expect("temp dir");
    kn(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("context").and(contains("plugin")));
}

#[test]
fn context_round_trips_through_the_cache() {
    let home = TempDir::new().expect("temp dir");
    kn(&home)
        .args(["context", "set", "service=hello"])
        .assert()
        .success();
    assert!(home.path().join("kn").join("context.json").is_file());
    kn(&home)
        .args(["context", "get"])
        .assert()
        .success()
        .stdout(contains("\"service\": \"hello\""));
}

#[test]
fn unknown_command_exits_with_failure() {
    let home = TempDir::new().expect("temp dir");
    kn(&home)
        .args(["route", "list"])
        .assert()
        .failure()
        .stderr(contains("unknown command 'route list'"));
}

#[test]
fn disabled_context_sharing_rejects_mutation() {
    let home = TempDir::new().expect("temp dir");
    kn(&home)
        .env("KN_NO_CONTEXT_SHARING", "true")
        .args(["context", "set", "service=hello"])
        .assert()
        .failure()
        .stderr(contains("context sharing is disabled"));
}

#[test]
fn opt_out_switch_rejects_mutation() {
    let home = TempDir::new().expect("temp dir");
    kn(&home)
        .args(["--no-context-sharing", "context", "set", "service=hello"])
        .assert()
        .failure()
        .stderr(contains("context sharing is disabled"));
}

#[test]
fn configuration_flags_precede_the_command() {
    let home = TempDir::new().expect("temp dir");
    let other = home.path().join("elsewhere");
    kn(&home)
        .arg("--config-dir")
        .arg(&other)
        .args(["context", "set", "namespace=stage"])
        .assert()
        .success();
    assert!(other.join("context.json").is_file());
}
