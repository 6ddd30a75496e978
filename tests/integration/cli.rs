//! The `cmam` binary against a seeded root. Nothing here needs a network.

use predicates::prelude::*;
use serial_test::serial;

use crate::common::CliRoot;
use cmam_cli::cli::{CommandContext, GlobalArgs};

#[test]
fn test_help_lists_lifecycle_commands() {
    let root = CliRoot::new();
    root.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("doctor"))
        .stdout(predicate::str::contains("self-update"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    let root = CliRoot::new();
    root.cmd().args(["-v", "-q", "list"]).assert().code(2);
}

#[test]
fn test_list_empty_root() {
    let root = CliRoot::new();
    root.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No apps installed."));
}

#[test]
fn test_list_flags_missing_artifact() {
    let root = CliRoot::new();
    root.seed_registry(&[("foo", "1.0.0"), ("bar", "2.1.0")]);
    root.seed_artifact("foo", b"foo");

    root.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("foo  1.0.0"))
        .stdout(predicate::str::contains("bar  2.1.0  (artifact missing)"))
        .stdout(predicate::str::contains("2 app(s)"));
}

#[test]
fn test_list_json() {
    let root = CliRoot::new();
    root.seed_registry(&[("foo", "1.0.0")]);

    let output = root.cmd().args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let apps: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(apps[0]["name"], "foo");
    assert_eq!(apps[0]["version"], "1.0.0");
    assert_eq!(apps[0]["artifact_present"], false);
}

#[test]
fn test_malformed_registry_exits_with_config_code() {
    let root = CliRoot::new();
    root.write(std::path::Path::new("registry.toml"), b"[packages.foo\nversion = ");

    root.cmd()
        .arg("list")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("registry"));
}

#[test]
fn test_config_path_show_and_set() {
    let root = CliRoot::new();
    let expected = root.root().join("config.toml");

    root.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));

    root.cmd()
        .args(["config", "set", "lifecycle.keep_backups", "false"])
        .assert()
        .success();
    assert!(expected.is_file());

    root.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keep_backups = false"));
}

#[test]
fn test_config_set_unknown_key() {
    let root = CliRoot::new();
    root.cmd()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("unknown key"));
}

#[test]
fn test_uninstall_not_installed_is_state_error() {
    let root = CliRoot::new();
    root.cmd()
        .args(["uninstall", "foo"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("cmam install foo"));
}

#[test]
fn test_uninstall_removes_artifact_entry_and_backups() {
    let root = CliRoot::new();
    root.seed_registry(&[("foo", "2.0.0"), ("bar", "1.0.0")]);
    root.seed_artifact("foo", b"foo v2");
    let backup = root.seed_backup("foo", "1.0.0", b"foo v1");

    root.cmd()
        .args(["uninstall", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalled foo 2.0.0"));

    assert!(root.artifact("foo").is_none());
    assert!(!backup.exists());
    let registry = root.registry_text();
    assert!(!registry.contains("[packages.foo]"));
    assert!(registry.contains("[packages.bar]"));
}

#[test]
fn test_rollback_without_backups_is_not_found() {
    let root = CliRoot::new();
    root.cmd().args(["rollback", "foo"]).assert().code(4);
}

#[test]
fn test_rollback_lists_then_restores() {
    let root = CliRoot::new();
    root.seed_registry(&[("foo", "2.0.0")]);
    root.seed_artifact("foo", b"foo v2");
    root.seed_backup("foo", "1.0.0", b"foo v1");

    root.cmd()
        .args(["rollback", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.0"));
    assert_eq!(root.artifact("foo").as_deref(), Some(&b"foo v2"[..]));

    root.cmd()
        .args(["rollback", "foo", "1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled back foo"));
    assert_eq!(root.artifact("foo").as_deref(), Some(&b"foo v1"[..]));
    assert!(root.registry_text().contains("version = \"1.0.0\""));

    root.cmd()
        .arg("backups")
        .assert()
        .success()
        .stdout(predicate::str::contains("2.0.0"));

    root.cmd().args(["rollback", "foo", "9.9.9"]).assert().code(4);
}

#[test]
fn test_backups_on_empty_root() {
    let root = CliRoot::new();
    root.cmd()
        .arg("backups")
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups."));
}

#[test]
fn test_export_then_import_same_state() {
    let root = CliRoot::new();
    root.seed_registry(&[("foo", "1.0.0")]);
    root.seed_artifact("foo", b"foo");

    root.cmd()
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"packages\""))
        .stdout(predicate::str::contains("\"foo\": \"1.0.0\""));

    let snapshot = root.scratch().join("apps.json");
    root.cmd().arg("export").arg(&snapshot).assert().success();
    assert!(snapshot.is_file());

    // Everything is already at the recorded version, so no request is made.
    root.cmd().arg("import").arg(&snapshot).assert().success();
}

#[test]
fn test_import_missing_file_fails() {
    let root = CliRoot::new();
    let missing = root.scratch().join("nope.json");
    root.cmd()
        .arg("import")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn test_clean_removes_orphans() {
    let root = CliRoot::new();
    root.seed_registry(&[("foo", "1.0.0")]);
    root.seed_artifact("foo", b"foo");
    let stray = root.seed_artifact("stray", b"stray!");

    root.cmd()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("removed orphan stray"));

    assert!(!stray.exists());
    assert!(root.artifact("foo").is_some());
}

#[test]
fn test_clean_refuses_unparsable_registry() {
    let root = CliRoot::new();
    root.write(std::path::Path::new("registry.toml"), b"not = [valid");
    let stray = root.seed_artifact("stray", b"stray!");

    root.cmd().arg("clean").assert().code(7);
    assert!(stray.exists());
}

#[test]
fn test_root_from_environment() {
    let root = CliRoot::new();
    root.seed_registry(&[("foo", "1.0.0")]);

    let mut cmd = assert_cmd::Command::cargo_bin("cmam").unwrap();
    cmd.env("CMAM_ROOT", root.root())
        .env("NO_COLOR", "1")
        .args(["list", "--no-progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("foo"));
}

#[tokio::test]
#[serial]
async fn test_context_reads_root_from_process_environment() {
    let root = CliRoot::new();
    // SAFETY: serialized with other tests that read CMAM_ROOT.
    unsafe { std::env::set_var("CMAM_ROOT", root.root()) };

    let ctx = CommandContext::load(&GlobalArgs {
        root: None,
        no_progress: true,
    })
    .await;

    unsafe { std::env::remove_var("CMAM_ROOT") };
    let ctx = ctx.unwrap();
    assert_eq!(ctx.layout.root(), root.root());
    assert_eq!(ctx.config_path, root.root().join("config.toml"));
    assert!(!ctx.progress);
}

#[tokio::test]
#[serial]
async fn test_flag_overrides_configured_root() {
    let root = CliRoot::new();
    let elsewhere = root.scratch().join("relocated");
    root.write(
        std::path::Path::new("config.toml"),
        format!("install_root = {:?}\n", elsewhere.display().to_string()).as_bytes(),
    );

    let from_config = CommandContext::load(&GlobalArgs {
        root: Some(root.root()),
        no_progress: true,
    })
    .await
    .unwrap();

    // --root decides where the config is read from and also wins over it.
    assert_eq!(from_config.layout.root(), root.root());
    assert_eq!(from_config.config.expanded_install_root(), Some(elsewhere));
}
