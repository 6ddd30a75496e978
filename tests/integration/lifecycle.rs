//! Lifecycle scenarios over a temporary root and an in-memory remote.

use cmam_cli::core::{CmamError, ErrorKind};
use cmam_cli::fetch::Verification;
use cmam_cli::lifecycle::UpdateOutcome;
use cmam_cli::test_utils::{ChecksumMode, MockRemote, RecordingSink, TestRoot};
use cmam_cli::version::Version;

const FOO: &str = "x/foo";

fn foo_remote() -> MockRemote {
    let remote = MockRemote::new();
    remote.add_app("foo", FOO);
    remote
}

/// The full install -> reinstall -> noop update -> uninstall walk.
#[tokio::test]
async fn test_foo_lifecycle_walkthrough() {
    let root = TestRoot::new();
    let remote = foo_remote();
    remote.publish(FOO, "1.0.0", b"foo binary v1");
    let engine = root.engine(remote.clone());

    let installed = engine.install("foo", None).await.unwrap();
    assert_eq!(installed.version, "1.0.0");
    assert_eq!(installed.verification, Verification::Verified);
    assert_eq!(
        root.registry().await.unwrap().versions().into_iter().collect::<Vec<_>>(),
        vec![("foo".to_string(), "1.0.0".to_string())]
    );

    let err = engine.install("foo", None).await.unwrap_err();
    assert!(matches!(err, CmamError::AlreadyInstalled { .. }));
    assert_eq!(err.kind(), ErrorKind::State);

    let noop = engine.update("foo", Some("1.0.0"), true).await.unwrap();
    assert_eq!(noop, UpdateOutcome::UpToDate { version: "1.0.0".into() });

    let removed = engine.uninstall("foo", false).await.unwrap();
    assert!(removed.artifact_removed);
    assert!(root.registry().await.unwrap().is_empty());
    assert!(root.artifact_bytes("foo").is_none());

    let err = engine.update("foo", None, true).await.unwrap_err();
    assert!(matches!(err, CmamError::NotInstalled { .. }));
}

#[tokio::test]
async fn test_noop_update_touches_neither_registry_nor_backups() {
    let root = TestRoot::new();
    let remote = foo_remote();
    remote.publish(FOO, "1.0.0", b"foo binary v1");
    let engine = root.engine(remote.clone());
    engine.install("foo", None).await.unwrap();
    let before = std::fs::read_to_string(root.layout().registry_path()).unwrap();

    engine.update("foo", Some("v1.0.0"), true).await.unwrap();

    let after = std::fs::read_to_string(root.layout().registry_path()).unwrap();
    assert_eq!(before, after);
    assert!(engine.list_backups("foo").await.unwrap().is_empty());
    assert_eq!(remote.downloads().len(), 1);
}

#[tokio::test]
async fn test_truncated_install_leaves_no_trace() {
    let root = TestRoot::new();
    let remote = foo_remote();
    remote.publish(FOO, "1.0.0", &[7u8; 64]);
    remote.truncate_artifact(FOO, "1.0.0", 20);

    let err = root.engine(remote).install("foo", None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!root.registry().await.unwrap().contains("foo"));
    assert!(!root.layout().artifact_path("foo").exists());
    assert!(root.staging_files().is_empty());
}

#[tokio::test]
async fn test_truncated_body_of_unknown_length_fails_checksum() {
    let root = TestRoot::new();
    let remote = foo_remote();
    remote.publish(FOO, "1.0.0", &[7u8; 64]);
    remote.truncate_artifact(FOO, "1.0.0", 20);
    remote.hide_length(&MockRemote::artifact_url(FOO, "1.0.0"));

    let err = root.engine(remote).install("foo", None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(!root.layout().artifact_path("foo").exists());
    assert!(root.staging_files().is_empty());
}

#[tokio::test]
async fn test_pinned_install_rejects_other_version() {
    let root = TestRoot::new();
    let remote = foo_remote();
    remote.publish(FOO, "1.1.0", b"foo v1.1");
    remote.redirect_tag(FOO, "1.0.0", "1.1.0");

    let err = root.engine(remote.clone()).install("foo", Some("1.0.0")).await.unwrap_err();

    match err {
        CmamError::VersionMismatch { requested, resolved, .. } => {
            assert_eq!(requested, "1.0.0");
            assert_eq!(resolved, "1.1.0");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(remote.downloads().is_empty());
    assert!(!root.registry().await.unwrap().contains("foo"));
}

#[tokio::test]
async fn test_checksum_gate_on_install_and_update() {
    let root = TestRoot::new();
    let remote = foo_remote();
    let bogus = ChecksumMode::Fixed(format!("sha256:{}", "a".repeat(64)));

    remote.publish_with(FOO, "1.0.0", b"tampered v1", bogus.clone());
    let engine = root.engine(remote.clone());
    let err = engine.install("foo", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(root.artifact_bytes("foo").is_none());

    remote.publish(FOO, "1.0.0", b"genuine v1");
    engine.install("foo", None).await.unwrap();

    remote.publish_with(FOO, "2.0.0", b"tampered v2", bogus);
    let err = engine.update("foo", None, true).await.unwrap_err();
    assert!(matches!(err, CmamError::ChecksumMismatch { .. }));
    assert_eq!(root.artifact_bytes("foo").as_deref(), Some(&b"genuine v1"[..]));
    assert_eq!(root.registry().await.unwrap().version_of("foo"), Some("1.0.0"));
    assert!(root.staging_files().is_empty());
}

#[tokio::test]
async fn test_update_then_repair_keeps_version() {
    let root = TestRoot::new();
    let remote = foo_remote();
    remote.publish(FOO, "1.0.0", b"foo v1");
    let engine = root.engine(remote.clone());
    engine.install("foo", None).await.unwrap();
    remote.publish(FOO, "1.2.0", b"foo v1.2");
    engine.update("foo", None, true).await.unwrap();

    // A newer release exists; repair must still reinstall the recorded one.
    remote.publish(FOO, "1.10.0", b"foo v1.10");
    root.write_artifact("foo", b"corrupted");
    let repaired = engine.repair("foo").await.unwrap();

    assert_eq!(repaired.version, "1.2.0");
    assert_eq!(root.artifact_bytes("foo").as_deref(), Some(&b"foo v1.2"[..]));
    assert_eq!(root.registry().await.unwrap().version_of("foo"), Some("1.2.0"));
}

#[tokio::test]
async fn test_update_reports_progress_to_sink() {
    let root = TestRoot::new();
    let remote = foo_remote();
    remote.publish(FOO, "1.0.0", b"foo v1");
    root.engine(remote.clone()).install("foo", None).await.unwrap();
    remote.publish(FOO, "2.0.0", b"foo v2, somewhat longer");

    let sink = RecordingSink::new();
    root.engine_with_sink(remote, sink.clone()).update("foo", None, true).await.unwrap();

    let phases = sink.phases();
    assert_eq!(phases.first(), Some(&"resolving"));
    assert_eq!(phases.last(), Some(&"done"));
    assert!(phases.contains(&"backing up"));
    let last_percent = sink.events().iter().filter_map(|e| e.percent()).last();
    assert_eq!(last_percent, Some(100));
}

#[test]
fn test_version_ordering_is_a_total_order() {
    let ordered = [
        "0.9.9",
        "1.0.0-alpha",
        "1.0.0-beta",
        "1.0.0-rc",
        "1.0.0",
        "1.0.1",
        "1.2.0",
        "1.10.0",
        "2.0.0-alpha",
        "2.0.0",
    ];
    let parsed: Vec<Version> = ordered.iter().map(|v| Version::parse(v).unwrap()).collect();

    for (i, a) in parsed.iter().enumerate() {
        for (j, b) in parsed.iter().enumerate() {
            assert_eq!(a.cmp(b), i.cmp(&j), "{} vs {}", ordered[i], ordered[j]);
        }
    }
}

#[test]
fn test_unknown_prerelease_tag_is_rejected() {
    assert!(Version::parse("1.0.0-nightly").is_err());
    assert!(Version::parse("not-a-version").is_err());
}
