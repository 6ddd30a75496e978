//! Backup chain and rollback behavior across several updates.

use cmam_cli::core::{CmamError, ErrorKind};
use cmam_cli::lifecycle::RollbackOutcome;
use cmam_cli::test_utils::{MockRemote, TestRoot};

const FOO: &str = "x/foo";

async fn installed_through(versions: &[(&str, &[u8])]) -> (TestRoot, MockRemote) {
    let root = TestRoot::new();
    let remote = MockRemote::new();
    remote.add_app("foo", FOO);

    let engine = root.engine(remote.clone());
    for (i, (version, bytes)) in versions.iter().enumerate() {
        remote.publish(FOO, version, bytes);
        if i == 0 {
            engine.install("foo", None).await.unwrap();
        } else {
            engine.update("foo", None, true).await.unwrap();
        }
    }
    (root, remote)
}

fn listed_versions(outcome: RollbackOutcome) -> Vec<String> {
    match outcome {
        RollbackOutcome::Listed(backups) => backups.into_iter().map(|b| b.version).collect(),
        other => panic!("expected a listing, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rollback_round_trip_is_bit_exact() {
    let v1: &[u8] = b"\x00foo one\xff";
    let v2: &[u8] = b"\x01foo two\xfe";
    let (root, remote) = installed_through(&[("1.0.0", v1), ("2.0.0", v2)]).await;
    let engine = root.engine(remote);

    let first = engine.rollback("foo", Some("1.0.0")).await.unwrap();
    assert_eq!(
        first,
        RollbackOutcome::RolledBack {
            from: Some("2.0.0".into()),
            to: "1.0.0".into()
        }
    );
    assert_eq!(root.artifact_bytes("foo").as_deref(), Some(v1));

    let second = engine.rollback("foo", Some("2.0.0")).await.unwrap();
    assert!(matches!(second, RollbackOutcome::RolledBack { .. }));
    assert_eq!(root.artifact_bytes("foo").as_deref(), Some(v2));
    assert_eq!(root.registry().await.unwrap().version_of("foo"), Some("2.0.0"));
}

#[tokio::test]
async fn test_listing_is_newest_first_and_read_only() {
    let (root, remote) = installed_through(&[
        ("1.2.0", &b"a"[..]),
        ("1.10.0", &b"b"[..]),
        ("1.9.0-rc", &b"c"[..]),
        ("2.0.0", &b"d"[..]),
    ])
    .await;
    let engine = root.engine(remote);
    let registry_before = std::fs::read_to_string(root.layout().registry_path()).unwrap();

    let versions = listed_versions(engine.rollback("foo", None).await.unwrap());

    assert_eq!(versions, vec!["1.10.0", "1.9.0-rc", "1.2.0"]);
    let registry_after = std::fs::read_to_string(root.layout().registry_path()).unwrap();
    assert_eq!(registry_before, registry_after);
    assert_eq!(root.artifact_bytes("foo").as_deref(), Some(&b"d"[..]));
}

#[tokio::test]
async fn test_rollback_errors_are_not_found() {
    let (root, remote) = installed_through(&[("1.0.0", &b"a"[..]), ("2.0.0", &b"b"[..])]).await;
    let engine = root.engine(remote);

    let err = engine.rollback("foo", Some("0.5.0")).await.unwrap_err();
    assert!(matches!(err, CmamError::BackupNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = engine.rollback("bar", None).await.unwrap_err();
    assert!(matches!(err, CmamError::NoBackupsAvailable { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_rollback_needs_no_network() {
    let (root, remote) = installed_through(&[("1.0.0", &b"a"[..]), ("2.0.0", &b"b"[..])]).await;
    remote.make_catalog_unreachable();
    remote.set_offline(true);
    remote.fail_releases(FOO);

    root.engine(remote).rollback("foo", Some("1.0.0")).await.unwrap();

    assert_eq!(root.artifact_bytes("foo").as_deref(), Some(&b"a"[..]));
}

#[tokio::test]
async fn test_uninstall_keep_backups_then_rollback_reinstates() {
    let (root, remote) = installed_through(&[("1.0.0", &b"a"[..]), ("2.0.0", &b"b"[..])]).await;
    let engine = root.engine(remote);

    engine.uninstall("foo", true).await.unwrap();
    assert!(!root.registry().await.unwrap().contains("foo"));

    let outcome = engine.rollback("foo", Some("1.0.0")).await.unwrap();
    assert_eq!(
        outcome,
        RollbackOutcome::RolledBack {
            from: None,
            to: "1.0.0".into()
        }
    );
    assert_eq!(root.registry().await.unwrap().version_of("foo"), Some("1.0.0"));
    assert_eq!(root.artifact_bytes("foo").as_deref(), Some(&b"a"[..]));
}
