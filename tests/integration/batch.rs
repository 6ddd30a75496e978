//! `update --all` and snapshot import.

use cmam_cli::core::ErrorKind;
use cmam_cli::lifecycle::{BatchOptions, BatchOutcome, Snapshot};
use cmam_cli::test_utils::{MockRemote, TestRoot};

/// Three installed apps at 1.0.0, each with a 2.0.0 published afterwards.
async fn three_apps(root: &TestRoot) -> MockRemote {
    let remote = MockRemote::new();
    for app in ["alpha", "bravo", "charlie"] {
        let locator = format!("x/{app}");
        remote.add_app(app, &locator);
        remote.publish(&locator, "1.0.0", format!("{app} v1").as_bytes());
    }
    let engine = root.engine(remote.clone());
    for app in ["alpha", "bravo", "charlie"] {
        engine.install(app, None).await.unwrap();
    }
    for app in ["alpha", "bravo", "charlie"] {
        remote.publish(&format!("x/{app}"), "2.0.0", format!("{app} v2").as_bytes());
    }
    remote
}

#[tokio::test]
async fn test_failure_in_one_app_does_not_stop_the_batch() {
    let root = TestRoot::new();
    let remote = MockRemote::new();
    remote.add_app("a", "x/a");
    remote.add_app("b", "x/b");
    remote.publish("x/a", "1.0.0", b"a1");
    remote.publish("x/b", "1.0.0", b"b1");
    let engine = root.engine(remote.clone());
    engine.install("a", None).await.unwrap();
    engine.install("b", None).await.unwrap();

    remote.publish("x/a", "1.1.0", b"a2");
    remote.fail_releases("x/b");
    let report = engine.update_all(BatchOptions::default()).await.unwrap();

    assert_eq!(report.success_count(), 1);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.items[0].name, "a");
    assert_eq!(
        report.items[0].outcome,
        BatchOutcome::Updated {
            from: "1.0.0".into(),
            to: "1.1.0".into()
        }
    );
    assert!(matches!(
        report.items[1].outcome,
        BatchOutcome::Failed { kind: ErrorKind::Transport, .. }
    ));
    assert_eq!(root.artifact_bytes("a").as_deref(), Some(&b"a2"[..]));
    assert_eq!(root.artifact_bytes("b").as_deref(), Some(&b"b1"[..]));
}

#[tokio::test]
async fn test_fail_fast_marks_rest_not_attempted() {
    let root = TestRoot::new();
    let remote = three_apps(&root).await;
    remote.fail_releases("x/bravo");

    let report = root
        .engine(remote)
        .update_all(BatchOptions {
            skip_on_error: false,
            keep_backups: true,
        })
        .await
        .unwrap();

    let outcomes: Vec<_> = report.items.iter().map(|i| (i.name.as_str(), &i.outcome)).collect();
    assert!(matches!(outcomes[0], ("alpha", BatchOutcome::Updated { .. })));
    assert!(matches!(outcomes[1], ("bravo", BatchOutcome::Failed { .. })));
    assert!(matches!(outcomes[2], ("charlie", BatchOutcome::NotAttempted)));
    assert_eq!(root.registry().await.unwrap().version_of("charlie"), Some("1.0.0"));
}

#[tokio::test]
async fn test_update_all_skips_older_latest() {
    let root = TestRoot::new();
    let remote = three_apps(&root).await;
    remote.set_latest("x/charlie", "1.0.0");
    remote.publish("x/bravo", "0.9.0", b"bravo old");

    let report = root.engine(remote).update_all(BatchOptions::default()).await.unwrap();

    let changed: Vec<_> = report.changed().map(|i| i.name.as_str()).collect();
    assert_eq!(changed, vec!["alpha"]);
    assert!(!report.has_failures());
    let registry = root.registry().await.unwrap();
    assert_eq!(registry.version_of("bravo"), Some("1.0.0"));
    assert_eq!(registry.version_of("charlie"), Some("1.0.0"));
}

#[tokio::test]
async fn test_update_all_unreachable_catalog_fails_every_app() {
    let root = TestRoot::new();
    let remote = three_apps(&root).await;
    remote.make_catalog_unreachable();

    let report = root.engine(remote).update_all(BatchOptions::default()).await.unwrap();

    assert_eq!(report.items.len(), 3);
    assert_eq!(report.failure_count(), 3);
    assert_eq!(report.success_count(), 0);
    for item in &report.items {
        assert!(
            matches!(item.outcome, BatchOutcome::Failed { kind: ErrorKind::Transport, .. }),
            "{} was {:?}",
            item.name,
            item.outcome
        );
    }
    assert_eq!(root.artifact_bytes("alpha").as_deref(), Some(&b"alpha v1"[..]));
}

#[tokio::test]
async fn test_update_all_unreachable_catalog_with_fail_fast() {
    let root = TestRoot::new();
    let remote = three_apps(&root).await;
    remote.make_catalog_unreachable();

    let options = BatchOptions {
        skip_on_error: false,
        ..BatchOptions::default()
    };
    let report = root.engine(remote).update_all(options).await.unwrap();

    assert_eq!(report.failure_count(), 1);
    assert!(report.items[0].outcome.is_failure());
    assert!(report.items[1..].iter().all(|i| i.outcome == BatchOutcome::NotAttempted));
}

#[tokio::test]
async fn test_import_unreachable_catalog_fails_only_apps_that_need_it() {
    let root = TestRoot::new();
    let remote = three_apps(&root).await;
    let snapshot = Snapshot::of(&root.registry().await.unwrap());
    let engine = root.engine(remote.clone());
    engine.update("alpha", None, false).await.unwrap();
    remote.make_catalog_unreachable();

    let report = engine.import(&snapshot, BatchOptions::default()).await.unwrap();

    assert_eq!(report.items.len(), 3);
    assert_eq!(report.failure_count(), 1);
    let alpha = report.items.iter().find(|i| i.name == "alpha").unwrap();
    assert!(matches!(alpha.outcome, BatchOutcome::Failed { kind: ErrorKind::Transport, .. }));
    assert!(
        report
            .items
            .iter()
            .filter(|i| i.name != "alpha")
            .all(|i| matches!(i.outcome, BatchOutcome::UpToDate { .. }))
    );
    assert_eq!(root.registry().await.unwrap().version_of("alpha"), Some("2.0.0"));
}

#[tokio::test]
async fn test_export_import_reproduces_installation() {
    let source = TestRoot::new();
    let remote = three_apps(&source).await;
    let source_engine = source.engine(remote.clone());
    source_engine.update("bravo", None, false).await.unwrap();

    let snapshot = Snapshot::of(&source.registry().await.unwrap());
    let path = source.scratch().join("snapshot.json");
    std::fs::create_dir_all(source.scratch()).unwrap();
    snapshot.write(&path).await.unwrap();

    let target = TestRoot::new();
    let loaded = Snapshot::read(&path).await.unwrap();
    let report = target.engine(remote).import(&loaded, BatchOptions::default()).await.unwrap();

    assert_eq!(report.failure_count(), 0);
    assert_eq!(target.registry().await.unwrap().versions(), source.registry().await.unwrap().versions());
    assert_eq!(target.artifact_bytes("bravo").as_deref(), Some(&b"bravo v2"[..]));
    assert_eq!(target.artifact_bytes("alpha").as_deref(), Some(&b"alpha v1"[..]));
}

#[tokio::test]
async fn test_import_tallies_unknown_apps() {
    let root = TestRoot::new();
    let remote = three_apps(&root).await;
    let snapshot = Snapshot::from_json(
        r#"{
            "exported_at": "2025-01-01T00:00:00Z",
            "packages": { "alpha": "2.0.0", "ghost": "1.0.0" }
        }"#,
    )
    .unwrap();

    let report = root.engine(remote).import(&snapshot, BatchOptions::default()).await.unwrap();

    assert_eq!(report.success_count(), 1);
    assert!(matches!(
        report.items.iter().find(|i| i.name == "ghost").map(|i| &i.outcome),
        Some(BatchOutcome::Failed { kind: ErrorKind::NotFound, .. })
    ));
    assert_eq!(root.registry().await.unwrap().version_of("alpha"), Some("2.0.0"));
}

#[tokio::test]
async fn test_import_of_current_state_is_offline_noop() {
    let root = TestRoot::new();
    let remote = three_apps(&root).await;
    let snapshot = Snapshot::of(&root.registry().await.unwrap());
    remote.make_catalog_unreachable();

    let report = root.engine(remote).import(&snapshot, BatchOptions::default()).await.unwrap();

    assert_eq!(report.items.len(), 3);
    assert!(report.items.iter().all(|i| matches!(i.outcome, BatchOutcome::UpToDate { .. })));
}
