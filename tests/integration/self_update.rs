//! Replacing the manager binary.

use cmam_cli::core::ErrorKind;
use cmam_cli::lifecycle::{NullSink, SelfUpdateOptions, SelfUpdateOutcome, SelfUpdater};
use cmam_cli::test_utils::{ChecksumMode, MockRemote, TestRoot};

const REPO: &str = "cmerk2021/cmam";

fn updater(root: &TestRoot) -> SelfUpdater {
    let dir = root.scratch();
    std::fs::create_dir_all(&dir).unwrap();
    let exe = dir.join("cmam.exe");
    std::fs::write(&exe, b"running build").unwrap();
    SelfUpdater::new(REPO, ".exe", exe, "0.3.0")
}

#[tokio::test]
async fn test_self_update_replaces_binary() {
    let root = TestRoot::new();
    let remote = MockRemote::new();
    remote.publish(REPO, "0.4.0", b"next build");
    let updater = updater(&root);

    let outcome = updater.run(&remote, &SelfUpdateOptions::default(), &NullSink).await.unwrap();

    assert!(matches!(outcome, SelfUpdateOutcome::Updated { ref to, .. } if to == "0.4.0"));
    assert_eq!(std::fs::read(updater.executable()).unwrap(), b"next build");
}

#[tokio::test]
async fn test_self_update_rejects_bad_checksum() {
    let root = TestRoot::new();
    let remote = MockRemote::new();
    remote.publish_with(
        REPO,
        "0.4.0",
        b"malicious build",
        ChecksumMode::Fixed(format!("sha256:{}", "b".repeat(64))),
    );
    let updater = updater(&root);

    let err = updater.run(&remote, &SelfUpdateOptions::default(), &NullSink).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(std::fs::read(updater.executable()).unwrap(), b"running build");
    let leftovers: Vec<_> = std::fs::read_dir(root.scratch())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name())
        .collect();
    assert_eq!(leftovers.len(), 1, "staging file left behind: {leftovers:?}");
}

#[tokio::test]
async fn test_self_update_check_and_up_to_date() {
    let root = TestRoot::new();
    let remote = MockRemote::new();
    remote.publish(REPO, "0.4.0", b"next build");
    let updater = updater(&root);

    let check = SelfUpdateOptions {
        check_only: true,
        ..SelfUpdateOptions::default()
    };
    let outcome = updater.run(&remote, &check, &NullSink).await.unwrap();
    assert_eq!(
        outcome,
        SelfUpdateOutcome::Available {
            current: "0.3.0".into(),
            latest: "0.4.0".into()
        }
    );
    assert!(remote.downloads().is_empty());

    remote.publish(REPO, "0.3.0", b"same build");
    let outcome = updater.run(&remote, &SelfUpdateOptions::default(), &NullSink).await.unwrap();
    assert!(matches!(outcome, SelfUpdateOutcome::UpToDate { .. }));
}

#[tokio::test]
async fn test_self_update_pinned_release_must_match() {
    let root = TestRoot::new();
    let remote = MockRemote::new();
    remote.publish(REPO, "0.5.0", b"later build");
    remote.redirect_tag(REPO, "0.4.0", "0.5.0");
    let updater = updater(&root);

    let pinned = SelfUpdateOptions {
        target_version: Some("0.4.0".into()),
        ..SelfUpdateOptions::default()
    };
    let err = updater.run(&remote, &pinned, &NullSink).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::State);
    assert!(err.to_string().contains("0.5.0"), "{err}");
    assert!(remote.downloads().is_empty());
    assert_eq!(std::fs::read(updater.executable()).unwrap(), b"running build");
}
