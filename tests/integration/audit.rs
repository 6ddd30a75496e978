//! Auditor over a root that drifts away from the registry.

use cmam_cli::audit::{
    CheckStatus, CleanOptions, DoctorOptions, Health, InvalidReason, TrustLevel, UnknownReason,
    ValidationStatus,
};
use cmam_cli::test_utils::{ChecksumMode, MockRemote, StaticPathRegistrar, TestRoot};

const WIDGET: &str = "x/cmamwidget";
const GADGET: &str = "x/cmamgadget";

async fn two_apps() -> (TestRoot, MockRemote) {
    let root = TestRoot::new();
    let remote = MockRemote::new();
    remote.add_app("cmamwidget", WIDGET);
    remote.add_app("cmamgadget", GADGET);
    remote.publish(WIDGET, "1.0.0", b"widget v1");
    remote.publish(GADGET, "3.1.0", b"gadget v3.1");
    let engine = root.engine(remote.clone());
    engine.install("cmamwidget", None).await.unwrap();
    engine.install("cmamgadget", None).await.unwrap();
    (root, remote)
}

fn quiet_doctor() -> DoctorOptions {
    DoctorOptions { min_free_bytes: 0 }
}

#[tokio::test]
async fn test_fresh_installation_is_valid_trusted_and_healthy() {
    let (root, remote) = two_apps().await;
    let engine = root.engine(remote);
    let auditor = engine.auditor();

    let report = auditor.validate().await.unwrap();
    assert_eq!(report.valid_count(), 2);
    assert!(report.is_clean());

    let trust = auditor.trust().await.unwrap();
    assert!(trust.iter().all(|app| app.trust == TrustLevel::Trusted));

    let doctor = auditor.doctor(&StaticPathRegistrar::new(true), quiet_doctor()).await;
    assert_eq!(doctor.health(), Health::Healthy, "{:?}", doctor.checks);
}

#[tokio::test]
async fn test_tampering_is_invalid_and_untrusted() {
    let (root, remote) = two_apps().await;
    root.write_artifact("cmamwidget", b"widget v1 plus payload");
    let engine = root.engine(remote);

    let report = engine.auditor().validate().await.unwrap();
    let widget = report.apps.iter().find(|a| a.name == "cmamwidget").unwrap();
    assert!(matches!(
        widget.status,
        ValidationStatus::Invalid(InvalidReason::Mismatch { .. })
    ));
    assert_eq!(report.invalid_count(), 1);
    assert!(!report.is_clean());

    let trust = engine.auditor().trust().await.unwrap();
    let widget = trust.iter().find(|a| a.name == "cmamwidget").unwrap();
    assert_eq!(widget.trust, TrustLevel::Untrusted);
}

#[tokio::test]
async fn test_delisted_app_is_unknown_source_not_untrusted() {
    let (root, remote) = two_apps().await;
    remote.remove_app("cmamgadget");
    let engine = root.engine(remote);

    let report = engine.auditor().validate().await.unwrap();
    let gadget = report.apps.iter().find(|a| a.name == "cmamgadget").unwrap();
    assert_eq!(gadget.status, ValidationStatus::Unknown(UnknownReason::NotInCatalog));
    assert!(report.is_clean());

    let trust = engine.auditor().trust().await.unwrap();
    let gadget = trust.iter().find(|a| a.name == "cmamgadget").unwrap();
    assert_eq!(gadget.trust, TrustLevel::UnknownSource);
}

#[tokio::test]
async fn test_unpublished_checksum_is_unknown() {
    let root = TestRoot::new();
    let remote = MockRemote::new();
    remote.add_app("cmamwidget", WIDGET);
    remote.publish_with(WIDGET, "1.0.0", b"widget v1", ChecksumMode::Missing);
    let engine = root.engine(remote);
    engine.install("cmamwidget", None).await.unwrap();

    let report = engine.auditor().validate().await.unwrap();
    assert_eq!(report.apps[0].status, ValidationStatus::Unknown(UnknownReason::NoChecksum));
    assert_eq!(report.unknown_count(), 1);
}

#[tokio::test]
async fn test_offline_validation_degrades_to_unknown() {
    let (root, remote) = two_apps().await;
    remote.make_catalog_unreachable();

    let report = root.engine(remote).auditor().validate().await.unwrap();

    assert_eq!(report.unknown_count(), 2);
    assert!(report.apps.iter().all(|a| matches!(
        a.status,
        ValidationStatus::Unknown(UnknownReason::RemoteUnavailable { .. })
    )));
}

#[tokio::test]
async fn test_doctor_separates_issues_from_warnings() {
    let (root, remote) = two_apps().await;
    std::fs::remove_file(root.layout().artifact_path("cmamgadget")).unwrap();
    root.write_artifact("cmamstray", b"nobody owns me");
    let engine = root.engine(remote);

    let report = engine
        .auditor()
        .doctor(&StaticPathRegistrar::new(false), DoctorOptions { min_free_bytes: u64::MAX })
        .await;

    assert_eq!(report.health(), Health::Unhealthy);
    let issues: Vec<_> = report.issues().map(|c| c.check.as_str()).collect();
    assert_eq!(issues, vec!["artifacts"]);
    let warnings: Vec<_> = report.warnings().map(|c| c.check.as_str()).collect();
    assert!(warnings.contains(&"path"));
    assert!(warnings.contains(&"orphans"));
    assert!(warnings.contains(&"disk space"));
}

#[tokio::test]
async fn test_doctor_warnings_only() {
    let (root, remote) = two_apps().await;
    let report = root
        .engine(remote)
        .auditor()
        .doctor(&StaticPathRegistrar::new(false), quiet_doctor())
        .await;

    assert_eq!(report.health(), Health::HealthyWithWarnings);
    assert!(report.checks.iter().any(|c| c.check == "path" && c.status == CheckStatus::Warning));
}

#[tokio::test]
async fn test_doctor_reports_unreachable_remote() {
    let (root, remote) = two_apps().await;
    remote.set_offline(true);

    let report = root
        .engine(remote)
        .auditor()
        .doctor(&StaticPathRegistrar::new(true), quiet_doctor())
        .await;

    let issues: Vec<_> = report.issues().map(|c| c.check.as_str()).collect();
    assert!(issues.contains(&"remote"));
    assert!(issues.contains(&"catalog"));
}

#[tokio::test]
async fn test_clean_removes_orphans_but_keeps_installed_apps() {
    let (root, remote) = two_apps().await;
    let stray = root.layout().artifact_path("cmamstray");
    root.write_artifact("cmamstray", b"12345");
    let engine = root.engine(remote);

    let report = engine.auditor().clean(CleanOptions::default()).await.unwrap();

    assert_eq!(report.orphan_names, vec!["cmamstray".to_string()]);
    assert_eq!(report.orphans.bytes, 5);
    assert!(report.backups.is_none());
    assert!(!stray.exists());
    assert!(root.artifact_bytes("cmamwidget").is_some());
    assert!(root.artifact_bytes("cmamgadget").is_some());

    let validation = engine.auditor().validate().await.unwrap();
    assert_eq!(validation.valid_count(), 2);
}
