//! End-to-end update and rollback against a mock provider.

use anyhow::Result;
use firecommit::core::UpdateError;
use firecommit::test_utils::{ReleaseFixture, sha256_hex};
use firecommit::upgrade::replace::ImmediateReplacer;
use firecommit::upgrade::{Channel, ReleaseSource, SelfUpdater, UpdateOutcome};
use wiremock::MockServer;

use crate::common::{Installation, PublishedBuild, mount_json, test_platform, update_error};

fn updater(server: &MockServer, install: &Installation) -> Result<SelfUpdater> {
    Ok(SelfUpdater::new(ReleaseSource::with_base_url(server.uri())?, install.archive())?
        .with_platform(test_platform())
        .with_replacer(Box::new(ImmediateReplacer::new(install.exe.clone()).with_aliases(vec![])))
        .show_progress(false))
}

async fn publish(server: &MockServer, tag: &str, binary: &[u8]) {
    let build = PublishedBuild::new(tag, binary);
    let release = build.mount(server, ReleaseFixture::stable(tag)).await;
    mount_json(server, "/releases/latest", release.to_json(), None).await;
}

#[tokio::test]
async fn test_update_replaces_binary_and_archives_previous() -> Result<()> {
    let server = MockServer::start().await;
    publish(&server, "v1.1.0", b"new build").await;
    let install = Installation::new(b"old build")?;

    let outcome = updater(&server, &install)?.apply("v1.0.0", Channel::Stable).await?;
    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            from: "v1.0.0".to_string(),
            to: "v1.1.0".to_string()
        }
    );
    assert_eq!(install.installed()?, b"new build");
    assert!(!install.exe.with_file_name("firecommit.old").exists());

    let archived = install.archive().list().await;
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].version, "v1.0.0");
    assert_eq!(std::fs::read(install.archive().entry_path(&archived[0]))?, b"old build");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&install.exe)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
    Ok(())
}

#[tokio::test]
async fn test_dev_build_updates_from_latest_channel() -> Result<()> {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/releases/latest",
        ReleaseFixture::stable("v1.0.0").published("2026-01-01T00:00:00Z").to_json(),
        None,
    )
    .await;
    let build = PublishedBuild::new("dev", b"dev build 12");
    let dev = build
        .mount(
            &server,
            ReleaseFixture::dev("dev-12-20260301-eeeeeee").published("2026-03-01T00:00:00Z"),
        )
        .await;
    mount_json(&server, "/releases/tags/dev", dev.to_json(), None).await;

    let install = Installation::new(b"dev build 11")?;
    let outcome = updater(&server, &install)?
        .apply("dev-11-20260215-bbbbbbb", Channel::Latest)
        .await?;

    assert!(matches!(outcome, UpdateOutcome::Updated { ref to, .. } if to == "dev-12-20260301-eeeeeee"));
    assert_eq!(install.installed()?, b"dev build 12");
    Ok(())
}

#[tokio::test]
async fn test_checksum_mismatch_leaves_installation_untouched() -> Result<()> {
    let server = MockServer::start().await;
    let build = PublishedBuild::new("v1.1.0", b"new build");
    let manifest = format!("{}  {}\n", sha256_hex(b"something else"), build.asset_name);
    let release = build
        .mount_with_manifest(&server, ReleaseFixture::stable("v1.1.0"), &manifest)
        .await;
    mount_json(&server, "/releases/latest", release.to_json(), None).await;

    let install = Installation::new(b"old build")?;
    let err = updater(&server, &install)?.apply("v1.0.0", Channel::Stable).await.unwrap_err();

    assert!(matches!(update_error(&err), Some(UpdateError::ChecksumMismatch { .. })), "{err:#}");
    assert!(format!("{err:#}").contains("Checksum verification failed"));
    assert_eq!(install.installed()?, b"old build");
    assert!(install.archive().list().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_manifest_aborts_before_install() -> Result<()> {
    let server = MockServer::start().await;
    let build = PublishedBuild::new("v1.1.0", b"new build");
    let with_assets = build.mount(&server, ReleaseFixture::stable("v1.1.0")).await;

    // Same asset, but the release no longer lists checksums.txt.
    let mut release = with_assets.to_json();
    if let Some(assets) = release["assets"].as_array_mut() {
        assets.retain(|a| a["name"] != "checksums.txt");
    }
    mount_json(&server, "/releases/latest", release, None).await;

    let install = Installation::new(b"old build")?;
    let err = updater(&server, &install)?.apply("v1.0.0", Channel::Stable).await.unwrap_err();

    assert!(matches!(
        update_error(&err),
        Some(UpdateError::ChecksumManifestMissing { .. })
    ));
    assert_eq!(install.installed()?, b"old build");
    assert!(install.archive().list().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_platform_asset_aborts_before_download() -> Result<()> {
    let server = MockServer::start().await;
    let release = ReleaseFixture::stable("v1.1.0")
        .asset("fire-commit_1.1.0_darwin_arm64.tar.gz", &format!("{}/download/mac", server.uri()))
        .asset("checksums.txt", &format!("{}/download/checksums.txt", server.uri()));
    mount_json(&server, "/releases/latest", release.to_json(), None).await;

    let install = Installation::new(b"old build")?;
    let err = updater(&server, &install)?.apply("v1.0.0", Channel::Stable).await.unwrap_err();

    match update_error(&err) {
        Some(UpdateError::NoMatchingAsset { os, arch }) => {
            assert_eq!((os.as_str(), arch.as_str()), ("linux", "amd64"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(install.installed()?, b"old build");
    Ok(())
}

#[tokio::test]
async fn test_force_reinstalls_current_version() -> Result<()> {
    let server = MockServer::start().await;
    publish(&server, "v1.0.0", b"fresh copy").await;
    let install = Installation::new(b"corrupted copy")?;

    let up_to_date = updater(&server, &install)?.apply("v1.0.0", Channel::Stable).await?;
    assert!(matches!(up_to_date, UpdateOutcome::UpToDate { .. }));
    assert_eq!(install.installed()?, b"corrupted copy");

    let forced = updater(&server, &install)?.force(true).apply("v1.0.0", Channel::Stable).await?;
    assert!(matches!(forced, UpdateOutcome::Updated { .. }));
    assert_eq!(install.installed()?, b"fresh copy");
    Ok(())
}

#[tokio::test]
async fn test_archive_is_pruned_after_update() -> Result<()> {
    let server = MockServer::start().await;
    publish(&server, "v2.0.0", b"v2.0.0 build").await;
    let install = Installation::new(b"v1.6.0 build")?;

    let archive = install.archive();
    for minor in 0..6 {
        let old = install.temp.path().join(format!("old-{minor}"));
        std::fs::write(&old, format!("v1.{minor}.0 build"))?;
        archive.archive(&format!("v1.{minor}.0"), &old).await?;
    }

    updater(&server, &install)?
        .keep_versions(5)
        .apply("v1.6.0", Channel::Stable)
        .await?;

    let versions: Vec<String> = archive.list().await.into_iter().map(|e| e.version).collect();
    assert_eq!(versions, ["v1.2.0", "v1.3.0", "v1.4.0", "v1.5.0", "v1.6.0"]);
    assert!(!archive.dir().join("firecommit-v1.0.0").exists());
    assert!(!archive.dir().join("firecommit-v1.1.0").exists());
    Ok(())
}

#[tokio::test]
async fn test_rollback_after_update() -> Result<()> {
    let server = MockServer::start().await;
    publish(&server, "v1.1.0", b"new build").await;
    let install = Installation::new(b"old build")?;

    let updater = updater(&server, &install)?;
    updater.apply("v1.0.0", Channel::Stable).await?;
    assert_eq!(install.installed()?, b"new build");

    assert!(updater.restore("v1.0.0").await?);
    assert_eq!(install.installed()?, b"old build");

    // Restoring does not consume the archived entry.
    assert_eq!(updater.list_archived().await.len(), 1);

    let err = updater.restore("v0.9.0").await.unwrap_err();
    assert!(matches!(update_error(&err), Some(UpdateError::VersionNotArchived { .. })));
    Ok(())
}

#[tokio::test]
async fn test_rollback_with_deleted_binary() -> Result<()> {
    let server = MockServer::start().await;
    let install = Installation::new(b"current")?;
    let archive = install.archive();
    archive.archive("v0.9.0", &install.exe).await?;

    let entry = archive.list().await.remove(0);
    std::fs::remove_file(archive.entry_path(&entry))?;

    let err = updater(&server, &install)?.restore("v0.9.0").await.unwrap_err();
    assert!(matches!(update_error(&err), Some(UpdateError::ArchivedBinaryMissing { .. })));
    assert_eq!(install.installed()?, b"current");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_platform_replacer_refreshes_existing_alias() -> Result<()> {
    let server = MockServer::start().await;
    publish(&server, "v1.1.0", b"new build").await;
    let install = Installation::new(b"old build")?;
    let alias = install.exe.with_file_name("fcmt");
    std::os::unix::fs::symlink("firecommit", &alias)?;

    let outcome = SelfUpdater::new(ReleaseSource::with_base_url(server.uri())?, install.archive())?
        .with_platform(test_platform())
        .with_executable(install.exe.clone())
        .show_progress(false)
        .apply("v1.0.0", Channel::Stable)
        .await?;

    assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
    assert_eq!(install.installed()?, b"new build");
    assert_eq!(std::fs::read_link(&alias)?, std::path::PathBuf::from("firecommit"));
    assert_eq!(std::fs::read(&alias)?, b"new build");
    assert!(!install.exe.with_file_name("git-fire-commit").exists());
    Ok(())
}
