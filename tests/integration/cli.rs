//! The `firecommit` binary: self-management commands and the background check.

use assert_cmd::Command;
use firecommit::test_utils::ReleaseFixture;
use firecommit::upgrade::VersionArchive;
use firecommit::upgrade::version::is_dev_build;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::MockServer;

use crate::common::mount_json;
#[cfg(unix)]
use crate::common::PublishedBuild;
#[cfg(unix)]
use firecommit::upgrade::asset::Platform;

/// Nothing listens here, so background checks fail fast and quietly.
const UNREACHABLE: &str = "http://127.0.0.1:9";

/// Isolated config, cache and data directories for one invocation.
struct Sandbox {
    temp: TempDir,
    releases_url: String,
}

impl Sandbox {
    fn new(config: &str) -> Self {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), config).unwrap();
        Self {
            temp,
            releases_url: UNREACHABLE.to_string(),
        }
    }

    fn releases(mut self, url: String) -> Self {
        self.releases_url = url;
        self
    }

    fn archive(&self) -> VersionArchive {
        VersionArchive::new(self.temp.path().join("data").join("versions"))
    }

    /// Copy of the built binary inside the sandbox, safe to update in place.
    fn install_copy(&self) -> PathBuf {
        let bin = self.temp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let exe = bin.join(format!("firecommit{}", std::env::consts::EXE_SUFFIX));
        std::fs::copy(assert_cmd::cargo::cargo_bin("firecommit"), &exe).unwrap();
        exe
    }

    fn command(&self) -> Command {
        self.command_at(&assert_cmd::cargo::cargo_bin("firecommit"))
    }

    fn command_at(&self, exe: &Path) -> Command {
        let mut cmd = Command::new(exe);
        cmd.env("FIRECOMMIT_CONFIG", self.temp.path().join("config.toml"))
            .env("FIRECOMMIT_CACHE_DIR", self.temp.path().join("cache"))
            .env("FIRECOMMIT_DATA_DIR", self.temp.path().join("data"))
            .env("FIRECOMMIT_RELEASES_URL", &self.releases_url)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

const QUIET_CONFIG: &str = "[upgrade]\nauto_update = \"never\"\n";

#[test]
fn test_version_prints_build_version() {
    let sandbox = Sandbox::new(QUIET_CONFIG);
    sandbox
        .command()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("firecommit {}", firecommit::BUILD_VERSION)))
        .stdout(predicate::str::contains("archived").not());
}

#[tokio::test]
async fn test_version_mentions_archive() {
    let sandbox = Sandbox::new(QUIET_CONFIG);
    let binary = sandbox.temp.path().join("old");
    std::fs::write(&binary, b"old").unwrap();
    sandbox.archive().archive("v0.1.0", &binary).await.unwrap();
    sandbox.archive().archive("v0.2.0", &binary).await.unwrap();

    sandbox
        .command()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 archived versions available"));
}

#[test]
fn test_rollback_list_empty() {
    let sandbox = Sandbox::new(QUIET_CONFIG);
    sandbox
        .command()
        .args(["rollback", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No archived versions available."));
}

#[tokio::test]
async fn test_rollback_lists_newest_first() {
    let sandbox = Sandbox::new(QUIET_CONFIG);
    let binary = sandbox.temp.path().join("old");
    std::fs::write(&binary, b"old").unwrap();
    sandbox.archive().archive("v0.1.0", &binary).await.unwrap();
    sandbox.archive().archive("v0.2.0", &binary).await.unwrap();

    let output = sandbox.command().arg("rollback").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();

    let newer = stdout.find("v0.2.0").expect("v0.2.0 listed");
    let older = stdout.find("v0.1.0").expect("v0.1.0 listed");
    assert!(newer < older, "{stdout}");
    assert!(stdout.contains("firecommit rollback <VERSION>"));
}

#[test]
fn test_rollback_unknown_version_fails() {
    let sandbox = Sandbox::new(QUIET_CONFIG);
    sandbox
        .command()
        .args(["rollback", "v9.9.9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to roll back to v9.9.9"))
        .stderr(predicate::str::contains("not found in archive"))
        .stderr(predicate::str::contains("rollback --list"));
}

#[test]
fn test_update_rejects_unknown_channel() {
    let sandbox = Sandbox::new(QUIET_CONFIG);
    sandbox
        .command()
        .args(["update", "--channel", "nightly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nightly"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_check_reports_available_release() {
    let server = MockServer::start().await;
    mount_json(&server, "/releases/latest", ReleaseFixture::stable("v9.0.0").to_json(), None).await;

    let sandbox = Sandbox::new(QUIET_CONFIG).releases(server.uri());
    sandbox
        .command()
        .args(["update", "--check", "--channel", "stable"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Current version: {}", firecommit::BUILD_VERSION)))
        .stdout(predicate::str::contains("on the stable channel"))
        .stdout(predicate::str::contains("→ v9.0.0"));

    // --check never installs, so nothing was archived.
    assert!(sandbox.archive().list().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_check_reports_network_failure() {
    let sandbox = Sandbox::new(QUIET_CONFIG);
    sandbox
        .command()
        .args(["update", "--check", "--channel", "stable"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to check for updates"))
        .stderr(predicate::str::contains("network connection"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_notify_mode_prints_notice_after_command() {
    if is_dev_build(firecommit::BUILD_VERSION) {
        // Dev builds install updates instead of announcing them.
        return;
    }

    let server = MockServer::start().await;
    mount_json(&server, "/releases/latest", ReleaseFixture::stable("v9.0.0").to_json(), None).await;

    let sandbox = Sandbox::new("[upgrade]\nchannel = \"stable\"\nauto_update = \"notify\"\n")
        .releases(server.uri());
    sandbox
        .command()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("firecommit"))
        .stderr(predicate::str::contains("Update available"))
        .stderr(predicate::str::contains("v9.0.0"))
        .stderr(predicate::str::contains("firecommit update"));

    assert!(sandbox.temp.path().join("cache").join("update-check.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_never_mode_skips_background_check() {
    if is_dev_build(firecommit::BUILD_VERSION) {
        return;
    }

    let server = MockServer::start().await;
    mount_json(&server, "/releases/latest", ReleaseFixture::stable("v9.0.0").to_json(), None).await;

    let sandbox = Sandbox::new("[upgrade]\nchannel = \"stable\"\nauto_update = \"never\"\n")
        .releases(server.uri());
    sandbox
        .command()
        .arg("version")
        .assert()
        .success()
        .stderr(predicate::str::contains("Update available").not());

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert!(!sandbox.temp.path().join("cache").join("update-check.json").exists());
}

#[test]
fn test_invalid_config_falls_back_to_defaults() {
    let sandbox = Sandbox::new("[upgrade\nchannel = ");
    sandbox
        .command()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(firecommit::BUILD_VERSION))
        .stderr(predicate::str::contains("Using default configuration"));
}

/// Serve `v9.0.0` for the current platform and return the server.
#[cfg(unix)]
async fn publish_current_platform(binary: &[u8]) -> MockServer {
    let server = MockServer::start().await;
    let build = PublishedBuild::for_platform("v9.0.0", binary, &Platform::current());
    let release = build.mount(&server, ReleaseFixture::stable("v9.0.0")).await;
    mount_json(&server, "/releases/latest", release.to_json(), None).await;
    server
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_always_mode_installs_update_after_command() {
    let server = publish_current_platform(b"#!/bin/sh\necho new\n").await;
    let sandbox = Sandbox::new("[upgrade]\nchannel = \"stable\"\nauto_update = \"always\"\n")
        .releases(server.uri());
    let exe = sandbox.install_copy();
    let original = std::fs::read(&exe).unwrap();

    sandbox
        .command_at(&exe)
        .arg("version")
        .assert()
        .success()
        // The command ran before the update archived anything.
        .stdout(predicate::str::contains("archived").not())
        .stderr(predicate::str::contains(format!(
            "Auto-updating firecommit: {} → v9.0.0",
            firecommit::BUILD_VERSION
        )))
        .stderr(predicate::str::contains("Updated firecommit"));

    assert_eq!(std::fs::read(&exe).unwrap(), b"#!/bin/sh\necho new\n");
    let archived = sandbox.archive().list().await;
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].version, firecommit::BUILD_VERSION);
    assert_eq!(std::fs::read(sandbox.archive().entry_path(&archived[0])).unwrap(), original);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_before_timing_updates_ahead_of_command() {
    let server = publish_current_platform(b"#!/bin/sh\necho new\n").await;
    let sandbox = Sandbox::new(
        "[upgrade]\nchannel = \"stable\"\nauto_update = \"always\"\ntiming = \"before\"\n",
    )
    .releases(server.uri());
    let exe = sandbox.install_copy();

    sandbox
        .command_at(&exe)
        .arg("version")
        .assert()
        .success()
        // The update archived the old build before `version` counted the archive.
        .stdout(predicate::str::contains("1 archived version available"))
        .stderr(predicate::str::contains("Auto-updating firecommit"));

    assert_eq!(std::fs::read(&exe).unwrap(), b"#!/bin/sh\necho new\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_auto_update_does_not_fail_command() {
    let server = MockServer::start().await;
    // A release with no asset for any platform.
    mount_json(&server, "/releases/latest", ReleaseFixture::stable("v9.0.0").to_json(), None).await;

    let sandbox = Sandbox::new("[upgrade]\nchannel = \"stable\"\nauto_update = \"always\"\n")
        .releases(server.uri());
    let exe = sandbox.install_copy();
    let original = std::fs::read(&exe).unwrap();

    sandbox
        .command_at(&exe)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(firecommit::BUILD_VERSION))
        .stderr(predicate::str::contains("Auto-update failed"))
        .stderr(predicate::str::contains("No release asset found"));

    assert_eq!(std::fs::read(&exe).unwrap(), original);
    assert!(sandbox.archive().list().await.is_empty());
}
