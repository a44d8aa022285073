//! Shared helpers for the integration suite.

use anyhow::Result;
use firecommit::core::UpdateError;
use firecommit::test_utils::{
    ArchiveEntry, ReleaseFixture, checksum_manifest, init_test_logging, tar_gz, zip,
};
use firecommit::upgrade::VersionArchive;
use firecommit::upgrade::asset::Platform;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Platform every published test build targets.
pub fn test_platform() -> Platform {
    Platform::new("linux", "amd64")
}

/// First [`UpdateError`] anywhere in the chain.
pub fn update_error(err: &anyhow::Error) -> Option<&UpdateError> {
    err.chain().find_map(|cause| cause.downcast_ref::<UpdateError>())
}

/// Serve `body` as JSON at `route` with an optional `ETag`.
pub async fn mount_json(server: &MockServer, route: &str, body: Value, etag: Option<&str>) {
    init_test_logging(None);
    let mut response = ResponseTemplate::new(200).set_body_json(body);
    if let Some(etag) = etag {
        response = response.insert_header("ETag", etag);
    }
    Mock::given(method("GET")).and(path(route)).respond_with(response).mount(server).await;
}

/// Release assets for one build of `binary` on [`test_platform`].
pub struct PublishedBuild {
    pub asset_name: String,
    pub archive: Vec<u8>,
}

impl PublishedBuild {
    pub fn new(version: &str, binary: &[u8]) -> Self {
        Self::for_platform(version, binary, &test_platform())
    }

    /// Build for `platform`, packaged the way the release pipeline does.
    pub fn for_platform(version: &str, binary: &[u8], platform: &Platform) -> Self {
        let asset_name = format!(
            "fire-commit_{}{}",
            version.trim_start_matches('v'),
            platform.asset_suffix()
        );
        let dir = format!("fire-commit_{}_{}", platform.os, platform.arch);
        let entries = [
            ArchiveEntry::file(&format!("{dir}/LICENSE"), b"MIT"),
            ArchiveEntry::executable(&format!("{dir}/{}", platform.binary_name()), binary),
        ];
        let archive = if platform.is_windows() { zip(&entries) } else { tar_gz(&entries) };
        Self { asset_name, archive }
    }

    /// Serve the archive and a matching `checksums.txt`; returns the release
    /// fixture with both assets attached.
    pub async fn mount(&self, server: &MockServer, release: ReleaseFixture) -> ReleaseFixture {
        let manifest = checksum_manifest(&[(self.asset_name.as_str(), self.archive.as_slice())]);
        self.mount_with_manifest(server, release, &manifest).await
    }

    pub async fn mount_with_manifest(
        &self,
        server: &MockServer,
        release: ReleaseFixture,
        manifest: &str,
    ) -> ReleaseFixture {
        let asset_route = format!("/download/{}", self.asset_name);
        Mock::given(method("GET"))
            .and(path(asset_route.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(self.archive.clone()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download/checksums.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(manifest))
            .mount(server)
            .await;

        release
            .asset(&self.asset_name, &format!("{}{asset_route}", server.uri()))
            .asset("checksums.txt", &format!("{}/download/checksums.txt", server.uri()))
    }
}

/// A fake installation: an executable and a version archive in a temp dir.
pub struct Installation {
    pub temp: TempDir,
    pub exe: PathBuf,
}

impl Installation {
    pub fn new(binary: &[u8]) -> Result<Self> {
        init_test_logging(None);
        let temp = TempDir::new()?;
        let exe = temp.path().join("bin").join("firecommit");
        std::fs::create_dir_all(exe.parent().expect("exe has a parent"))?;
        std::fs::write(&exe, binary)?;
        Ok(Self { temp, exe })
    }

    pub fn archive(&self) -> VersionArchive {
        VersionArchive::new(self.temp.path().join("data").join("versions"))
    }

    pub fn installed(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.exe)?)
    }
}
