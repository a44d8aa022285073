use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use super::download::Downloader;
use super::release::{Asset, Release};
use crate::constants::CHECKSUMS_ASSET_NAME;
use crate::core::UpdateError;

/// Verifies downloaded release archives against the release's SHA-256 manifest.
///
/// Every release publishes a `checksums.txt` asset. An archive whose digest
/// is missing from it, malformed in it, or different from it is never
/// installed.
///
/// # Manifest Format
///
/// ```text
/// # comments and blank lines are ignored
/// 4bf5122f344554c53bde2ebb8cd2b7e3d1600ad631c385a5d7cce23c7785459a  fire-commit_1.2.3_darwin_arm64.tar.gz
/// 9a1c...                                                           *fire-commit_1.2.3_windows_amd64.zip
/// ```
///
/// A leading `*` on the file name (binary mode marker) is ignored.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Locate the checksum manifest among a release's assets.
    pub fn find_manifest(assets: &[Asset]) -> Result<&Asset, UpdateError> {
        assets.iter().find(|a| a.name == CHECKSUMS_ASSET_NAME).ok_or_else(|| {
            UpdateError::ChecksumManifestMissing {
                name: CHECKSUMS_ASSET_NAME.to_string(),
            }
        })
    }

    /// Expected digest for `asset_name` in the manifest file at `manifest_path`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use firecommit::upgrade::verification::ChecksumVerifier;
    /// use std::path::Path;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let digest = ChecksumVerifier::checksum_for_asset(
    ///     Path::new("checksums.txt"),
    ///     "fire-commit_1.2.3_linux_amd64.tar.gz",
    /// )
    /// .await?;
    /// assert_eq!(digest.len(), 64);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn checksum_for_asset(manifest_path: &Path, asset_name: &str) -> Result<String> {
        let content = fs::read_to_string(manifest_path)
            .await
            .with_context(|| format!("Failed to read checksum manifest: {manifest_path:?}"))?;
        Ok(Self::parse_manifest_entry(&content, asset_name)?)
    }

    /// Expected digest for `asset_name` in manifest text, lowercased.
    ///
    /// Lines with fewer than two fields and lines for other files are skipped.
    /// The first line for `asset_name` decides: its digest must be 64 hex
    /// characters.
    pub fn parse_manifest_entry(content: &str, asset_name: &str) -> Result<String, UpdateError> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (Some(digest), Some(filename)) = (fields.next(), fields.next()) else {
                continue;
            };

            let filename = filename.strip_prefix('*').unwrap_or(filename);
            if filename != asset_name {
                continue;
            }

            let digest = digest.to_ascii_lowercase();
            if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(UpdateError::ChecksumFormatInvalid {
                    asset: asset_name.to_string(),
                    reason: format!("'{digest}' is not a 64-character hex SHA-256 digest"),
                });
            }
            debug!("Found checksum for {}: {}", asset_name, digest);
            return Ok(digest);
        }

        Err(UpdateError::ChecksumEntryMissing {
            asset: asset_name.to_string(),
        })
    }

    /// Compute the SHA256 checksum of a file as lowercase hex.
    pub async fn compute_sha256(file_path: &Path) -> Result<String> {
        debug!("Computing SHA256 checksum for: {:?}", file_path);

        let contents = fs::read(file_path)
            .await
            .with_context(|| format!("Failed to read file: {file_path:?}"))?;

        Ok(hex::encode(Sha256::digest(&contents)))
    }

    /// Verify a file against an expected digest, ignoring case.
    pub async fn verify_checksum(file_path: &Path, expected: &str, name: &str) -> Result<()> {
        info!("Verifying checksum for: {}", name);

        let actual = Self::compute_sha256(file_path).await?;
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(UpdateError::ChecksumMismatch {
                name: name.to_string(),
                expected: expected.to_string(),
                actual,
            }
            .into());
        }

        info!("Checksum verification successful");
        Ok(())
    }

    /// Verify a downloaded `asset` from `release` using the release's manifest.
    pub async fn verify_downloaded_asset(
        downloader: &Downloader,
        release: &Release,
        asset: &Asset,
        archive_path: &Path,
    ) -> Result<()> {
        let manifest = Self::find_manifest(&release.assets)?;
        let content = downloader
            .download_text(&manifest.browser_download_url)
            .await
            .context("Failed to download checksum manifest")?;
        let expected = Self::parse_manifest_entry(&content, &asset.name)?;
        Self::verify_checksum(archive_path, &expected, &asset.name).await
    }
}
