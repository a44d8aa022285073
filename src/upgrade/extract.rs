//! Pull the firecommit executable out of a downloaded release archive.
//!
//! Release archives hold one binary, possibly nested in a platform
//! directory (`firecommit_linux_amd64/firecommit`). The binary is located by
//! exact file name anywhere in the tree and written flat into the
//! destination directory with its archived permission bits.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::UpdateError;

/// Extract `binary_name` from `archive` into `dest_dir`.
///
/// The format is chosen from `asset_name`: `.zip` is a zip archive,
/// anything else a gzip-compressed tarball. Runs on the blocking pool.
pub async fn extract_binary(
    archive: &Path,
    asset_name: &str,
    dest_dir: &Path,
    binary_name: &str,
) -> Result<PathBuf> {
    let archive = archive.to_path_buf();
    let is_zip = asset_name.ends_with(".zip");
    let dest = dest_dir.join(binary_name);
    let binary = binary_name.to_string();
    let asset = asset_name.to_string();

    let extracted = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let failure = |reason: String| UpdateError::ExtractionFailure {
            archive: asset.clone(),
            binary: binary.clone(),
            reason,
        };

        let file = File::open(&archive)
            .with_context(|| format!("Failed to open archive {}", archive.display()))?;
        let found = if is_zip {
            extract_from_zip(file, &binary, &dest)
        } else {
            extract_from_tar_gz(file, &binary, &dest)
        }
        .map_err(|e| failure(format!("{e:#}")))?;

        if !found {
            return Err(failure("binary not found in archive".to_string()).into());
        }
        Ok(dest)
    })
    .await
    .context("Failed to spawn blocking task for extraction")??;

    debug!("Extracted {}", extracted.display());
    Ok(extracted)
}

fn extract_from_tar_gz(file: File, binary_name: &str, dest: &Path) -> Result<bool> {
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    for entry in archive.entries().context("Failed to read tarball")? {
        let mut entry = entry.context("Failed to read tarball entry")?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().context("Invalid entry path")?.into_owned();
        if path.file_name().and_then(|n| n.to_str()) != Some(binary_name) {
            continue;
        }

        let mode = entry.header().mode().ok();
        write_binary(&mut entry, dest, mode)?;
        return Ok(true);
    }

    Ok(false)
}

fn extract_from_zip(file: File, binary_name: &str, dest: &Path) -> Result<bool> {
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).context("Invalid zip archive")?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry {i}"))?;
        if entry.is_dir() {
            continue;
        }
        let Some(path) = entry.enclosed_name() else {
            continue;
        };
        if path.file_name().and_then(|n| n.to_str()) != Some(binary_name) {
            continue;
        }

        let mode = entry.unix_mode();
        write_binary(&mut entry, dest, mode)?;
        return Ok(true);
    }

    Ok(false)
}

fn write_binary(reader: &mut impl Read, dest: &Path, mode: Option<u32>) -> Result<()> {
    let mut out =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    std::io::copy(reader, &mut out)
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    out.sync_all()?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(mode & 0o7777))
            .with_context(|| format!("Failed to set permissions on {}", dest.display()))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
