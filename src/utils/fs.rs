//! File system utilities for the update pipeline.
//!
//! Whole-file state documents (the check schedule, the archive index) are
//! written atomically through a temporary sibling and a rename, so a crash or a
//! concurrent reader never observes a half-written file. Binary copies keep
//! the executable bit on Unix.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Create a directory and all of its parents if it does not exist yet.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            let platform_help = if crate::utils::platform::is_windows() {
                "On Windows: Check that the path length is < 260 chars and that you can write there"
            } else {
                "Check directory permissions and that the parent is not a file"
            };
            format!("Failed to create directory: {}\n\n{platform_help}", path.display())
        })?;
    }
    Ok(())
}

/// Write `content` to `path` atomically.
///
/// The bytes go to `<path>.tmp`, are synced to disk, and the temporary file is
/// renamed over the destination. Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Copy a file byte-for-byte, creating or truncating the destination.
///
/// Unlike [`std::fs::copy`] this does not carry the source's permissions
/// over; callers that install executables follow up with [`make_executable`].
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    let mut input = fs::File::open(src)
        .with_context(|| format!("Failed to open {}", src.display()))?;
    let mut output = fs::File::create(dst)
        .with_context(|| format!("Failed to create {}", dst.display()))?;
    std::io::copy(&mut input, &mut output)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    output
        .sync_all()
        .with_context(|| format!("Failed to sync {}", dst.display()))?;
    Ok(())
}

/// Mark a file as executable (`0o755`). No-op on Windows.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to set executable permissions on {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
