//! Environment overrides for state locations and the release provider.
//!
//! These tests mutate process environment and run serially.

use anyhow::Result;
use firecommit::config::GlobalConfig;
use firecommit::upgrade::{AutoUpdateMode, Channel, ReleaseSource, UpdatePaths};
use serial_test::serial;
use std::ffi::{OsStr, OsString};
use tempfile::TempDir;

/// Sets variables for the lifetime of the guard, restoring previous values on drop.
struct EnvGuard {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, &OsStr)]) -> Self {
        let mut saved = Vec::new();
        for (key, value) in vars {
            saved.push((*key, std::env::var_os(key)));
            unsafe {
                std::env::set_var(key, value);
            }
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}

#[test]
#[serial]
fn test_update_paths_follow_override_dirs() -> Result<()> {
    let temp = TempDir::new()?;
    let cache = temp.path().join("cache");
    let data = temp.path().join("data");
    let _env = EnvGuard::set(&[
        ("FIRECOMMIT_CACHE_DIR", cache.as_os_str()),
        ("FIRECOMMIT_DATA_DIR", data.as_os_str()),
    ]);

    let paths = UpdatePaths::from_env()?;
    assert_eq!(paths.state_file, cache.join("update-check.json"));
    assert_eq!(paths.archive_dir, data.join("versions"));
    assert_eq!(paths.archive().index_path(), data.join("versions").join("versions.json"));
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_releases_url_override() -> Result<()> {
    {
        let _env =
            EnvGuard::set(&[("FIRECOMMIT_RELEASES_URL", OsStr::new("http://mirror.invalid/api/"))]);
        assert_eq!(ReleaseSource::from_env()?.api_base(), "http://mirror.invalid/api");
    }

    let _env = EnvGuard::set(&[("FIRECOMMIT_RELEASES_URL", OsStr::new(""))]);
    assert_eq!(
        ReleaseSource::from_env()?.api_base(),
        "https://api.github.com/repos/lieyanc/fire-commit"
    );
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_config_path_override() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("firecommit.toml");
    std::fs::write(&path, "[upgrade]\nchannel = \"stable\"\nauto_update = \"n\"\n")?;
    let _env = EnvGuard::set(&[("FIRECOMMIT_CONFIG", path.as_os_str())]);

    assert_eq!(GlobalConfig::default_path()?, path);
    let config = GlobalConfig::load().await?;
    assert_eq!(config.upgrade.channel, Channel::Stable);
    assert_eq!(config.upgrade.auto_update, AutoUpdateMode::Never);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_missing_override_file_is_default_config() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("absent.toml");
    let _env = EnvGuard::set(&[("FIRECOMMIT_CONFIG", path.as_os_str())]);

    assert_eq!(GlobalConfig::load().await?, GlobalConfig::default());
    Ok(())
}
