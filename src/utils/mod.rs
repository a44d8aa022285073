//! Cross-platform utilities and helpers
//!
//! File operations and platform-specific helpers shared by the update
//! subsystem. Everything here works the same on Windows, macOS and Linux.
//!
//! # Modules
//!
//! - [`fs`] - File system operations with atomic writes and permission handling
//! - [`platform`] - Well-known directories and executable naming
//!
//! # Example
//!
//! ```rust,no_run
//! use firecommit::utils::{atomic_write, ensure_dir, get_cache_dir};
//!
//! # fn example() -> anyhow::Result<()> {
//! let cache = get_cache_dir()?;
//! ensure_dir(&cache)?;
//! atomic_write(&cache.join("update-check.json"), b"{}")?;
//! # Ok(())
//! # }
//! ```

pub mod fs;
pub mod platform;

pub use fs::{atomic_write, copy_file, ensure_dir, make_executable};
pub use platform::{
    current_executable, exe_suffix, get_cache_dir, get_config_dir, get_data_dir, is_windows,
};
