//! Configuration management for firecommit
//!
//! firecommit reads a single user-wide TOML file. Only the `[upgrade]` table
//! belongs to the update subsystem; other tables are owned by the rest of the
//! application and ignored here.
//!
//! # Configuration File
//!
//! **Location:**
//! - `FIRECOMMIT_CONFIG` when set
//! - otherwise `<config_dir>/firecommit/config.toml`
//!   (`~/.config/firecommit/config.toml` on Linux,
//!   `~/Library/Application Support/firecommit/config.toml` on macOS,
//!   `%APPDATA%\firecommit\config.toml` on Windows)
//!
//! ```toml
//! [upgrade]
//! channel = "latest"      # or "stable"
//! auto_update = "notify"  # "always" | "notify" | "never"
//! timing = "after"        # "before" | "after"
//! check_cache = true
//! keep_versions = 5
//! ```
//!
//! A missing file yields defaults. A file that cannot be parsed is reported as
//! [`UpdateError::ConfigError`](crate::core::UpdateError::ConfigError).

pub mod global;

pub use global::GlobalConfig;
