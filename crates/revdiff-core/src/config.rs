//! Viewer configuration loaded from environment variables.
//!
//! Every setting has a default so an embedding host can start with zero
//! configuration.

use std::path::PathBuf;

use revdiff_cache::DiskCache;
use revdiff_model::constants::ROBOT_COMMENTS_MIN_VERSION;
use revdiff_model::ServerVersion;

use crate::mode::TextDiffMode;

#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Root of the per-account diff caches.
    /// Env: `REVDIFF_CACHE_DIR`
    /// Default: the platform cache directory, `./cache` if there is none.
    pub cache_dir: PathBuf,

    /// Text layout used when an image diff cannot be shown.
    /// Env: `REVDIFF_DIFF_MODE` (`unified` / `sidebyside`)
    /// Default: `unified`
    pub diff_mode: TextDiffMode,

    /// Upper bound of concurrent network calls per viewer.
    /// Env: `REVDIFF_MAX_FETCHES`
    /// Default: `4`
    pub max_concurrent_fetches: usize,

    /// Oldest server release robot comments are requested from.
    /// Env: `REVDIFF_ROBOT_COMMENTS_MIN_VERSION`
    /// Default: `2.14`
    pub robot_comments_min_version: ServerVersion,
}

impl Default for DiffConfig {
    fn default() -> Self {
        let (major, minor) = ROBOT_COMMENTS_MIN_VERSION;
        Self {
            cache_dir: DiskCache::default_root().unwrap_or_else(|_| PathBuf::from("./cache")),
            diff_mode: TextDiffMode::Unified,
            max_concurrent_fetches: 4,
            robot_comments_min_version: ServerVersion::new(major, minor),
        }
    }
}

impl DiffConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("REVDIFF_CACHE_DIR") {
            if !dir.is_empty() {
                config.cache_dir = PathBuf::from(dir);
            }
        }

        if let Some(mode) = lookup("REVDIFF_DIFF_MODE") {
            match mode.parse::<TextDiffMode>() {
                Ok(parsed) => config.diff_mode = parsed,
                Err(_) => tracing::warn!(value = %mode, "Invalid REVDIFF_DIFF_MODE, using default"),
            }
        }

        if let Some(val) = lookup("REVDIFF_MAX_FETCHES") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_concurrent_fetches = n,
                _ => tracing::warn!(value = %val, "Invalid REVDIFF_MAX_FETCHES, using default"),
            }
        }

        if let Some(val) = lookup("REVDIFF_ROBOT_COMMENTS_MIN_VERSION") {
            match val.parse::<ServerVersion>() {
                Ok(version) => config.robot_comments_min_version = version,
                Err(e) => tracing::warn!(
                    error = %e,
                    "Invalid REVDIFF_ROBOT_COMMENTS_MIN_VERSION, using default"
                ),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}
