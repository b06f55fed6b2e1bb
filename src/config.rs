//! Layered configuration: defaults -> `.astcache/settings.toml` -> env vars.
//!
//! # Environment variables
//!
//! Prefixed with `ASTCACHE_`, double underscores separate nested levels:
//! - `ASTCACHE_INDEXING__MAX_WORKERS=8` sets `indexing.max_workers`
//! - `ASTCACHE_LOGGING__LEVEL=debug` sets `logging.level`

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_DIR: &str = ".astcache";
const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the cache snapshot file, relative to the workspace root.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Worker pool size for the extraction coordinator.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Additional include globs, layered on top of the default walk.
    #[serde(default)]
    pub include: Vec<String>,

    /// Additional exclude globs, layered on top of the built-in prune set.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Bypass `needs_reanalysis` and re-extract every discovered file.
    #[serde(default = "default_false")]
    pub no_cache: bool,

    /// Seconds after which a cached entry is considered stale regardless
    /// of mtime comparison; `0` disables TTL-based invalidation.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Optional per-file wall-clock timeout in milliseconds.
    #[serde(default)]
    pub file_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub json: bool,
}

fn default_version() -> u32 {
    1
}
fn default_cache_path() -> PathBuf {
    PathBuf::from(".astcache/cache.bin")
}
fn default_max_workers() -> usize {
    num_cpus::get()
}
fn default_false() -> bool {
    false
}
fn default_cache_ttl() -> u64 {
    0
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_path: default_cache_path(),
            indexing: IndexingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            include: Vec::new(),
            exclude: Vec::new(),
            no_cache: false,
            cache_ttl_secs: default_cache_ttl(),
            file_timeout_ms: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Settings {
    /// Load configuration from all sources, searching upward from the
    /// current directory for a `.astcache` workspace.
    pub fn load() -> Result<Self, figment::Error> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(
                Env::prefixed("ASTCACHE_").map(|key| {
                    key.as_str().to_lowercase().replace("__", ".").into()
                }),
            )
            .extract()
    }

    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(
                Env::prefixed("ASTCACHE_").map(|key| {
                    key.as_str().to_lowercase().replace("__", ".").into()
                }),
            )
            .extract()
    }

    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let dir = ancestor.join(CONFIG_DIR);
            if dir.is_dir() {
                return Some(dir.join(CONFIG_FILE));
            }
        }
        None
    }

    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            if ancestor.join(CONFIG_DIR).is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }
        None
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Writes a fresh default `.astcache/settings.toml` in the current
    /// directory, refusing to overwrite unless `force` is set.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);
        if !force && config_path.exists() {
            return Err("configuration file already exists, use --force to overwrite".into());
        }
        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_have_sane_values() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert!(settings.indexing.max_workers > 0);
        assert_eq!(settings.indexing.cache_ttl_secs, 0);
        assert!(!settings.indexing.no_cache);
    }

    #[test]
    fn loads_and_overrides_from_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
version = 2

[indexing]
max_workers = 4
no_cache = true

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.indexing.max_workers, 4);
        assert!(settings.indexing.no_cache);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[indexing]\nmax_workers = 16\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.indexing.max_workers, 16);
        assert_eq!(settings.version, 1);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn round_trips_through_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.indexing.max_workers = 2;
        settings.save(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.indexing.max_workers, 2);
    }
}
