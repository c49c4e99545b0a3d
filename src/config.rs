//! Layered application configuration.
//!
//! Settings are resolved in increasing priority:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, else `config.toml` in the platform
//!    config directory)
//! 3. Environment variables prefixed `DUPEWALK_` (e.g. `DUPEWALK_WORKERS=8`)
//! 4. Command-line flags
//!
//! # Example
//!
//! ```toml
//! workers = 8
//! max_buckets = 2
//! strong_hash_threshold = 52428800
//! ignore_names = [".git", "node_modules"]
//! ignore_regex = '\.tmp$'
//! trash = true
//! theme = "dark"
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::DeleteConfig;
use crate::cli::Cli;
use crate::duplicates::FinderConfig;
use crate::scanner::{ScanConfig, ScanError, DEFAULT_BUFFER_SIZE, DEFAULT_STRONG_HASH_THRESHOLD};
use crate::tui::theme::ThemeChoice;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DUPEWALK_";

/// Errors while loading configuration. Always fatal.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A provider yielded malformed or mistyped values.
    #[error("Invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid configuration: {field} {message}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// `--config` named a file that does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fingerprinting threads per size bucket.
    pub workers: usize,
    /// Size buckets processed concurrently.
    pub max_buckets: usize,
    /// Files above this many bytes use BLAKE3.
    pub strong_hash_threshold: u64,
    /// Use XXH3-128 for all sizes.
    pub uniform_hash: bool,
    /// Read buffer size in bytes.
    pub buffer_size: usize,
    /// Base names to ignore.
    pub ignore_names: Vec<String>,
    /// Full-path pattern to ignore.
    pub ignore_regex: Option<String>,
    /// Move deleted files to the trash.
    pub trash: bool,
    /// Preferred TUI theme.
    pub theme: ThemeChoice,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 4,
            max_buckets: 4,
            strong_hash_threshold: DEFAULT_STRONG_HASH_THRESHOLD,
            uniform_hash: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            ignore_names: Vec::new(),
            ignore_regex: None,
            trash: false,
            theme: ThemeChoice::Auto,
        }
    }
}

impl Config {
    /// Default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupewalk", "dupewalk")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load defaults, file and environment.
    ///
    /// `explicit` is the `--config` value; when it is `None` the default
    /// path is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit file is missing or any layer
    /// holds invalid values.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };
        match path {
            Some(path) => Self::load_from_path(&path),
            None => Self::extract(Self::base()),
        }
    }

    /// Load defaults, the given TOML file and environment.
    ///
    /// A missing file contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed or out-of-range values.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading config from {}", path.display());
        Self::extract(Self::base().merge(Toml::file(path)))
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "workers",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_buckets == 0 {
            return Err(ConfigError::Invalid {
                field: "max_buckets",
                message: "must be at least 1".to_string(),
            });
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid {
                field: "buffer_size",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Apply command-line overrides.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(max_buckets) = cli.max_buckets {
            self.max_buckets = max_buckets;
        }
        if let Some(threshold) = cli.strong_hash_threshold {
            self.strong_hash_threshold = threshold;
            self.uniform_hash = false;
        }
        if cli.uniform_hash {
            self.uniform_hash = true;
        }
        if let Some(ref names) = cli.ignore_names {
            self.ignore_names.clone_from(names);
        }
        if let Some(ref regex) = cli.ignore_regex {
            self.ignore_regex = Some(regex.clone());
        }
        if cli.trash {
            self.trash = true;
        }
        if let Some(theme) = cli.theme {
            self.theme = theme;
        }
    }

    /// Compile the ignore rules.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidPattern`] for a bad regex.
    pub fn scan_config(&self) -> Result<ScanConfig, ScanError> {
        ScanConfig::new(self.ignore_names.iter().cloned(), self.ignore_regex.as_deref())
    }

    /// Size above which BLAKE3 is used, `None` when hashing is uniform.
    #[must_use]
    pub fn strong_threshold(&self) -> Option<u64> {
        (!self.uniform_hash).then_some(self.strong_hash_threshold)
    }

    /// Finder settings derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidPattern`] for a bad regex.
    pub fn finder_config(&self) -> Result<FinderConfig, ScanError> {
        Ok(FinderConfig::default()
            .with_workers(self.workers)
            .with_max_buckets(self.max_buckets)
            .with_buffer_size(self.buffer_size)
            .with_strong_hash_threshold(self.strong_threshold())
            .with_scan_config(self.scan_config()?))
    }

    /// Deletion settings derived from this configuration.
    #[must_use]
    pub fn delete_config(&self) -> DeleteConfig {
        if self.trash {
            DeleteConfig::trash()
        } else {
            DeleteConfig::permanent()
        }
    }
}
