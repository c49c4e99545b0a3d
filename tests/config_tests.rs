//! Integration tests for layered configuration.
//!
//! These tests cover defaults, TOML file parsing, `DUPEWALK_*` environment
//! overrides, CLI flag overrides and validation.

use clap::Parser;
use dupewalk::cli::{Cli, OutputFormat};
use dupewalk::config::{Config, ConfigError};
use dupewalk::tui::ThemeChoice;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

// =============================================================================
// Helper Functions
// =============================================================================

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all DUPEWALK_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DUPEWALK_") {
            std::env::remove_var(key);
        }
    }
    std::env::remove_var("NO_COLOR");
}

// =============================================================================
// File Layer
// =============================================================================

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
workers = 8
max_buckets = 2
strong_hash_threshold = 1048576
ignore_names = [".git", "target"]
ignore_regex = '\.bak$'
trash = true
theme = "light"
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    assert_eq!(config.workers, 8);
    assert_eq!(config.max_buckets, 2);
    assert_eq!(config.strong_hash_threshold, 1_048_576);
    assert_eq!(config.ignore_names, vec![".git", "target"]);
    assert_eq!(config.ignore_regex.as_deref(), Some(r"\.bak$"));
    assert!(config.trash);
    assert_eq!(config.theme, ThemeChoice::Light);
    // Unset keys keep their defaults.
    assert_eq!(config.buffer_size, Config::default().buffer_size);
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();

    let config = Config::load_from_path(&temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_explicit_missing_file_fails() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();

    let err = Config::load(Some(&temp_dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_config_malformed_toml_fails() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "workers = \"many\"").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Figment(_)));
}

#[test]
fn test_config_zero_workers_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "workers = 0").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(err.to_string().contains("workers"));
}

// =============================================================================
// Environment Layer
// =============================================================================

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "workers = 8\nmax_buckets = 3").unwrap();

    std::env::set_var("DUPEWALK_WORKERS", "16");
    std::env::set_var("DUPEWALK_UNIFORM_HASH", "true");
    let config = Config::load_from_path(&config_path);
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.workers, 16);
    assert_eq!(config.max_buckets, 3);
    assert!(config.uniform_hash);
    assert_eq!(config.strong_threshold(), None);
}

#[test]
fn test_env_invalid_value_fails() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();

    std::env::set_var("DUPEWALK_MAX_BUCKETS", "lots");
    let result = Config::load_from_path(&temp_dir.path().join("config.toml"));
    clear_env();

    assert!(result.is_err());
}

// =============================================================================
// CLI Layer
// =============================================================================

#[test]
fn test_cli_overrides_env_and_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "workers = 8\ntheme = \"dark\"").unwrap();

    std::env::set_var("DUPEWALK_WORKERS", "16");
    let config = Config::load_from_path(&config_path);
    clear_env();
    let mut config = config.unwrap();

    let cli = Cli::parse_from([
        "dupewalk",
        "/data",
        "--workers",
        "2",
        "--ignore-names",
        "a,b",
        "--theme",
        "light",
    ]);
    config.merge_cli(&cli);

    assert_eq!(config.workers, 2);
    assert_eq!(config.ignore_names, vec!["a", "b"]);
    assert_eq!(config.theme, ThemeChoice::Light);
}

#[test]
fn test_cli_threshold_accepts_suffix() {
    let cli = Cli::parse_from(["dupewalk", ".", "--strong-hash-threshold", "64MiB"]);
    let mut config = Config::default();
    config.merge_cli(&cli);
    assert_eq!(config.strong_threshold(), Some(64 * 1024 * 1024));
}

#[test]
fn test_cli_uniform_conflicts_with_threshold() {
    let result = Cli::try_parse_from([
        "dupewalk",
        ".",
        "--uniform-hash",
        "--strong-hash-threshold",
        "1MiB",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_cli_interactive_conflicts_with_output() {
    assert!(Cli::try_parse_from(["dupewalk", ".", "-i", "--output", "json"]).is_err());
    let cli = Cli::parse_from(["dupewalk", ".", "-o", "json"]);
    assert_eq!(cli.output, OutputFormat::Json);
}

#[test]
fn test_finder_config_reflects_settings() {
    let config = Config {
        workers: 3,
        max_buckets: 5,
        uniform_hash: true,
        ignore_names: vec!["skip".to_string()],
        ..Config::default()
    };
    let finder = config.finder_config().unwrap();
    assert_eq!(finder.workers, 3);
    assert_eq!(finder.max_buckets, 5);
    assert_eq!(finder.strong_hash_threshold, None);
    assert!(finder.scan_config.is_ignored(std::path::Path::new("/x/skip")));
}
