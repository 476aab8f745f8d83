//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests cover:
//! - Missing config files SHALL NOT cause termination
//! - Priority order CLI → ENV → platform directory → defaults
//! - Round-trip of a written config through the loader
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate HERDBOOK_CONFIG are marked with #[serial].

use herdbook_common::config::{
    load_toml_config, write_toml_config, ConfigResolver, HerdbookConfig, ScoringModeConfig,
    CONFIG_ENV_VAR,
};
use herdbook_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_env_var_used_when_no_cli_path() {
    let test_path = "/tmp/herdbook-test-env/config.toml";
    env::set_var(CONFIG_ENV_VAR, test_path);

    let resolver = ConfigResolver::new(None);
    assert_eq!(resolver.resolve_path(), Some(PathBuf::from(test_path)));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_path_beats_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/herdbook-from-env.toml");

    let resolver = ConfigResolver::new(Some(PathBuf::from("/tmp/herdbook-from-cli.toml")));
    assert_eq!(
        resolver.resolve_path(),
        Some(PathBuf::from("/tmp/herdbook-from-cli.toml"))
    );

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_config_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let resolver = ConfigResolver::new(Some(PathBuf::from(format!(
        "/tmp/herdbook-definitely-missing-{}.toml",
        std::process::id()
    ))));
    let config = resolver.load().expect("missing file must not be an error");

    assert_eq!(config.scoring.direct_trait, "tpi");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_written_config_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = HerdbookConfig::default();
    config.scoring.mode = ScoringModeConfig::Custom;
    config.scoring.weights.insert("nm_dollar".to_string(), 2.0);
    config.ingest.aliases.insert("codigo".to_string(), "identifier".to_string());
    config.pedigree.concurrency = 3;

    write_toml_config(&config, &path).unwrap();
    assert!(path.exists());

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded.scoring.mode, ScoringModeConfig::Custom);
    assert_eq!(loaded.scoring.weights.get("nm_dollar"), Some(&2.0));
    assert_eq!(
        loaded.ingest.aliases.get("codigo").map(String::as_str),
        Some("identifier")
    );
    assert_eq!(loaded.pedigree.concurrency, 3);
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[scoring\nmode = ").unwrap();

    let result = ConfigResolver::new(Some(path)).load();
    assert!(result.is_err(), "parse failures must surface");
    assert!(result.unwrap_err().to_string().contains("Parse TOML failed"));
}

#[test]
fn test_config_errors_are_classified() {
    let dir = TempDir::new().unwrap();

    // Parent path is a regular file, so the directory cannot be created
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let err = write_toml_config(&HerdbookConfig::default(), &blocker.join("config.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "got {:?}", err);

    let err = load_toml_config(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {:?}", err);
    assert!(err.to_string().starts_with("Configuration error: Read TOML failed"));
}
