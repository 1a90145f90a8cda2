//! Tests for config file discovery and loading
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate GEOLOC_CONFIG are marked with #[serial].

use geoloc_common::config::{
    load_module_config, ConfigFileLocator, ConfigSource, LoggingConfig, DEFAULT_CONFIG_ENV_VAR,
};
use geoloc_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use tempfile::TempDir;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct SampleConfig {
    name: Option<String>,
    workers: Option<usize>,
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_env_var_used_when_no_cli_arg() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sample.toml");
    std::fs::write(&path, "name = \"from-env\"\n").unwrap();
    env::set_var(DEFAULT_CONFIG_ENV_VAR, &path);

    let locator = ConfigFileLocator::new("geoloc-test-module");
    let (found, source) = locator.locate(None).unwrap();
    assert_eq!(found, path);
    assert_eq!(source, ConfigSource::Environment);

    env::remove_var(DEFAULT_CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_arg_overrides_env_var() {
    env::set_var(DEFAULT_CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cli.toml");
    std::fs::write(&path, "name = \"from-cli\"\nworkers = 4\n").unwrap();

    let locator = ConfigFileLocator::new("geoloc-test-module");
    let config: SampleConfig = load_module_config(&locator, Some(&path)).unwrap();
    assert_eq!(config.name.as_deref(), Some("from-cli"));
    assert_eq!(config.workers, Some(4));
    assert_eq!(config.logging, LoggingConfig::default());

    env::remove_var(DEFAULT_CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_no_config_file_uses_defaults() {
    env::remove_var(DEFAULT_CONFIG_ENV_VAR);

    let locator = ConfigFileLocator::new("geoloc-test-module-that-does-not-exist");
    let config: SampleConfig = load_module_config(&locator, None).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.toml");

    let locator = ConfigFileLocator::new("geoloc-test-module");
    let result: Result<SampleConfig, _> = load_module_config(&locator, Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_unparsable_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "name = [unterminated").unwrap();

    let locator = ConfigFileLocator::new("geoloc-test-module");
    let result: Result<SampleConfig, _> = load_module_config(&locator, Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_logging_section_parsed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("logging.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let locator = ConfigFileLocator::new("geoloc-test-module");
    let config: SampleConfig = load_module_config(&locator, Some(&path)).unwrap();
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_custom_env_var_name() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("custom.toml");
    std::fs::write(&path, "workers = 2\n").unwrap();
    env::set_var("GEOLOC_TEST_CUSTOM_CONFIG", &path);

    let locator = ConfigFileLocator::new("geoloc-test-module").with_env_var("GEOLOC_TEST_CUSTOM_CONFIG");
    let config: SampleConfig = load_module_config(&locator, None).unwrap();
    assert_eq!(config.workers, Some(2));

    env::remove_var("GEOLOC_TEST_CUSTOM_CONFIG");
}
