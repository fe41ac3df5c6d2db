//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests that manipulate FOODFINDER_* environment variables are marked with
//! #[serial] so they never run in parallel with each other.

use foodfinder_common::config::{
    load_or_default, load_toml_config, resolve_api_base_url, resolve_map_api_key,
    write_toml_config, TomlConfig, API_URL_ENV, DEFAULT_API_BASE_URL, MAP_API_KEY_ENV,
};
use serial_test::serial;
use std::env;
use tempfile::TempDir;

#[test]
#[serial]
fn test_api_url_defaults_to_localhost() {
    env::remove_var(API_URL_ENV);

    let url = resolve_api_base_url(None, &TomlConfig::default());
    assert_eq!(url, DEFAULT_API_BASE_URL);
}

#[test]
#[serial]
fn test_api_url_priority_cli_env_toml() {
    let toml_config = TomlConfig {
        api_base_url: Some("http://toml.example".to_string()),
        ..Default::default()
    };

    env::remove_var(API_URL_ENV);
    assert_eq!(resolve_api_base_url(None, &toml_config), "http://toml.example");

    env::set_var(API_URL_ENV, "http://env.example/");
    assert_eq!(resolve_api_base_url(None, &toml_config), "http://env.example");

    assert_eq!(
        resolve_api_base_url(Some("http://cli.example"), &toml_config),
        "http://cli.example"
    );

    env::remove_var(API_URL_ENV);
}

#[test]
#[serial]
fn test_blank_values_are_skipped() {
    env::set_var(API_URL_ENV, "   ");
    let toml_config = TomlConfig {
        api_base_url: Some("".to_string()),
        ..Default::default()
    };

    assert_eq!(resolve_api_base_url(Some(""), &toml_config), DEFAULT_API_BASE_URL);

    env::remove_var(API_URL_ENV);
}

#[test]
#[serial]
fn test_map_api_key_env_over_toml() {
    let mut toml_config = TomlConfig::default();
    toml_config.map.api_key = Some("toml-key".to_string());

    env::remove_var(MAP_API_KEY_ENV);
    assert_eq!(resolve_map_api_key(&toml_config).as_deref(), Some("toml-key"));

    env::set_var(MAP_API_KEY_ENV, "env-key");
    assert_eq!(resolve_map_api_key(&toml_config).as_deref(), Some("env-key"));

    env::remove_var(MAP_API_KEY_ENV);
    assert_eq!(resolve_map_api_key(&TomlConfig::default()), None);
}

#[test]
fn test_write_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let mut config = TomlConfig {
        api_base_url: Some("http://food.example:8000".to_string()),
        search_radius_m: Some(2500),
        ..Default::default()
    };
    config.geolocation.endpoint = Some("http://ip-api.com/json".to_string());
    config.map.default_center.lat = 48.85;

    write_toml_config(&config, &path).unwrap();
    assert!(!path.with_extension("toml.tmp").exists());

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    assert_eq!(load_or_default(Some(&path)), TomlConfig::default());
}

#[test]
fn test_malformed_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "api_base_url = [not toml").unwrap();

    assert!(load_toml_config(&path).is_err());
    assert_eq!(load_or_default(Some(&path)), TomlConfig::default());
}
