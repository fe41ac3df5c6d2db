//! Configuration loading and backend URL resolution
//!
//! Resolution priority for the backend base URL:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `FOODFINDER_API_URL`
//! 3. TOML config file
//! 4. Compiled default (`http://localhost:8000`)
//!
//! A missing or unreadable config file never aborts startup: the loader logs a
//! warning and falls back to compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Compiled default backend address
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Environment variable overriding the backend base URL
pub const API_URL_ENV: &str = "FOODFINDER_API_URL";

/// Environment variable carrying the map widget API key
pub const MAP_API_KEY_ENV: &str = "FOODFINDER_MAP_API_KEY";

/// Upload ceiling for images (10 MB)
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Per-request timeout for backend calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How long to wait for a location fix before searching without one
pub const DEFAULT_GEOLOCATION_TIMEOUT_MS: u64 = 10_000;

/// Default map provider used for "get directions" links
pub const DEFAULT_MAP_PROVIDER_URL: &str = "https://yandex.com/maps";

/// TOML configuration file contents
///
/// Every field is optional on disk; absent sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Backend base URL (e.g. `http://localhost:8000`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Largest accepted image upload in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_image_bytes: Option<u64>,

    /// Search radius forwarded to the restaurant search (metres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_radius_m: Option<u32>,

    pub geolocation: GeolocationConfig,
    pub map: MapConfig,
    pub logging: LoggingConfig,
}

/// `[geolocation]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// IP geolocation endpoint returning `{ "lat": .., "lon": .. }`.
    /// No endpoint means the location capability is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bounded wait for a location fix (milliseconds)
    pub timeout_ms: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: DEFAULT_GEOLOCATION_TIMEOUT_MS,
        }
    }
}

/// `[map]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Map widget API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the external map used for directions
    pub provider_url: String,

    /// Widget language (e.g. "en_RU")
    pub language: String,

    /// Centre used when there is nothing to show
    pub default_center: CenterConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider_url: DEFAULT_MAP_PROVIDER_URL.to_string(),
            language: "en_RU".to_string(),
            default_center: CenterConfig::default(),
        }
    }
}

/// Map centre in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterConfig {
    pub lat: f64,
    pub lon: f64,
}

impl Default for CenterConfig {
    fn default() -> Self {
        // Moscow city centre
        Self {
            lat: 55.7558,
            lon: 37.6173,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is unset
    pub level: String,

    /// Optional log file; stderr when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

impl TomlConfig {
    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    pub fn max_image_bytes(&self) -> u64 {
        self.max_image_bytes
            .filter(|bytes| *bytes > 0)
            .unwrap_or(DEFAULT_MAX_IMAGE_BYTES)
    }
}

/// Platform config file location: `<config_dir>/foodfinder/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("foodfinder").join("config.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Load the config file, falling back to defaults on any problem
///
/// `path` of `None` means the platform default location.
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(p) => p,
        None => {
            warn!("Could not determine config directory, using defaults");
            return TomlConfig::default();
        }
    };

    if !path.exists() {
        debug!("Config file not found at {}, using defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!(
                "Ignoring config file {} ({}), using defaults",
                path.display(),
                e
            );
            TomlConfig::default()
        }
    }
}

/// Write config to disk atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolve backend base URL from CLI → ENV → TOML → compiled default
///
/// The returned URL never ends with a slash.
pub fn resolve_api_base_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> String {
    let env_value = std::env::var(API_URL_ENV).ok();

    let (url, source) = if let Some(url) = cli_arg.filter(|v| is_valid_value(v)) {
        (url.to_string(), "command line")
    } else if let Some(url) = env_value.filter(|v| is_valid_value(v)) {
        (url, "environment")
    } else if let Some(url) = toml_config
        .api_base_url
        .as_deref()
        .filter(|v| is_valid_value(v))
    {
        (url.to_string(), "TOML")
    } else {
        (DEFAULT_API_BASE_URL.to_string(), "default")
    };

    let url = url.trim().trim_end_matches('/').to_string();
    debug!(api_base_url = %url, source, "Resolved backend base URL");
    url
}

/// Resolve map widget API key from ENV → TOML
pub fn resolve_map_api_key(toml_config: &TomlConfig) -> Option<String> {
    std::env::var(MAP_API_KEY_ENV)
        .ok()
        .filter(|v| is_valid_value(v))
        .or_else(|| {
            toml_config
                .map
                .api_key
                .clone()
                .filter(|v| is_valid_value(v))
        })
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}
