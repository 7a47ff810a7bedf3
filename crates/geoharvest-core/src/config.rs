//! Configuration types for the harvester components.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// HTTP client configuration for external API calls.
pub struct HttpConfig {
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Harvester Configuration (harvester.toml)
// =============================================================================

/// Root configuration structure for harvester.toml.
///
/// # Example
///
/// ```toml
/// [geogratis]
/// base_url = "http://geogratis.gc.ca/api"
/// page_size = 100
///
/// [csw]
/// url = "http://csw.open.canada.ca/geonetwork/srv/csw"
///
/// [scan]
/// request_delay_ms = 300
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvesterConfig {
    /// Product feed settings.
    #[serde(default)]
    pub geogratis: GeogratisConfig,
    /// CSW catalog settings.
    #[serde(default)]
    pub csw: CswConfig,
    /// Batch behavior settings.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Product feed endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeogratisConfig {
    /// Base URL of the feed API.
    #[serde(default = "default_geogratis_base_url")]
    pub base_url: String,
    /// Products requested per feed page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_geogratis_base_url() -> String {
    "http://geogratis.gc.ca/api".to_string()
}

fn default_page_size() -> u32 {
    100
}

impl Default for GeogratisConfig {
    fn default() -> Self {
        Self {
            base_url: default_geogratis_base_url(),
            page_size: default_page_size(),
        }
    }
}

/// CSW catalog endpoint settings. The endpoint requires credentials in
/// some deployments; both are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CswConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Batch behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Fixed delay between provider requests, in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Raw records pulled per conversion batch.
    #[serde(default = "default_convert_page_size")]
    pub convert_page_size: u32,
}

fn default_request_delay_ms() -> u64 {
    300
}

fn default_convert_page_size() -> u32 {
    10
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            convert_page_size: default_convert_page_size(),
        }
    }
}

impl ScanConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "harvester.toml";

/// Returns the default configuration directory path.
///
/// Uses XDG Base Directory specification: `~/.config/geoharvest/`
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("geoharvest"))
}

/// Returns the default configuration file path.
///
/// Path: `~/.config/geoharvest/harvester.toml`
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join(CONFIG_FILE_NAME))
}

/// Default template content for a new harvester.toml file.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Harvester configuration
#
# Usage:
#   geoharvest scan --source gr            # Full feed scan
#   geoharvest scan --source gr --monitor  # Resume from the saved link
#   geoharvest convert --source gr         # Convert scanned records
#
# All values below are the defaults.

[geogratis]
base_url = "http://geogratis.gc.ca/api"
page_size = 100

[csw]
# url = "http://csw.example.gc.ca/geonetwork/srv/csw"
# username = ""
# password = ""

[scan]
request_delay_ms = 300
convert_page_size = 10
"#;

/// Load harvester configuration from a TOML file.
///
/// # Arguments
/// * `path` - Optional custom path. If `None`, uses the default XDG path.
///
/// # Behavior
/// If no configuration file exists at the default path, a template file
/// is created and built-in defaults are returned. A custom path that
/// does not exist is an error.
pub fn load_harvester_config(path: Option<PathBuf>) -> Result<HarvesterConfig, AppError> {
    let using_default_path = path.is_none();
    let config_path = match path {
        Some(p) => p,
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(HarvesterConfig::default()),
        },
    };

    if !config_path.exists() {
        if using_default_path {
            if let Err(e) = create_default_config(&config_path) {
                tracing::warn!("Could not create default config template: {}", e);
            }
            return Ok(HarvesterConfig::default());
        }
        return Err(AppError::ConfigError(format!(
            "Config file not found: {}",
            config_path.display()
        )));
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        AppError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            config_path.display(),
            e
        ))
    })?;

    let config: HarvesterConfig = toml::from_str(&content).map_err(|e| {
        AppError::ConfigError(format!(
            "Invalid TOML in '{}': {}",
            config_path.display(),
            e
        ))
    })?;

    Ok(config)
}

/// Create a default configuration file with a template, creating the
/// parent directory if needed.
fn create_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
    tracing::info!("Created default config template at: {}", path.display());
    Ok(())
}
