use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_RESOLVER_BASE_URL: &str = "https://viacep.com.br/ws/";
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.weatherapi.com/v1/current.json";
pub const DEFAULT_CLIMATE_SERVICE_URL: &str = "http://servico_b:8080";

/// Where the two upstream APIs live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Prefix the postal code is appended to, e.g. `https://viacep.com.br/ws/`.
    pub resolver_base_url: String,
    pub weather_base_url: String,
    /// Used when a request does not carry its own `apiKey`.
    pub weather_api_key: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            resolver_base_url: DEFAULT_RESOLVER_BASE_URL.to_string(),
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            weather_api_key: None,
        }
    }
}

/// How the front service reaches the back service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    pub climate_service_url: String,
    /// Weather API key sent on every forwarded request.
    pub internal_api_key: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            climate_service_url: DEFAULT_CLIMATE_SERVICE_URL.to_string(),
            internal_api_key: None,
        }
    }
}

impl RelayConfig {
    pub fn internal_api_key(&self) -> Result<&str> {
        self.internal_api_key.as_deref().filter(|key| !key.is_empty()).ok_or_else(|| {
            anyhow!(
                "No internal API key configured for the front service.\n\
                 Hint: run `clima configure` and enter the weather API key."
            )
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub otel_enabled: bool,
    pub otel_endpoint: String,
    /// Default filter directive; `RUST_LOG` wins when set.
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otel_enabled: false,
            otel_endpoint: "http://localhost:4317".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [upstream]
/// weather_api_key = "..."
///
/// [relay]
/// climate_service_url = "http://localhost:8080"
/// internal_api_key = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub relay: RelayConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "clima", "clima")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
