use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::VamosError;

pub const CONFIG_FILE_NAME: &str = "vamos-export.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub service: Option<ServiceEntry>,
    #[serde(default)]
    pub densified_locations: Option<String>,
    #[serde(default)]
    pub staging_path: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServiceEntry {
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub dates_path: Option<String>,
    #[serde(default)]
    pub locations_path: Option<String>,
    #[serde(default)]
    pub emissions_path: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub dates_path: String,
    pub locations_path: String,
    pub emissions_path: String,
    /// No timeout when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "141.76.16.144".to_string(),
            port: 20050,
            dates_path: "dates".to_string(),
            locations_path: "locations".to_string(),
            emissions_path: "emissions".to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub service: ServiceConfig,
    pub densified_locations: Utf8PathBuf,
    pub staging_path: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Uses `path` when given, then `vamos-export.json` in the working directory,
    /// then the user config directory, and falls back to built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, VamosError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };

        let Some(config_path) = config_path else {
            return Self::resolve_config(Config::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| VamosError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| VamosError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("vamos-export").join("config.json"))
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, VamosError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let defaults = ServiceConfig::default();
        let entry = config.service.unwrap_or_default();

        let service = ServiceConfig {
            scheme: entry.scheme.unwrap_or(defaults.scheme),
            host: entry.host.unwrap_or(defaults.host),
            port: entry.port.unwrap_or(defaults.port),
            dates_path: entry.dates_path.unwrap_or(defaults.dates_path),
            locations_path: entry.locations_path.unwrap_or(defaults.locations_path),
            emissions_path: entry.emissions_path.unwrap_or(defaults.emissions_path),
            timeout_secs: entry.timeout_secs,
        };
        if service.host.trim().is_empty() {
            return Err(VamosError::ConfigParse("service.host must not be empty".to_string()));
        }

        Ok(ResolvedConfig {
            schema_version,
            service,
            densified_locations: config
                .densified_locations
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| Utf8PathBuf::from("locations-mapped-densified.csv")),
            staging_path: config
                .staging_path
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| Utf8PathBuf::from("vamos_temp.sqlite")),
            output_dir: config
                .output_dir
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| Utf8PathBuf::from(".")),
        })
    }
}
