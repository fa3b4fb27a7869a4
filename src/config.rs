use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a config file that replaces the embedded one.
pub const CONFIG_PATH_ENV: &str = "ROTOM_DEX_CONFIG";

const DEFAULT_CONFIG: &str = include_str!("../config/config.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    pub pokemon: PokemonConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PokemonConfig {
    pub api_url: String,
    /// Seconds allowed for a single JSON resource.
    pub timeout: u32,
    /// Seconds allowed for the full name index, which is a much larger body.
    pub index_timeout: u32,
    pub total_pokemon: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl PokemonConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout))
    }

    pub fn index_request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.index_timeout))
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// The configuration compiled into the binary.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&source)
    }

    /// Reads the file named by `ROTOM_DEX_CONFIG`, falling back to the embedded config.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                tracing::info!("Loading configuration from {}", path);
                Self::from_file(path.trim())
            }
            _ => Self::embedded(),
        }
    }
}
