//! Configuration manager.

use std::fs::File;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    #[serde(default)]
    pub name: String,
    /// Where users are kept.
    #[serde(default)]
    pub store: StoreKind,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to log exporting.
    #[serde(skip_serializing)]
    pub telemetry: Option<Telemetry>,
}

/// Backend of the user store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Users live in process memory and vanish on exit.
    #[default]
    Memory,
    Postgres,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// OpenTelemetry configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    /// gRPC OTLP endpoint receiving logs, e.g. `http://localhost:4317`.
    pub otlp_endpoint: Option<String>,
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Loads the `config.yaml` file from the specified path or the default
    /// location.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be opened or is not valid YAML.
    pub fn load(&self) -> Result<Self, ConfigError> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            PathBuf::from(DEFAULT_CONFIG_PATH)
        };

        let file = File::open(&file_path)?;
        let mut config: Configuration = serde_yaml::from_reader(file)?;
        // set app version.
        config.version = VERSION.to_owned();
        config.path = file_path;

        Ok(config)
    }

    /// Return a default configuration as fallback.
    pub fn fallback() -> Self {
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}

/// Why `config.yaml` could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot open configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
