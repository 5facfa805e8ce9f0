//! Configuration for Aqua servers
//!
//! Settings are layered: built-in defaults, then an optional file
//! (`.toml`, `.json` or `.env`), then `AQUA_*` environment variables.
//! A `.env` file in the working directory is loaded into the environment
//! first when present.
//!
//! ```no_run
//! use aqua_config::ServerConfig;
//! use std::path::Path;
//!
//! let config = ServerConfig::load(Some(Path::new("aqua.toml"))).unwrap();
//! let options = config.into_options();
//! assert!(options.port > 0);
//! ```

pub mod env;
pub mod error;
pub mod loader;

pub use env::{ENV_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use aqua_core::ServerOptions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Listening address settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let defaults = ServerOptions::default();
        Self {
            host: defaults.host,
            port: defaults.port,
        }
    }
}

impl ServerConfig {
    /// Defaults, then `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(dotenv) = dotenvy::dotenv() {
            debug!(path = %dotenv.display(), "Loaded .env file");
        }

        let mut settings = Map::new();
        if let Some(path) = path {
            settings.extend(ConfigLoader::auto(path)?.load_file(path)?);
            debug!(path = %path.display(), "Loaded configuration file");
        }
        settings.extend(EnvLoader::default().load());

        let config = Self::from_settings(settings)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from already-gathered settings, coercing string values
    /// (as found in `.env` files and the environment) to their field types.
    pub fn from_settings(settings: Map<String, Value>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = settings.get("host") {
            config.host = match host {
                Value::String(s) => s.clone(),
                other => return Err(ConfigError::Invalid(format!("host must be a string, got {}", other))),
            };
        }

        if let Some(port) = settings.get("port") {
            config.port = match port {
                Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
            .ok_or_else(|| ConfigError::Invalid(format!("port must be 0-65535, got {}", port)))?;
        }

        Ok(config)
    }

    /// Reject settings that cannot be listened on.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".to_string()));
        }
        Ok(())
    }

    pub fn into_options(self) -> ServerOptions {
        ServerOptions::new().host(self.host).port(self.port)
    }
}
