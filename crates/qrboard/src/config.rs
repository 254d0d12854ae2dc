//! Configuration management for qrboard.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::content::{ContentRecord, DEFAULT_MESSAGE, DEFAULT_TITLE};
use crate::error::{Error, Result};
use crate::store::StoreBackend;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "qrboard";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "content.db";

/// Largest QR module edge, in pixels, that we are willing to render.
const MAX_MODULE_SIZE: u32 = 64;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables prefixed with `QRBOARD_` (nested keys use `__`)
/// 2. `APP_URL`, which sets `server.base_url`
/// 3. TOML config file at `~/.config/qrboard/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Default content configuration.
    pub content: ContentConfig,
    /// QR rendering configuration.
    pub qr: QrConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Public URL of the deployment. The QR code points at this URL
    /// with `?view=content` appended.
    pub base_url: String,
    /// Upper bound on how long a single connection may stay open.
    pub request_timeout_secs: u64,
    /// Largest accepted request body in bytes.
    pub max_body_size: u64,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which content store backs the application.
    pub backend: StoreBackend,
    /// Path to the database file (durable backend only).
    /// Defaults to `~/.local/share/qrboard/content.db`
    pub database_path: Option<PathBuf>,
}

/// Content shown before anyone has written a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Title of the default record.
    pub default_title: String,
    /// Message of the default record.
    pub default_message: String,
}

/// QR rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Edge length of one QR module in pixels.
    pub module_size: u32,
    /// Smallest symbol version to emit; larger payloads grow past it.
    pub min_version: i16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "http://localhost:8080/".to_string(),
            request_timeout_secs: 30,
            max_body_size: 64 * 1024,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
            default_message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            module_size: 10,
            min_version: 5,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing, or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(
                Env::raw()
                    .only(&["APP_URL"])
                    .map(|_| "server.base_url".into()),
            )
            .merge(Env::prefixed("QRBOARD_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }

        if self.server.max_body_size == 0 {
            return Err(invalid("server.max_body_size must be greater than 0"));
        }

        if self.qr.module_size == 0 || self.qr.module_size > MAX_MODULE_SIZE {
            return Err(invalid(format!(
                "qr.module_size must be between 1 and {MAX_MODULE_SIZE}, got {}",
                self.qr.module_size
            )));
        }

        if !(1..=40).contains(&self.qr.min_version) {
            return Err(invalid(format!(
                "qr.min_version must be between 1 and 40, got {}",
                self.qr.min_version
            )));
        }

        if self.content.default_title.trim().is_empty()
            || self.content.default_message.trim().is_empty()
        {
            return Err(invalid(
                "content.default_title and content.default_message must not be empty",
            ));
        }

        Ok(())
    }

    /// Parse the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or is not http(s).
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.server.base_url).map_err(|e| {
            invalid(format!(
                "server.base_url '{}' is not a valid URL: {e}",
                self.server.base_url
            ))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!(
                "server.base_url must use http or https, got '{other}'"
            ))),
        }
    }

    /// Get the socket address the server binds to.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.host` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| invalid(format!("server.host '{}': {e}", self.server.host)))
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// The record served before any write.
    #[must_use]
    pub fn default_record(&self) -> ContentRecord {
        ContentRecord::new(
            self.content.default_title.clone(),
            self.content.default_message.clone(),
        )
    }

    /// Get the per-connection timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}
