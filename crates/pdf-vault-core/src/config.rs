use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable prefix, e.g. `PDF_VAULT__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "PDF_VAULT";

/// Default upload limit (50 MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory that holds uploaded PDF files
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads/pdfs")
}

const fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog database directory (defaults to ~/.local/share/pdf-vault/catalog)
    pub path: Option<PathBuf>,
}

impl CatalogConfig {
    /// Resolved database location.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(crate::util::default_catalog_path)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Blob storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Document catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a single TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load layered configuration.
    ///
    /// Later sources override earlier ones:
    /// 1. built-in defaults
    /// 2. `~/.config/pdf-vault/config.toml`
    /// 3. `./config.toml`
    /// 4. `PDF_VAULT__SECTION__KEY` environment variables
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-vault").join("config.toml");
            if user_config.exists() {
                tracing::debug!("Loading config from {}", user_config.display());
            }
            builder = builder.add_source(config::File::from(user_config).required(false));
        }

        builder = builder
            .add_source(config::File::from(PathBuf::from("config.toml")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service unusable.
    pub fn validate(&self) -> Result<()> {
        if self.storage.max_file_size == 0 {
            return Err(Error::ConfigInvalid {
                field: "storage.max_file_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.storage.upload_dir.as_os_str().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "storage.upload_dir".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Render as TOML (used by `pdf-vault config`).
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::ConfigLoad(e.to_string()))
    }
}
