use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use axum::http::HeaderValue;
use serde::Deserialize;

use crate::storage::StorageConfig;
use crate::upload::EchoConfig;

const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub server: ServerConfig,
    pub storage: StorageSection,
    pub upload: UploadSection,
    pub cors: CorsSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("CHADSVASC_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CHADSVASC")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.finish()
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.finish()
    }

    fn finish(mut self) -> Result<Self> {
        if self.logging.level.trim().is_empty() {
            self.logging.level = "info".to_string();
        }

        self.app.api_prefix = normalize_prefix(&self.app.api_prefix);

        let openapi_url = self.app.openapi_url.trim();
        if !openapi_url.is_empty() && !openapi_url.starts_with('/') {
            bail!("app.openapi_url must start with '/': {}", openapi_url);
        }
        self.app.openapi_url = openapi_url.to_string();

        let origins = &mut self.cors.allowed_origins;
        origins.iter_mut().for_each(|origin| *origin = origin.trim().to_string());
        if origins.iter().any(|origin| origin == "*") {
            // A lone wildcard is the same as an empty list; tower-http refuses "*" inside a list
            if origins.len() > 1 {
                bail!("cors.allowed_origins cannot mix \"*\" with explicit origins");
            }
            origins.clear();
        }
        for origin in origins.iter() {
            if HeaderValue::from_str(origin).is_err() {
                bail!("cors.allowed_origins contains an invalid origin: {}", origin);
            }
        }

        if self.upload.max_body_bytes == 0 {
            bail!("upload.max_body_bytes must be greater than zero");
        }
        if self.upload.io_timeout_secs == 0 {
            bail!("upload.io_timeout_secs must be greater than zero");
        }

        Ok(self)
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            root_path: PathBuf::from(&self.storage.root_path),
        }
    }

    pub fn echo_config(&self) -> EchoConfig {
        EchoConfig {
            io_timeout: Duration::from_secs(self.upload.io_timeout_secs),
            retain: self.upload.retain,
        }
    }
}

/// `"api/v1/"` -> `"/api/v1"`, `"/"` -> `""`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub title: String,
    pub description: String,
    pub version: String,
    pub openapi_url: String,
    pub debug: bool,
    pub api_prefix: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            title: "CHA₂DS₂-VASc API".to_string(),
            description: "Stroke risk scoring for atrial fibrillation".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            openapi_url: "/openapi.json".to_string(),
            debug: false,
            api_prefix: "/api/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub node_id: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            node_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub root_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root_path: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub max_body_bytes: usize,
    pub io_timeout_secs: u64,
    pub retain: bool,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            io_timeout_secs: 30,
            retain: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsSection {
    pub enabled: bool,
    pub allow_credentials: bool,
    /// Empty means every origin is accepted
    pub allowed_origins: Vec<String>,
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_credentials: true,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}
