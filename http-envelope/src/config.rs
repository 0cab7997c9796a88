//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `ENVELOPE_`, `__` between nesting levels)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/http-envelope/{service_name}/config.toml
//! 4. System directory: /etc/http-envelope/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "orders"
//! debug = true
//!
//! [envelope]
//! version = "v2"
//!
//! [pagination]
//! default_page_size = 25
//!
//! [pagination.fields]
//! limit = "per_page"
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dispatch::{Dispatcher, DEFAULT_MAX_BODY_BYTES};
use crate::envelope::{Envelope, EnvelopeVersion};
use crate::error::{Error, Result};
use crate::pagination::{PaginationFields, DEFAULT_PAGE_SIZE};
use crate::registry::ErrorRegistry;

const APP_PREFIX: &str = "http-envelope";
const ENV_PREFIX: &str = "ENVELOPE_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Envelope protocol selection
    #[serde(default)]
    pub envelope: EnvelopeConfig,

    /// Pagination defaults
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Dispatch adapter settings
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log every request body before the handler runs
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            debug: false,
        }
    }
}

/// Envelope configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Wire protocol version
    #[serde(default)]
    pub version: EnvelopeVersion,
}

/// Pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when the request carries no usable limit
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Query parameter names
    #[serde(default)]
    pub fields: PaginationFields,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            fields: PaginationFields::default(),
        }
    }
}

/// Dispatch adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Largest request body buffered for debug logging
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_service_name() -> String {
    APP_PREFIX.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is inferred from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(default_service_name);

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later merges win
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the search path; environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot be used
    pub fn validate(&self) -> Result<()> {
        if self.pagination.default_page_size == 0 {
            return Err(Error::invalid_config(
                "pagination.default_page_size",
                "must be at least 1",
            ));
        }
        if self.dispatch.max_body_bytes == 0 {
            return Err(Error::invalid_config(
                "dispatch.max_body_bytes",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Candidate config file paths, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX);
        if let Some(path) = xdg_dirs.find_config_file(Path::new(service_name).join("config.toml")) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(APP_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    /// Where the config file for `service_name` should live
    ///
    /// Returns: ~/.config/http-envelope/{service_name}/config.toml
    pub fn recommended_path(service_name: &str) -> Option<PathBuf> {
        xdg::BaseDirectories::with_prefix(APP_PREFIX)
            .get_config_file(Path::new(service_name).join("config.toml"))
    }

    /// Create ~/.config/http-envelope/{service_name}/ if it doesn't exist
    pub fn create_config_dir(service_name: &str) -> Result<PathBuf> {
        let config_path = xdg::BaseDirectories::with_prefix(APP_PREFIX)
            .place_config_file(Path::new(service_name).join("config.toml"))
            .map_err(|e| Error::Internal(format!("Failed to create config directory: {}", e)))?;

        config_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Internal("Invalid config path".to_string()))
    }

    /// Build the configured envelope renderer
    #[must_use]
    pub fn renderer(&self, registry: ErrorRegistry) -> Envelope {
        Envelope::new(self.envelope.version, registry)
    }

    /// Build a dispatcher around the configured renderer
    #[must_use]
    pub fn dispatcher(&self, registry: ErrorRegistry) -> Dispatcher<Envelope> {
        Dispatcher::new(self.renderer(registry))
            .with_debug(self.service.debug)
            .with_max_body_bytes(self.dispatch.max_body_bytes)
    }
}
