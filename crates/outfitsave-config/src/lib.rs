//! Configuration loading and types for outfitsave.
//!
//! This crate is responsible for:
//! - Defining the configuration model used by the daemon and server
//! - Loading configuration from TOML files
//! - Providing a default search strategy (`/etc/outfitsave/outfitsave.toml`,
//!   `./outfitsave.toml`)
//! - Applying the `OUTFITSAVE_BASE_URL` environment override for the public
//!   origin used in share links

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use outfitsave_core::{AllocatorSettings, OutfitSaveError, Result};

/// Environment variable that overrides `share.base_url`.
pub const BASE_URL_ENV: &str = "OUTFITSAVE_BASE_URL";

/// Root configuration struct for outfitsave.
#[derive(Debug, Clone, Deserialize)]
pub struct OutfitSaveConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Share link generation.
    #[serde(default)]
    pub share: ShareConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

impl OutfitSaveConfig {
    /// Perform structural validation of the configuration.
    pub fn validate(&self) -> Result<()> {
        self.validate_server()?;
        self.validate_share()?;
        Ok(())
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` to read variables.
    ///
    /// Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("share.base_url overridden by {}", BASE_URL_ENV);
            self.share.base_url = base_url.trim().to_string();
        }
    }

    /// Parsed bind address. Call [`validate`](Self::validate) first.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind_addr.trim().parse().map_err(|err| {
            OutfitSaveError::invalid_config(
                "server.bind_addr".to_string(),
                format!("'{}' is not a socket address: {}", self.server.bind_addr, err),
            )
        })
    }

    /// Allocator settings derived from the `[share]` section.
    pub fn allocator_settings(&self) -> AllocatorSettings {
        AllocatorSettings {
            max_attempts: self.share.max_attempts,
            suffix_len: self.share.suffix_len,
        }
    }

    /// Whether `/metrics` should be served.
    pub fn metrics_enabled(&self) -> bool {
        self.telemetry
            .as_ref()
            .map(|t| !t.disable_metrics)
            .unwrap_or(true)
    }

    fn validate_server(&self) -> Result<()> {
        self.bind_addr().map(|_| ())
    }

    fn validate_share(&self) -> Result<()> {
        let base_url = self.share.base_url.trim();
        if base_url.is_empty() {
            return Err(OutfitSaveError::invalid_config(
                "share.base_url".to_string(),
                format!("share.base_url must not be empty (or set {})", BASE_URL_ENV),
            ));
        }

        let parsed = Url::parse(base_url).map_err(|err| {
            OutfitSaveError::invalid_config(
                "share.base_url".to_string(),
                format!("'{}' is not a valid URL: {}", base_url, err),
            )
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(OutfitSaveError::invalid_config(
                "share.base_url",
                "share.base_url must start with http:// or https://",
            ));
        }

        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(OutfitSaveError::invalid_config(
                "share.base_url",
                "share.base_url must not carry a query or fragment",
            ));
        }

        if self.share.max_attempts == 0 {
            return Err(OutfitSaveError::invalid_config(
                "share.max_attempts",
                "share.max_attempts must be at least 1",
            ));
        }

        if !(MIN_SUFFIX_LEN..=MAX_SUFFIX_LEN).contains(&self.share.suffix_len) {
            return Err(OutfitSaveError::invalid_config(
                "share.suffix_len".to_string(),
                format!(
                    "share.suffix_len must be between {} and {} (got {})",
                    MIN_SUFFIX_LEN, MAX_SUFFIX_LEN, self.share.suffix_len
                ),
            ));
        }

        Ok(())
    }
}

const MIN_SUFFIX_LEN: usize = 4;
const MAX_SUFFIX_LEN: usize = 16;

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Address the HTTP server binds on. Defaults to `0.0.0.0:3000`.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// `[share]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareConfig {
    /// Public origin share links are built on, e.g. `https://outfitsave.app`.
    #[serde(default)]
    pub base_url: String,

    /// Path placed between the origin and the slug.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Slug candidates tried before a share request fails.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Length of the random slug suffix.
    #[serde(default = "default_suffix_len")]
    pub suffix_len: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            path_prefix: default_path_prefix(),
            max_attempts: default_max_attempts(),
            suffix_len: default_suffix_len(),
        }
    }
}

/// `[telemetry]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or filter expression; the CLI flag takes precedence.
    #[serde(default)]
    pub log_level: Option<String>,

    /// Turn off the `/metrics` route.
    #[serde(default)]
    pub disable_metrics: bool,
}

/// Load configuration from a specific file path.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<OutfitSaveConfig> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref).map_err(|err| {
        OutfitSaveError::config(format!(
            "failed to read config file '{}': {}",
            path_ref.display(),
            err
        ))
    })?;

    parse(&contents).map_err(|err| {
        OutfitSaveError::invalid_config(path_ref.display().to_string(), err.to_string())
    })
}

/// Parse configuration from a TOML string.
pub fn parse(contents: &str) -> Result<OutfitSaveConfig> {
    toml::from_str(contents)
        .map_err(|err| OutfitSaveError::config(format!("failed to parse config: {}", err)))
}

/// Attempt to load configuration using the default search strategy.
///
/// Current strategy (in order):
/// 1. `/etc/outfitsave/outfitsave.toml`
/// 2. `./outfitsave.toml` (in the current working directory)
pub fn load_default() -> Result<OutfitSaveConfig> {
    let candidates = [
        PathBuf::from("/etc/outfitsave/outfitsave.toml"),
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("outfitsave.toml"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return load_from_path(candidate);
        }
    }

    Err(OutfitSaveError::ConfigNotFound(
        "/etc/outfitsave/outfitsave.toml or ./outfitsave.toml".to_string(),
    ))
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_path_prefix() -> String {
    "/outfits/share".to_string()
}

fn default_max_attempts() -> u32 {
    outfitsave_core::DEFAULT_MAX_ATTEMPTS
}

fn default_suffix_len() -> usize {
    outfitsave_core::slug::DEFAULT_SUFFIX_LEN
}
