//! Service configuration.
//!
//! Loaded from an optional `config.toml` merged over stock defaults, then
//! overridden by environment variables. Every field has a default, so a
//! deployment only needs to set what differs.
//!
//! ## Configuration Options
//!
//! ```toml
//! image_bucket = "images"            # Derivatives and read URLs   (IMAGE_BUCKET_NAME)
//! upload_bucket = "images"           # Write URLs                  (INPUT_IMAGE_BUCKET_NAME)
//! input_prefix = "input/"            # Where uploads land
//! log_level = "info"                 # tracing filter directive    (LOG_LEVEL)
//! function_name = "image-derivatives"
//!
//! [derivatives]
//! sizes = [50, 100, 500]             # Longer edge, in pixels
//! quality = 90                       # JPEG quality (1-100)
//!
//! [presign]
//! ttl_secs = 3600
//! allowed_extensions = ["jpg", "jpeg", "png"]
//!
//! [store]
//! root = ".image-derivatives-store"
//! signing_secret = "change-me"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use crate::types::DerivativeSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Environment variables that override file values.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_IMAGE_BUCKET: &str = "IMAGE_BUCKET_NAME";
pub const ENV_UPLOAD_BUCKET: &str = "INPUT_IMAGE_BUCKET_NAME";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Bucket holding sources and derivatives; download URLs point here.
    pub image_bucket: String,
    /// Bucket upload URLs grant writes to.
    pub upload_bucket: String,
    /// Key prefix for uploaded sources.
    pub input_prefix: String,
    pub log_level: String,
    /// Stamped on every request context.
    pub function_name: String,
    pub derivatives: DerivativesConfig,
    pub presign: PresignConfig,
    pub store: StoreConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            image_bucket: "images".to_string(),
            upload_bucket: "images".to_string(),
            input_prefix: "input/".to_string(),
            log_level: "info".to_string(),
            function_name: "image-derivatives".to_string(),
            derivatives: DerivativesConfig::default(),
            presign: PresignConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.derivatives.sizes.is_empty() {
            return Err(ConfigError::Validation(
                "derivatives.sizes must not be empty".into(),
            ));
        }
        if self.derivatives.sizes.contains(&0) {
            return Err(ConfigError::Validation(
                "derivatives.sizes values must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.derivatives.quality) {
            return Err(ConfigError::Validation(
                "derivatives.quality must be 1-100".into(),
            ));
        }
        if self.presign.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "presign.ttl_secs must be non-zero".into(),
            ));
        }
        if self.presign.allowed_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "presign.allowed_extensions must not be empty".into(),
            ));
        }
        for (name, bucket) in [
            ("image_bucket", &self.image_bucket),
            ("upload_bucket", &self.upload_bucket),
        ] {
            if bucket.is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(bucket) = lookup(ENV_IMAGE_BUCKET) {
            self.image_bucket = bucket;
        }
        if let Some(bucket) = lookup(ENV_UPLOAD_BUCKET) {
            self.upload_bucket = bucket;
        }
    }
}

/// Which derivatives each source produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivativesConfig {
    /// Longer-edge sizes, in output order.
    pub sizes: Vec<u32>,
    /// JPEG encoding quality (1 = worst, 100 = best). PNG is lossless.
    pub quality: u32,
}

impl Default for DerivativesConfig {
    fn default() -> Self {
        Self {
            sizes: vec![50, 100, 500],
            quality: 90,
        }
    }
}

impl DerivativesConfig {
    pub fn specs(&self) -> Vec<DerivativeSpec> {
        self.sizes.iter().copied().map(DerivativeSpec::new).collect()
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresignConfig {
    pub ttl_secs: u64,
    /// Extensions (without the dot) accepted in `image_name`. Case-sensitive.
    pub allowed_extensions: Vec<String>,
}

impl Default for PresignConfig {
    fn default() -> Self {
        Self {
            ttl_secs: crate::store::PRESIGN_TTL.as_secs(),
            allowed_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
        }
    }
}

impl PresignConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Local filesystem store used by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub root: String,
    /// Secret mixed into presigned URL signatures.
    pub signing_secret: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: ".image-derivatives-store".to_string(),
            signing_secret: "change-me".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ServiceConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge, apply environment overrides, deserialize and validate.
pub fn resolve_config(
    overlay: Option<toml::Value>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let mut config: ServiceConfig = merged.try_into()?;
    config.apply_env(lookup);
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in `dir` plus the process environment.
pub fn load_config(dir: &Path) -> Result<ServiceConfig, ConfigError> {
    resolve_config(load_raw_config(dir)?, |name| std::env::var(name).ok())
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Derivatives Configuration
# ===============================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Bucket holding source images and their derivatives.
# Download URLs are issued against it. Overridden by IMAGE_BUCKET_NAME.
image_bucket = "images"

# Bucket upload URLs grant writes to. Overridden by INPUT_IMAGE_BUCKET_NAME.
upload_bucket = "images"

# Key prefix uploaded sources are stored under.
input_prefix = "input/"

# Log filter, e.g. "debug" or "image_derivatives=debug,info".
# Overridden by LOG_LEVEL.
log_level = "info"

# Name stamped on every log record and request context.
function_name = "image-derivatives"

# ---------------------------------------------------------------------------
# Derivatives
# ---------------------------------------------------------------------------
[derivatives]
# Longer-edge sizes in pixels. Output keys are resized/<name>/<size><ext>.
sizes = [50, 100, 500]

# JPEG encoding quality (1 = worst, 100 = best). PNG output is lossless.
quality = 90

# ---------------------------------------------------------------------------
# Presigned URLs
# ---------------------------------------------------------------------------
[presign]
# Validity of issued URLs, in seconds.
ttl_secs = 3600

# Extensions accepted in image_name (case-sensitive, without the dot).
allowed_extensions = ["jpg", "jpeg", "png"]

# ---------------------------------------------------------------------------
# Local store (CLI)
# ---------------------------------------------------------------------------
[store]
# Objects are kept at <root>/<bucket>/<key>.
root = ".image-derivatives-store"

# Secret used to sign presigned file:// URLs.
signing_secret = "change-me"
"##
}
