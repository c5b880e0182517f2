//! # Pricing Configuration
//!
//! Configuration for the engine's shipping quote cache and the reference
//! tax/shipping strategies used by the quote preview tool.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HANKO_SHIPPING_CACHE_TTL_SECS=120                                  │
//! │     HANKO_TAX_RATE_BPS=1000                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/hanko-pricing/pricing.toml (Linux)                       │
//! │     ~/Library/Application Support/jp.hanko.pricing/pricing.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     5 minute cache TTL, 10% tax, ¥800 flat shipping                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [shipping_cache]
//! ttl_secs = 300
//!
//! [shipping]
//! base_fee = 800
//! per_kg_fee = 150
//! free_shipping_threshold = 11000
//!
//! [tax]
//! default_rate_bps = 1000
//! tax_shipping = true
//!
//! [tax.rates_by_code]
//! reduced = 800
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use hanko_core::validation::validate_tax_rate_bps;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::DEFAULT_TTL_SECS;

/// Longest allowed cache TTL (one day).
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid pricing configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Shipping quote cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// How long a shipping quote stays valid (seconds).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS as u64
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs.min(MAX_CACHE_TTL_SECS) as i64)
    }
}

/// Flat-rate shipping settings (minor units).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingSettings {
    #[serde(default = "default_base_fee")]
    pub base_fee: i64,

    /// Charged per started kilogram of shippable weight.
    #[serde(default)]
    pub per_kg_fee: i64,

    /// Orders whose discounted subtotal reaches this amount ship free.
    #[serde(default)]
    pub free_shipping_threshold: Option<i64>,
}

fn default_base_fee() -> i64 {
    800
}

impl Default for ShippingSettings {
    fn default() -> Self {
        ShippingSettings {
            base_fee: default_base_fee(),
            per_kg_fee: 0,
            free_shipping_threshold: None,
        }
    }
}

/// Rate-table tax settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSettings {
    #[serde(default = "default_rate_bps")]
    pub default_rate_bps: u32,

    /// Whether shipping is part of the taxable base.
    #[serde(default = "default_true")]
    pub tax_shipping: bool,

    /// Rates for specific item tax codes (e.g. `reduced = 800`).
    #[serde(default)]
    pub rates_by_code: BTreeMap<String, u32>,
}

fn default_rate_bps() -> u32 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            default_rate_bps: default_rate_bps(),
            tax_shipping: true,
            rates_by_code: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub shipping_cache: CacheSettings,

    #[serde(default)]
    pub shipping: ShippingSettings,

    #[serde(default)]
    pub tax: TaxSettings,
}

impl PricingConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (pricing.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading pricing config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document without touching the environment.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.shipping_cache.ttl_secs == 0 || self.shipping_cache.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "shipping_cache.ttl_secs must be between 1 and {MAX_CACHE_TTL_SECS}"
            )));
        }

        if self.shipping.base_fee < 0 || self.shipping.per_kg_fee < 0 {
            return Err(ConfigError::Invalid(
                "shipping fees must not be negative".into(),
            ));
        }

        if matches!(self.shipping.free_shipping_threshold, Some(t) if t < 0) {
            return Err(ConfigError::Invalid(
                "shipping.free_shipping_threshold must not be negative".into(),
            ));
        }

        validate_tax_rate_bps(self.tax.default_rate_bps)
            .map_err(|e| ConfigError::Invalid(format!("tax.default_rate_bps: {e}")))?;
        for (code, bps) in &self.tax.rates_by_code {
            validate_tax_rate_bps(*bps)
                .map_err(|e| ConfigError::Invalid(format!("tax.rates_by_code.{code}: {e}")))?;
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(ttl) = env_parse::<u64>("HANKO_SHIPPING_CACHE_TTL_SECS") {
            debug!(ttl, "Overriding shipping cache TTL from environment");
            self.shipping_cache.ttl_secs = ttl;
        }

        if let Some(bps) = env_parse::<u32>("HANKO_TAX_RATE_BPS") {
            debug!(bps, "Overriding default tax rate from environment");
            self.tax.default_rate_bps = bps;
        }

        if let Some(fee) = env_parse::<i64>("HANKO_SHIPPING_BASE_FEE") {
            self.shipping.base_fee = fee;
        }

        if let Some(fee) = env_parse::<i64>("HANKO_SHIPPING_PER_KG_FEE") {
            self.shipping.per_kg_fee = fee;
        }

        if let Some(threshold) = env_parse::<i64>("HANKO_FREE_SHIPPING_THRESHOLD") {
            self.shipping.free_shipping_threshold = Some(threshold);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("jp", "hanko", "pricing")
            .map(|dirs| dirs.config_dir().join("pricing.toml"))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PricingConfig::default();
        assert_eq!(config.shipping_cache.ttl_secs, 300);
        assert_eq!(config.shipping_cache.ttl(), chrono::Duration::minutes(5));
        assert_eq!(config.tax.default_rate_bps, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = PricingConfig::from_toml(
            r#"
            [shipping]
            per_kg_fee = 150
            free_shipping_threshold = 11000

            [tax.rates_by_code]
            reduced = 800
            "#,
        )
        .unwrap();

        assert_eq!(config.shipping.base_fee, 800);
        assert_eq!(config.shipping.per_kg_fee, 150);
        assert_eq!(config.shipping.free_shipping_threshold, Some(11000));
        assert_eq!(config.tax.rates_by_code.get("reduced"), Some(&800));
        assert_eq!(config.shipping_cache.ttl_secs, 300);
    }

    #[test]
    fn test_config_validation() {
        let mut config = PricingConfig::default();
        config.shipping_cache.ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = PricingConfig::default();
        config.tax.rates_by_code.insert("bad".into(), 20_000);
        assert!(config.validate().is_err());

        let mut config = PricingConfig::default();
        config.shipping.base_fee = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let err = PricingConfig::from_toml("[shipping\nbase_fee = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("hanko-pricing-does-not-exist.toml");
        let config = PricingConfig::load(Some(path)).unwrap();
        assert_eq!(config.shipping.base_fee, 800);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = PricingConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("[shipping_cache]"));
        assert!(toml_str.contains("[tax]"));
    }
}
