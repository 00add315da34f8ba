//! Tunables of the synchronization core.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Cooldown applied to long-running refresh jobs.
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(10 * 60);
/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Storage key of the persisted server snapshot.
pub const DEFAULT_STORAGE_KEY: &str = "mcp-storage";

const ENV_REFRESH_COOLDOWN: &str = "MCPDECK_REFRESH_COOLDOWN_SECS";
const ENV_SETTLE_DELAY: &str = "MCPDECK_SETTLE_DELAY_MS";
const ENV_PAGE_SIZE: &str = "MCPDECK_PAGE_SIZE";
const ENV_STORAGE_DIR: &str = "MCPDECK_STORAGE_DIR";

/// Runtime configuration for collection sync, job gating and persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Minimum interval between two refresh jobs on the same collection.
    pub refresh_cooldown: Duration,
    /// Delay before a scheduled forced refresh runs, letting input settle.
    pub settle_delay: Duration,
    /// Page size applied to new view queries.
    pub default_page_size: u32,
    /// Directory holding the durable key-value snapshot files.
    pub storage_dir: PathBuf,
    /// Key of the persisted server snapshot.
    pub storage_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
            settle_delay: Duration::ZERO,
            default_page_size: DEFAULT_PAGE_SIZE,
            storage_dir: PathBuf::from(".mcpdeck"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl SyncConfig {
    /// Overlay `MCPDECK_*` environment variables on the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable does not parse or the result
    /// fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup on the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value does not parse or the result
    /// fails validation.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_REFRESH_COOLDOWN) {
            config.refresh_cooldown =
                Duration::from_secs(parse_number(ENV_REFRESH_COOLDOWN, &raw)?);
        }
        if let Some(raw) = lookup(ENV_SETTLE_DELAY) {
            config.settle_delay = Duration::from_millis(parse_number(ENV_SETTLE_DELAY, &raw)?);
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            config.default_page_size =
                u32::try_from(parse_number(ENV_PAGE_SIZE, &raw)?).map_err(|_| {
                    ConfigError::InvalidField {
                        field: ENV_PAGE_SIZE,
                        value: raw.clone(),
                        reason: "value out of range",
                    }
                })?;
        }
        if let Some(raw) = lookup(ENV_STORAGE_DIR) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.storage_dir = PathBuf::from(trimmed);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject values the core cannot operate with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for a zero page size, a zero
    /// cooldown or a blank storage key.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_page_size == 0 {
            return Err(ConfigError::InvalidField {
                field: "default_page_size",
                value: "0".to_string(),
                reason: "page size must be positive",
            });
        }
        if self.refresh_cooldown.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "refresh_cooldown",
                value: "0".to_string(),
                reason: "cooldown must be positive",
            });
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "storage_key",
                value: self.storage_key.clone(),
                reason: "storage key must not be blank",
            });
        }
        Ok(())
    }
}

fn parse_number(field: &'static str, raw: &str) -> ConfigResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidField {
            field,
            value: raw.to_string(),
            reason: "expected a non-negative integer",
        })
}
