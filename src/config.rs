// Booking core configuration

use crate::memory::SAMPLE_CATALOG_PATH;
use crate::pricing::Rate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct BookingConfig {
    // Fixed rate applied to every subtotal
    pub tax_rate: Rate,
    // Platform share of every booking total
    pub commission_rate: Rate,
    pub reference_prefix: String,
    pub min_guests: u32,
    pub max_guests: u32,
    // Hotels and rooms loaded by the CLI
    pub catalog_path: PathBuf,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Rate::DEFAULT_TAX,
            commission_rate: Rate::DEFAULT_COMMISSION,
            reference_prefix: "HB".to_string(),
            min_guests: 1,
            max_guests: 10,
            catalog_path: PathBuf::from(SAMPLE_CATALOG_PATH),
        }
    }
}

impl BookingConfig {
    // Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tax_rate = match lookup("BOOKING_TAX_RATE") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid("BOOKING_TAX_RATE"))?,
            None => defaults.tax_rate,
        };

        let commission_rate = match lookup("BOOKING_COMMISSION_RATE") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid("BOOKING_COMMISSION_RATE"))?,
            None => defaults.commission_rate,
        };

        let reference_prefix = lookup("BOOKING_REFERENCE_PREFIX").unwrap_or(defaults.reference_prefix);
        if reference_prefix.is_empty() || !reference_prefix.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid("BOOKING_REFERENCE_PREFIX"));
        }

        let min_guests = match lookup("BOOKING_MIN_GUESTS") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid("BOOKING_MIN_GUESTS"))?,
            None => defaults.min_guests,
        };

        let max_guests = match lookup("BOOKING_MAX_GUESTS") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid("BOOKING_MAX_GUESTS"))?,
            None => defaults.max_guests,
        };

        if min_guests == 0 || min_guests > max_guests {
            return Err(ConfigError::GuestBounds {
                min: min_guests,
                max: max_guests,
            });
        }

        let catalog_path = lookup("BOOKING_CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_path);

        Ok(Self {
            tax_rate,
            commission_rate,
            reference_prefix,
            min_guests,
            max_guests,
            catalog_path,
        })
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid guest bounds: {min}..={max}")]
    GuestBounds { min: u32, max: u32 },
}
