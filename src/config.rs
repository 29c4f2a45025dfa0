// =============================================================================
// CONFIGURATION MODULE
// =============================================================================
// This module handles loading configuration from environment variables.
//
// LEARNING NOTES:
// - Environment variables are the standard way to configure containers
// - We parse them into a strongly-typed Config struct
// - This makes configuration errors obvious at startup, not runtime
// =============================================================================

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;

// -----------------------------------------------------------------------------
// CONFIG STRUCT
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 8003)
    pub port: u16,

    /// PostgreSQL connection URL of the row store.
    /// When unset the service runs against an in-memory store.
    pub database_url: Option<String>,

    /// Insert a few sample products into an empty catalog
    pub seed_sample_products: bool,

    /// Payment gateway base URL (default: https://api.razorpay.com)
    pub payment_api_base: String,

    /// Payment gateway key id / secret (HTTP basic auth)
    pub payment_key_id: String,
    pub payment_key_secret: String,

    /// Timeout for a single gateway call
    pub payment_timeout: Duration,

    /// Currency used when a checkout does not name one
    pub default_currency: String,

    /// Offset of the shop's local calendar, used for dashboard day labels
    pub shop_offset: FixedOffset,

    /// Fixed seed for the sample chart series; fresh randomness when unset
    pub sample_data_seed: Option<u64>,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    // -------------------------------------------------------------------------
    // LOAD CONFIGURATION FROM ENVIRONMENT
    // -------------------------------------------------------------------------
    /// Creates a Config by reading environment variables.
    ///
    /// # Returns
    /// - `Ok(Config)` if all required variables are set and parse
    /// - `Err` naming the offending variable otherwise
    pub fn from_env() -> Result<Self> {
        let offset_minutes: i32 = var_or("SHOP_UTC_OFFSET_MINUTES", "330")
            .parse()
            .context("Failed to parse SHOP_UTC_OFFSET_MINUTES as a number")?;
        let Some(shop_offset) = FixedOffset::east_opt(offset_minutes * 60) else {
            bail!("SHOP_UTC_OFFSET_MINUTES out of range: {offset_minutes}");
        };

        Ok(Self {
            port: var_or("PORT", "8003")
                .parse()
                .context("Failed to parse PORT as a number")?,

            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),

            seed_sample_products: var_or("SEED_SAMPLE_PRODUCTS", "false")
                .parse()
                .context("SEED_SAMPLE_PRODUCTS must be true or false")?,

            payment_api_base: var_or("PAYMENT_API_BASE", "https://api.razorpay.com"),

            payment_key_id: env::var("PAYMENT_KEY_ID")
                .context("PAYMENT_KEY_ID environment variable is required")?,

            payment_key_secret: env::var("PAYMENT_KEY_SECRET")
                .context("PAYMENT_KEY_SECRET environment variable is required")?,

            payment_timeout: Duration::from_secs(
                var_or("PAYMENT_TIMEOUT_SECS", "15")
                    .parse()
                    .context("Failed to parse PAYMENT_TIMEOUT_SECS as a number")?,
            ),

            default_currency: var_or("DEFAULT_CURRENCY", "INR"),

            shop_offset,

            sample_data_seed: env::var("SAMPLE_DATA_SEED")
                .ok()
                .filter(|seed| !seed.is_empty())
                .map(|seed| seed.parse::<u64>())
                .transpose()
                .context("Failed to parse SAMPLE_DATA_SEED as a number")?,
        })
    }
}
