//! Environment-backed configuration.
//!
//! Every credential and policy constant is read here once and handed to the
//! component that needs it; no other module touches the process environment.

use std::env;

use crate::error::{AppError, AppResult};

/// Connection details for the third-party ticketing provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Bearer credential sent on every provider call.
    pub api_token: String,
}

/// Connection details for the payment processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Time-tiered refund policy. Tier boundaries are configurable but default
/// to the product-confirmed 30/15-day brackets.
#[derive(Debug, Clone)]
pub struct CancellationPolicy {
    /// At or beyond this many whole days before the event: full refund.
    pub full_refund_days: i64,
    /// At or beyond this many whole days (but under `full_refund_days`):
    /// `half_refund_percent` of the total.
    pub half_refund_days: i64,
    /// Percentage refunded in the middle tier, 0..=100.
    pub half_refund_percent: i64,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            full_refund_days: 30,
            half_refund_days: 15,
            half_refund_percent: 50,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub provider: ProviderConfig,
    pub processor: ProcessorConfig,
    pub policy: CancellationPolicy,
    /// Flat processing fee (minor units) deducted from every refund.
    pub refund_processing_fee: i64,
    /// Sync attempts after which the HTTP layer stops re-invoking the
    /// orchestrator. The orchestrator itself never self-limits.
    pub max_sync_attempts: i32,
}

impl Config {
    /// Load configuration from the process environment. `dotenvy::dotenv`
    /// should have been called by the binary entrypoint beforehand.
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            port: parse_or("PORT", 3001)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .collect(),
            provider: ProviderConfig {
                base_url: require("TICKETING_API_URL")?,
                api_token: require("TICKETING_API_TOKEN")?,
            },
            processor: ProcessorConfig {
                base_url: require("PAYMENTS_API_URL")?,
                api_key: require("PAYMENTS_API_KEY")?,
            },
            policy: CancellationPolicy {
                full_refund_days: parse_or("REFUND_FULL_TIER_DAYS", 30)?,
                half_refund_days: parse_or("REFUND_HALF_TIER_DAYS", 15)?,
                half_refund_percent: parse_or("REFUND_HALF_TIER_PERCENT", 50)?,
            },
            refund_processing_fee: parse_or("REFUND_PROCESSING_FEE", 0)?,
            max_sync_attempts: parse_or("MAX_SYNC_ATTEMPTS", 3)?,
        })
    }
}

fn require(key: &str) -> AppResult<String> {
    env::var(key).map_err(|_| AppError::Config(format!("missing environment variable {key}")))
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| AppError::Config(format!("invalid value for {key}: {value}"))),
        Err(_) => Ok(default),
    }
}
