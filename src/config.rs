use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Dynamic pricing knobs. Multipliers compose multiplicatively and the
/// composite is clamped into `[min_multiplier, max_multiplier]`.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Lower bound of the effective price multiplier band
    #[serde(default = "default_min_multiplier")]
    pub min_multiplier: Decimal,

    /// Upper bound of the effective price multiplier band
    #[serde(default = "default_max_multiplier")]
    pub max_multiplier: Decimal,

    /// Start of the daily peak window (UTC hour, inclusive)
    #[serde(default = "default_peak_start_hour")]
    pub peak_start_hour: u32,

    /// End of the daily peak window (UTC hour, exclusive)
    #[serde(default = "default_peak_end_hour")]
    pub peak_end_hour: u32,

    /// Multiplier applied inside the peak window
    #[serde(default = "default_peak_multiplier")]
    pub peak_multiplier: Decimal,

    /// Trailing window for the demand factor (hours)
    #[serde(default = "default_demand_window_hours")]
    pub demand_window_hours: i64,

    /// Units sold inside the window at or above which demand surges
    #[serde(default = "default_demand_surge_units")]
    pub demand_surge_units: i64,

    /// Multiplier when demand surges
    #[serde(default = "default_demand_surge_multiplier")]
    pub demand_surge_multiplier: Decimal,

    /// Multiplier when nothing sold inside the window
    #[serde(default = "default_demand_idle_multiplier")]
    pub demand_idle_multiplier: Decimal,

    /// Multiplier when stock is at or below the reorder point
    #[serde(default = "default_scarcity_multiplier")]
    pub scarcity_multiplier: Decimal,

    /// Stock at or above `reorder_point * surplus_ratio` counts as surplus
    #[serde(default = "default_surplus_ratio")]
    pub surplus_ratio: i32,

    /// Multiplier when stock is in surplus
    #[serde(default = "default_surplus_multiplier")]
    pub surplus_multiplier: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            min_multiplier: default_min_multiplier(),
            max_multiplier: default_max_multiplier(),
            peak_start_hour: default_peak_start_hour(),
            peak_end_hour: default_peak_end_hour(),
            peak_multiplier: default_peak_multiplier(),
            demand_window_hours: default_demand_window_hours(),
            demand_surge_units: default_demand_surge_units(),
            demand_surge_multiplier: default_demand_surge_multiplier(),
            demand_idle_multiplier: default_demand_idle_multiplier(),
            scarcity_multiplier: default_scarcity_multiplier(),
            surplus_ratio: default_surplus_ratio(),
            surplus_multiplier: default_surplus_multiplier(),
        }
    }
}

fn default_min_multiplier() -> Decimal {
    dec!(0.80)
}
fn default_max_multiplier() -> Decimal {
    dec!(1.25)
}
fn default_peak_start_hour() -> u32 {
    17
}
fn default_peak_end_hour() -> u32 {
    20
}
fn default_peak_multiplier() -> Decimal {
    dec!(1.10)
}
fn default_demand_window_hours() -> i64 {
    24
}
fn default_demand_surge_units() -> i64 {
    20
}
fn default_demand_surge_multiplier() -> Decimal {
    dec!(1.15)
}
fn default_demand_idle_multiplier() -> Decimal {
    dec!(0.95)
}
fn default_scarcity_multiplier() -> Decimal {
    dec!(1.10)
}
fn default_surplus_ratio() -> i32 {
    4
}
fn default_surplus_multiplier() -> Decimal {
    dec!(0.90)
}

/// Thresholds for the suspicious-activity sweep. An actor exceeding any of
/// these inside the trailing window is flagged.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FraudConfig {
    #[serde(default = "default_max_refunds")]
    pub max_refunds: u64,

    #[serde(default = "default_max_voids")]
    pub max_voids: u64,

    #[serde(default = "default_max_discounts")]
    pub max_discounts: u64,

    #[serde(default = "default_max_failed_logins")]
    pub max_failed_logins: u64,

    /// Absolute cash drawer variance (expected vs counted) that triggers an alert
    #[serde(default = "default_cash_variance_threshold")]
    pub cash_variance_threshold: Decimal,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            max_refunds: default_max_refunds(),
            max_voids: default_max_voids(),
            max_discounts: default_max_discounts(),
            max_failed_logins: default_max_failed_logins(),
            cash_variance_threshold: default_cash_variance_threshold(),
        }
    }
}

fn default_max_refunds() -> u64 {
    5
}
fn default_max_voids() -> u64 {
    5
}
fn default_max_discounts() -> u64 {
    10
}
fn default_max_failed_logins() -> u64 {
    5
}
fn default_cash_variance_threshold() -> Decimal {
    dec!(50.00)
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Shared secret for job trigger endpoints. When unset, triggers run
    /// unauthenticated (development only).
    #[serde(default)]
    pub scheduler_secret: Option<String>,

    /// Fallback low-stock threshold when neither the request nor the tenant
    /// supplies one
    #[serde(default = "default_low_stock_threshold")]
    pub default_low_stock_threshold: i32,

    /// Outbound webhook URL for notifications (reminders, alerts)
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// HMAC secret used to sign outbound webhook payloads
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Dynamic pricing configuration
    #[serde(default)]
    #[validate]
    pub pricing: PricingConfig,

    /// Suspicious-activity thresholds
    #[serde(default)]
    pub fraud: FraudConfig,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_low_stock_threshold() -> i32 {
    10
}
fn default_event_channel_capacity() -> usize {
    1024
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}

impl AppConfig {
    /// Builds a configuration with defaults for everything but the
    /// connection basics. Used by tests and tooling.
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            scheduler_secret: None,
            default_low_stock_threshold: default_low_stock_threshold(),
            webhook_url: None,
            webhook_secret: None,
            pricing: PricingConfig::default(),
            fraud: FraudConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.pricing.min_multiplier <= Decimal::ZERO
            || self.pricing.min_multiplier > self.pricing.max_multiplier
        {
            let mut err = ValidationError::new("pricing_band");
            err.message = Some("pricing band requires 0 < min_multiplier <= max_multiplier".into());
            errors.add("pricing", err);
        }

        if self.pricing.peak_start_hour > 23
            || self.pricing.peak_end_hour > 24
            || self.pricing.peak_start_hour >= self.pricing.peak_end_hour
        {
            let mut err = ValidationError::new("peak_window");
            err.message = Some("peak window must satisfy 0 <= start < end <= 24".into());
            errors.add("pricing", err);
        }

        if self.is_production() && self.scheduler_secret.is_none() {
            let mut err = ValidationError::new("scheduler_secret_required");
            err.message = Some(
                "Set APP__SCHEDULER_SECRET in production so job triggers are authenticated".into(),
            );
            errors.add("scheduler_secret", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(ValidationErrors),
}

/// Loads application configuration.
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        )
    }

    #[test]
    fn defaults_pass_validation() {
        let cfg = base_config();
        cfg.validate().expect("validator constraints");
        cfg.validate_additional_constraints()
            .expect("additional constraints");
    }

    #[test]
    fn inverted_pricing_band_is_rejected() {
        let mut cfg = base_config();
        cfg.pricing.min_multiplier = dec!(2.0);
        cfg.pricing.max_multiplier = dec!(1.0);
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn production_requires_scheduler_secret() {
        let mut cfg = base_config();
        cfg.environment = "production".to_string();
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.scheduler_secret = Some("cron-secret".to_string());
        cfg.validate_additional_constraints()
            .expect("secret satisfies the production constraint");
    }

    #[test]
    fn peak_window_bounds_checked() {
        let mut cfg = base_config();
        cfg.pricing.peak_start_hour = 20;
        cfg.pricing.peak_end_hour = 8;
        assert!(cfg.validate_additional_constraints().is_err());
    }
}
