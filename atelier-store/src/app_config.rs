use serde::Deserialize;
use std::env;

use atelier_booking::BookingRules;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub smtp: SmtpConfig,
    pub payment: PaymentConfig,
    pub app: AppSettings,
    #[serde(default)]
    pub booking_rules: BookingRulesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

/// Mail transport settings, carried in configuration instead of ambient
/// environment lookups.
#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub client_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    /// Public base URL, used for confirmation links and redirects.
    pub domain: String,
    /// Dollars per credit when purchasing.
    #[serde(default = "default_credit_rating")]
    pub credit_rating: i64,
}

fn default_credit_rating() -> i64 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRulesConfig {
    #[serde(default = "default_fee_bps")]
    pub platform_fee_bps: i64,
    #[serde(default = "default_window_hours")]
    pub confirmation_window_hours: i64,
}

fn default_fee_bps() -> i64 {
    1500
}

fn default_window_hours() -> i64 {
    24
}

impl Default for BookingRulesConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: default_fee_bps(),
            confirmation_window_hours: default_window_hours(),
        }
    }
}

impl BookingRulesConfig {
    pub fn to_rules(&self) -> BookingRules {
        BookingRules {
            platform_fee_bps: self.platform_fee_bps,
            confirmation_window_hours: self.confirmation_window_hours,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `ATELIER__SERVER__PORT=9090`
            .add_source(config::Environment::with_prefix("ATELIER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
