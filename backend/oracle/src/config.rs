//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{OracleError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the HTTP API server
    pub api_port: u16,
    /// Public base URL of this service, used to build Relayer callback URLs
    pub app_domain: String,
    /// Bearer token required on mutating routes
    pub app_auth_token: String,
    /// `*` for any origin, otherwise a single allowed origin
    pub cors_allowed_origins: String,
    /// Relayer base URL (e.g. http://relayer:3000)
    pub relayer_url: String,
    pub relayer_auth_token: String,
    /// Backend base URL receiving completion events
    pub backend_url: String,
    pub backend_auth_token: String,
    /// How often (in seconds) to look for projects due a milestone check
    pub milestone_check_interval_secs: u64,
    /// How often (in seconds) to look for dormant ended projects
    pub fund_recovery_interval_secs: u64,
    /// Days after completion before leftover funds are recovered
    pub fund_recovery_dormancy_days: i64,
    /// Unstake cool-down, in seconds
    pub cs_unstake_period_secs: i64,
    /// How often (in seconds) to sweep for stalled activities
    pub pending_sweep_interval_secs: u64,
    /// Age (in seconds) after which a Pending activity counts as stalled
    pub pending_activity_timeout_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./oracle.db".to_string()),
            api_port: parse_var("API_PORT", "3002")?,
            app_domain: env_var("APP_DOMAIN")
                .unwrap_or_else(|_| "http://localhost:3002".to_string()),
            app_auth_token: env_var("APP_AUTH_TOKEN").map_err(|_| {
                OracleError::Config("APP_AUTH_TOKEN environment variable is required".to_string())
            })?,
            cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
            relayer_url: env_var("RELAYER_URL").map_err(|_| {
                OracleError::Config("RELAYER_URL environment variable is required".to_string())
            })?,
            relayer_auth_token: env_var("RELAYER_AUTH_TOKEN").unwrap_or_default(),
            backend_url: env_var("BACKEND_URL").map_err(|_| {
                OracleError::Config("BACKEND_URL environment variable is required".to_string())
            })?,
            backend_auth_token: env_var("BACKEND_AUTH_TOKEN").unwrap_or_default(),
            milestone_check_interval_secs: parse_var("MILESTONE_CHECK_INTERVAL_SECS", "60")?,
            fund_recovery_interval_secs: parse_var("FUND_RECOVERY_INTERVAL_SECS", "3600")?,
            fund_recovery_dormancy_days: parse_var("FUND_RECOVERY_DORMANCY_DAYS", "90")?,
            cs_unstake_period_secs: parse_var("CS_UNSTAKE_PERIOD_SECS", "604800")?,
            pending_sweep_interval_secs: parse_var("PENDING_SWEEP_INTERVAL_SECS", "300")?,
            pending_activity_timeout_secs: parse_var("PENDING_ACTIVITY_TIMEOUT_SECS", "600")?,
        })
    }

    /// Dormancy threshold for failed-fund recovery as a named duration.
    pub fn fund_recovery_dormancy(&self) -> chrono::Duration {
        chrono::Duration::days(self.fund_recovery_dormancy_days)
    }

    pub fn milestone_check_interval(&self) -> Duration {
        Duration::from_secs(self.milestone_check_interval_secs.max(1))
    }

    pub fn fund_recovery_interval(&self) -> Duration {
        Duration::from_secs(self.fund_recovery_interval_secs.max(1))
    }

    pub fn pending_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.pending_sweep_interval_secs.max(1))
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| OracleError::Config(format!("Missing env var: {key}")))
}

fn parse_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    env_var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| OracleError::Config(format!("Invalid {key}")))
}
