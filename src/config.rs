//! Application configuration loaded from the environment.
//!
//! Both backend values default to an empty string: a missing value is not an
//! error here, [`crate::connection::Connection::from_config`] degrades to a
//! placeholder handle instead.
//!
//! # Security Notes
//! - The anon key is meant to be public, access control lives in
//!   row-level security policies. Still, never log it.
//! - `logfire_token` is sensitive.

use anyhow::Context;
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(default = "local")]
    pub env: String,

    /// Backend project URL (NON-SENSITIVE)
    /// Example: "https://xyzcompany.supabase.co"
    #[envconfig(default = "")]
    pub supabase_url: String,

    /// Backend public (anon) API key (SEMI-SENSITIVE)
    #[envconfig(default = "")]
    pub supabase_anon_key: String,

    /// Console log level: "error", "warn", "info", "debug", "trace"
    #[envconfig(default = "info")]
    pub log_level: String,

    /// SENSITIVE: Logfire write token, export is disabled when absent
    pub logfire_token: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::init_from_env().context("failed to load app config from environment")
    }

    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }

    /// Names of the backend variables that are not set.
    pub fn missing_backend_vars(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.supabase_url.trim().is_empty() {
            missing.push("SUPABASE_URL");
        }
        if self.supabase_anon_key.trim().is_empty() {
            missing.push("SUPABASE_ANON_KEY");
        }

        missing
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
