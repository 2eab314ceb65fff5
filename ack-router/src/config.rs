//! Configuration module for environment variable parsing.
//!
//! Only the binary reads the environment; the values are handed to
//! [`App`](crate::App) explicitly.

use std::env;
use tracing::warn;

use crate::signature::{SigningKey, DEFAULT_MAX_AGE_SECONDS};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Path the webhook endpoint is mounted on
    pub route_path: String,

    /// Slack signing secret; requests are rejected while it is unset
    pub signing_key: Option<SigningKey>,

    /// Maximum age in seconds for request timestamps
    pub signature_max_age: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            route_path: env::var("ACK_ROUTE_PATH")
                .ok()
                .filter(|p| p.starts_with('/'))
                .unwrap_or_else(|| "/slack/events".to_string()),

            signing_key: env::var("SLACK_SIGNING_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(SigningKey::new),

            signature_max_age: parse_or("SLACK_SIGNATURE_MAX_AGE", DEFAULT_MAX_AGE_SECONDS),
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is unset
/// or malformed.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}
