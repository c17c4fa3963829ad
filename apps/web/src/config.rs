use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::bootstrap::{BootstrapOptions, DEFAULT_POST_LOAD_DELAY};
use crate::classify::typewriter::DEFAULT_SPEED;
use crate::classify::TypewriterOptions;
use crate::reveal::{RevealOptions, RevealPolicy};

/// Driver configuration loaded from environment variables.
/// Only the backend URL is required; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub classify_base_url: String,
    pub classify_timeout: Duration,
    pub typewriter_speed: Duration,
    pub reveal_policy: RevealPolicy,
    pub post_load_delay: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the environment, or a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let classify_base_url = lookup("CLASSIFY_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .with_context(|| "Required environment variable 'CLASSIFY_BASE_URL' is not set")?;

        Ok(Config {
            classify_base_url,
            classify_timeout: Duration::from_secs(parse_or(&lookup, "CLASSIFY_TIMEOUT_SECS", 30)?),
            typewriter_speed: Duration::from_millis(parse_or(
                &lookup,
                "TYPEWRITER_SPEED_MS",
                DEFAULT_SPEED.as_millis() as u64,
            )?),
            reveal_policy: match lookup("REVEAL_POLICY") {
                Some(raw) => raw
                    .parse::<RevealPolicy>()
                    .map_err(|e| anyhow!(e))
                    .context("REVEAL_POLICY is invalid")?,
                None => RevealPolicy::default(),
            },
            post_load_delay: Duration::from_millis(parse_or(
                &lookup,
                "POST_LOAD_DELAY_MS",
                DEFAULT_POST_LOAD_DELAY.as_millis() as u64,
            )?),
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn bootstrap_options(&self) -> BootstrapOptions {
        BootstrapOptions {
            reveal: RevealOptions::default().with_policy(self.reveal_policy),
            typewriter: TypewriterOptions {
                speed: self.typewriter_speed,
            },
            post_load_delay: self.post_load_delay,
            ..BootstrapOptions::default()
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        None => Ok(default),
    }
}
