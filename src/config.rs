//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment
//! (Cloud Run secret bindings), so no Secret Manager calls are made here.

use crate::services::FeedLimits;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Per-source feed row limits
    pub feed_limits: FeedLimits,
    /// Feed sessions unused for this long are dropped
    pub session_idle_timeout: Duration,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            feed_limits: FeedLimits::default(),
            session_idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = FeedLimits::default();

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 8080)?,
            feed_limits: FeedLimits {
                routes: parse_or("FEED_ROUTE_LIMIT", defaults.routes)?,
                events: parse_or("FEED_EVENT_LIMIT", defaults.events)?,
                exercise_completions: parse_or(
                    "FEED_EXERCISE_LIMIT",
                    defaults.exercise_completions,
                )?,
                path_exercise_completions: parse_or(
                    "FEED_PATH_COMPLETION_LIMIT",
                    defaults.path_exercise_completions,
                )?,
            },
            session_idle_timeout: Duration::from_secs(parse_or(
                "FEED_SESSION_IDLE_SECS",
                DEFAULT_SESSION_IDLE_SECS,
            )?),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .trim()
                .as_bytes()
                .to_vec(),
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
