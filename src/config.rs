// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL (CORS origin, cookie security)
    pub frontend_url: String,
    /// GCP project ID; when set, users are stored in Firestore
    pub gcp_project_id: Option<String>,
    /// Server port
    pub port: u16,
    /// Verbose logging of authentication failures
    pub debug: bool,

    /// HS256 signing key for access and refresh tokens (raw bytes)
    pub jwt_secret_key: Vec<u8>,
    /// Access token lifetime in minutes
    pub access_token_expire_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_expire_days: i64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: None,
            port: 8000,
            debug: false,
            jwt_secret_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
        }
    }
}

impl Config {
    /// Deterministic configuration for tests (in-memory store, fixed key).
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_secret_key = env::var("JWT_SECRET_KEY")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("JWT_SECRET_KEY"))?;
        if jwt_secret_key.is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRET_KEY", "must not be empty".into()));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            port: parse_var("PORT", 8000)?,
            debug: env::var("DEBUG")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            jwt_secret_key: jwt_secret_key.into_bytes(),
            access_token_expire_minutes: parse_positive("ACCESS_TOKEN_EXPIRE_MINUTES", 30)?,
            refresh_token_expire_days: parse_positive("REFRESH_TOKEN_EXPIRE_DAYS", 7)?,
        })
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("cannot parse {raw:?}"))),
        Err(_) => Ok(default),
    }
}

fn parse_positive(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    let value = parse_var(name, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid(name, "must be positive".into()));
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
