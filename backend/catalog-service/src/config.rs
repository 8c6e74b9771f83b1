//! Configuration management for catalog-service.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::Deserialize;
use std::time::Duration;

/// Default cap on an accumulated image upload: 1 MiB.
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 1 << 20;

const DEFAULT_TOKEN_TTL_SECS: u64 = 15 * 60;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub max_image_size: usize,
    pub image_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            host: std::env::var("CATALOG_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("CATALOG_SERVICE_PORT")
                .unwrap_or_else(|_| "9080".to_string())
                .parse()
                .unwrap_or(9080),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "insecure-dev-secret".to_string()),
            token_ttl_secs: std::env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOKEN_TTL_SECS),
            max_image_size: std::env::var("MAX_IMAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_IMAGE_SIZE),
            image_dir: std::env::var("IMAGE_DIR").unwrap_or_else(|_| "img".to_string()),
        }
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}
