use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

/// Environment variable set by the hosting platform (Cloud Run / Knative).
pub const PLATFORM_MARKER_VAR: &str = "K_SERVICE";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    bind_host(env::var(PLATFORM_MARKER_VAR).is_ok()).to_string()
}

fn default_port() -> u16 {
    8080
}

/// Public bind when running on the platform, loopback for local development.
pub fn bind_host(on_platform: bool) -> &'static str {
    if on_platform { "0.0.0.0" } else { "127.0.0.1" }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let port_override = match env::var("PORT") {
            Ok(raw) => Some(raw.parse::<u16>().map_err(|e| {
                AppError::Configuration(anyhow::anyhow!("PORT is not a valid port: {}", e))
            })?),
            Err(_) => None,
        };

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .set_override_option("port", port_override.map(i64::from))?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn is_public_bind(&self) -> bool {
        self.host == "0.0.0.0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_host_follows_platform_marker() {
        assert_eq!(bind_host(true), "0.0.0.0");
        assert_eq!(bind_host(false), "127.0.0.1");
    }

    #[test]
    fn public_bind_detection() {
        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 8080,
        };
        assert!(config.is_public_bind());

        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8081,
        };
        assert!(!config.is_public_bind());
    }
}
