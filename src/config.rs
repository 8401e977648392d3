use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub default_currency: String,
    pub recent_deals_limit: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let default_currency = env_map
            .get("DEFAULT_CURRENCY")
            .cloned()
            .unwrap_or_else(|| "LKR".to_string());
        if default_currency.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_CURRENCY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let recent_deals_limit = env_map
            .get("RECENT_DEALS_LIMIT")
            .map(|s| s.as_str())
            .unwrap_or("10")
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "RECENT_DEALS_LIMIT".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;
        if recent_deals_limit <= 0 {
            return Err(ConfigError::InvalidValue(
                "RECENT_DEALS_LIMIT".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            default_currency,
            recent_deals_limit,
        })
    }
}
