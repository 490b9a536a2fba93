use std::path::PathBuf;

use thiserror::Error;

use crate::config_env::{optional_trimmed_env, parse_bool_env, require_env};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CHAT_STORE_PATH: &str = "chat_sessions.json";
const MIN_SESSION_SECRET_BYTES: usize = 16;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub chat_store_path: PathBuf,
    pub session_secret: String,
    pub session_cookie_secure: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid boolean in env var {0}")]
    ParseBool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let session_secret = require_env("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(ConfigError::InvalidConfiguration(format!(
                "SESSION_SECRET must be at least {MIN_SESSION_SECRET_BYTES} bytes"
            )));
        }

        Ok(Self {
            bind_addr: optional_trimmed_env("API_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            chat_store_path: optional_trimmed_env("CHAT_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHAT_STORE_PATH)),
            session_secret,
            session_cookie_secure: parse_bool_env("SESSION_COOKIE_SECURE", false)?,
        })
    }
}

/// Loads `.env` from the working directory if one exists.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}
