use std::env;
use std::path::PathBuf;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub verification_code: String,
    pub data_dir: Option<PathBuf>,
    pub event_buffer_size: usize,
    pub recent_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            verification_code: env::var("VERIFICATION_CODE")
                .unwrap_or_else(|_| "123456".to_string()),
            data_dir: env::var("DATA_DIR").ok().map(PathBuf::from),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            recent_limit: parse_or_default("RECENT_LIMIT", 3)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
