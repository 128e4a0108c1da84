use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_PREFS_DB: &str = "sqlite://escola_prefs.db";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: Url,
    pub prefs_db: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Reads `ESCOLA_API_URL`, `ESCOLA_PREFS_DB` and `ESCOLA_HTTP_TIMEOUT_SECS`,
    /// falling back to local defaults for anything unset.
    pub fn new_from_env() -> Result<Self, AppError> {
        let api_url = env::var("ESCOLA_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let prefs_db =
            env::var("ESCOLA_PREFS_DB").unwrap_or_else(|_| DEFAULT_PREFS_DB.to_string());
        let timeout_secs = match env::var("ESCOLA_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!("ESCOLA_HTTP_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url: parse_base_url(&api_url)?,
            prefs_db,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn with_api_url(mut self, raw: &str) -> Result<Self, AppError> {
        self.api_url = parse_base_url(raw)?;
        Ok(self)
    }
}

/// Parses a base URL and makes sure its path ends with `/` so relative
/// resource paths join under it instead of replacing the last segment.
pub fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| AppError::Config(format!("invalid API URL {:?}: {}", raw, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
