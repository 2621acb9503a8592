//! Process configuration read from the environment (and an optional `.env`).
//!
//! - `GEMINI_API_KEY`: required
//! - `GEMINI_MODEL`: model identifier (default: gemini-1.5-flash)
//! - `GEMINI_API_URL`: API base URL (default: the public v1beta endpoint)
//! - `TEMPERATURE`: sampling temperature in [0, 2] (default: 0.7)
//! - `MAX_OUTPUT_TOKENS`: output token ceiling (default: 8192)
//! - `REQUEST_TIMEOUT_SECS`: outbound request timeout (default: 120)
//! - `LOG_LEVEL`: default log filter when `RUST_LOG` is unset (default: info)
//! - `HOST` / `PORT`: listen address (default: 0.0.0.0:8000)

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: `{value}`")]
    Invalid { key: &'static str, value: String },
    #[error("{key} out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },
}

/// Settings shared by every outbound generation call. Built once at startup.
#[derive(Clone, PartialEq)]
pub struct GenerationSettings {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
}

impl fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub generation: GenerationSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let temperature: f32 = parse_or(get("TEMPERATURE"), "TEMPERATURE", 0.7)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::OutOfRange {
                key: "TEMPERATURE",
                reason: format!("{} is outside [0, 2]", temperature),
            });
        }

        let max_output_tokens: u32 = parse_or(get("MAX_OUTPUT_TOKENS"), "MAX_OUTPUT_TOKENS", 8192)?;
        if max_output_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                key: "MAX_OUTPUT_TOKENS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let generation = GenerationSettings {
            api_key: api_key.trim().to_string(),
            api_url: get("GEMINI_API_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model: get("GEMINI_MODEL")
                .map(|model| model.trim().to_string())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens,
            request_timeout_secs: parse_or(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 120)?,
        };

        Ok(AppConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 8000)?,
            log_level: get("LOG_LEVEL")
                .map(|level| level.trim().to_lowercase())
                .unwrap_or_else(|| "info".to_string()),
            generation,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Loads `.env` from the working directory or its parents. A missing file is
/// `Ok(None)`; a file that exists but cannot be read or parsed is an error.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    optional_env_file(dotenvy::dotenv())
}

fn optional_env_file<T>(result: Result<T, dotenvy::Error>) -> Result<Option<T>, dotenvy::Error> {
    match result {
        Ok(loaded) => Ok(Some(loaded)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Shows only the first 10 and last 4 characters of a key.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 14 {
        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}
