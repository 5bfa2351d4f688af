use config::ConfigError;
use serde::Deserialize;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
}

impl GenerationSettings {
    /// Endpoint without the credential; the key travels as a query parameter.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub host: IpAddr,
    pub port: u16,
    pub static_dir: PathBuf,
    pub exchange_log_path: PathBuf,
    pub generation: GenerationSettings,
    pub retry: RetrySettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::NotFound("GEMINI_API_KEY".to_string()))?;

        let host = match lookup("HOST") {
            Some(raw) => raw
                .parse::<IpAddr>()
                .map_err(|e| ConfigError::Message(format!("invalid HOST '{}': {}", raw, e)))?,
            None => IpAddr::from([127, 0, 0, 1]),
        };

        Ok(Settings {
            host,
            port: parse_or(&lookup, "PORT", 5000),
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            exchange_log_path: lookup("EXCHANGE_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static/data/novembro_azul.csv")),
            generation: GenerationSettings {
                api_key,
                base_url: lookup("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_output_tokens: parse_or(&lookup, "MAX_OUTPUT_TOKENS", 200),
                request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 20),
            },
            retry: RetrySettings {
                attempts: parse_or(&lookup, "RETRY_ATTEMPTS", 3),
                backoff_ms: parse_or(&lookup, "BACKOFF_MS", 2000),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
