use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::triage::GEMINI_DEFAULT_BASE_URL;

/// Application-level constants
pub const APP_NAME: &str = "triage-core";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "medgemma:4b";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DB_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Cannot determine home directory; set TRIAGE_DB_PATH")]
    NoHomeDir,
}

/// Application data directory: ~/Triage/
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join("Triage"))
        .ok_or(ConfigError::NoHomeDir)
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "triage_lib=info,triage_core=info,tower_http=info"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    Gemini,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Gemini => "gemini",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "gemini" => Ok(LlmProvider::Gemini),
            other => Err(ConfigError::InvalidValue {
                key: "TRIAGE_LLM_PROVIDER",
                value: other.to_string(),
            }),
        }
    }
}

/// Runtime settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub provider: LlmProvider,
    pub llm_base_url: String,
    pub model: String,
    pub gemini_api_key: Option<String>,
    pub llm_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub db_busy_timeout: Duration,
    pub allowed_origins: Vec<String>,
}

impl TriageConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = match get("TRIAGE_LLM_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => LlmProvider::Ollama,
        };

        let gemini_api_key = get("GEMINI_API_KEY");
        if provider == LlmProvider::Gemini && gemini_api_key.is_none() {
            return Err(ConfigError::Missing("GEMINI_API_KEY"));
        }

        let (default_url, default_model) = match provider {
            LlmProvider::Ollama => (DEFAULT_OLLAMA_URL, DEFAULT_OLLAMA_MODEL),
            LlmProvider::Gemini => (GEMINI_DEFAULT_BASE_URL, DEFAULT_GEMINI_MODEL),
        };

        let db_path = match get("TRIAGE_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => app_data_dir()?.join("triage.db"),
        };

        let allowed_origins = match get("TRIAGE_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            bind_addr: parse_or(
                "TRIAGE_BIND_ADDR",
                get("TRIAGE_BIND_ADDR"),
                SocketAddr::from(([127, 0, 0, 1], 8000)),
            )?,
            db_path,
            provider,
            llm_base_url: get("TRIAGE_LLM_BASE_URL").unwrap_or_else(|| default_url.to_string()),
            model: get("TRIAGE_MODEL").unwrap_or_else(|| default_model.to_string()),
            gemini_api_key,
            llm_timeout_secs: parse_or(
                "TRIAGE_LLM_TIMEOUT_SECS",
                get("TRIAGE_LLM_TIMEOUT_SECS"),
                DEFAULT_LLM_TIMEOUT_SECS,
            )?,
            max_attempts: parse_or(
                "TRIAGE_MAX_ATTEMPTS",
                get("TRIAGE_MAX_ATTEMPTS"),
                crate::pipeline::triage::DEFAULT_MAX_ATTEMPTS,
            )?
            .max(1),
            retry_delay: Duration::from_millis(parse_or(
                "TRIAGE_RETRY_DELAY_MS",
                get("TRIAGE_RETRY_DELAY_MS"),
                0u64,
            )?),
            db_busy_timeout: Duration::from_millis(parse_or(
                "TRIAGE_DB_BUSY_TIMEOUT_MS",
                get("TRIAGE_DB_BUSY_TIMEOUT_MS"),
                DEFAULT_DB_BUSY_TIMEOUT_MS,
            )?),
            allowed_origins,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<TriageConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TriageConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_use_local_ollama() {
        let config = config_from(&[("TRIAGE_DB_PATH", "/tmp/triage.db")]).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.provider, LlmProvider::Ollama);
        assert_eq!(config.llm_base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::ZERO);
        assert_eq!(config.llm_timeout_secs, 60);
        assert_eq!(config.db_busy_timeout, Duration::from_millis(5000));
        assert_eq!(config.allowed_origins.len(), 3);
    }

    #[test]
    fn gemini_requires_api_key() {
        let err = config_from(&[("TRIAGE_LLM_PROVIDER", "gemini"), ("TRIAGE_DB_PATH", "x")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GEMINI_API_KEY")));

        let config = config_from(&[
            ("TRIAGE_LLM_PROVIDER", "Gemini"),
            ("GEMINI_API_KEY", "secret"),
            ("TRIAGE_DB_PATH", "x"),
        ])
        .unwrap();
        assert_eq!(config.provider, LlmProvider::Gemini);
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.llm_base_url, GEMINI_DEFAULT_BASE_URL);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("TRIAGE_BIND_ADDR", "0.0.0.0:9000"),
            ("TRIAGE_DB_PATH", "/data/t.db"),
            ("TRIAGE_MAX_ATTEMPTS", "5"),
            ("TRIAGE_RETRY_DELAY_MS", "250"),
            ("TRIAGE_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.db_path, PathBuf::from("/data/t.db"));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn zero_attempts_raised_to_one() {
        let config = config_from(&[("TRIAGE_MAX_ATTEMPTS", "0"), ("TRIAGE_DB_PATH", "x")]).unwrap();
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = config_from(&[("TRIAGE_MAX_ATTEMPTS", "three"), ("TRIAGE_DB_PATH", "x")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "TRIAGE_MAX_ATTEMPTS", .. }));
        assert!(config_from(&[("TRIAGE_LLM_PROVIDER", "openai")]).is_err());
        assert!(config_from(&[("TRIAGE_BIND_ADDR", "nowhere"), ("TRIAGE_DB_PATH", "x")]).is_err());
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[("TRIAGE_MODEL", "  "), ("TRIAGE_DB_PATH", "x")]).unwrap();
        assert_eq!(config.model, DEFAULT_OLLAMA_MODEL);
    }

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir().unwrap();
        assert!(dir.starts_with(dirs::home_dir().unwrap()));
        assert!(dir.ends_with("Triage"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(APP_NAME, "triage-core");
    }
}
