//! Runtime configuration
//!
//! Defaults suit a local single-user run. Every field can be overridden
//! through a `PROMPTSHARE_*` environment variable; a `.env` file in the
//! working directory is loaded first.

use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    auth::local::DEFAULT_ITERATIONS,
    errors::{PromptShareError, Result},
    prompts::BatchPolicy,
};

const ENV_PREFIX: &str = "PROMPTSHARE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = PromptShareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(PromptShareError::Config(format!("unknown store backend '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreBackend,
    pub database_path: PathBuf,
    pub bind_address: String,
    /// WebSocket auth token; generated at startup when unset
    pub auth_token: Option<String>,
    pub batch_policy: BatchPolicy,
    pub page_size: usize,
    pub pacing_delay_ms: u64,
    pub request_timeout_ms: Option<u64>,
    pub log_level: String,
    pub share_base_url: String,
    /// PBKDF2 rounds for new password digests
    pub password_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreBackend::Sqlite,
            database_path: default_database_path(),
            bind_address: "127.0.0.1:0".to_string(),
            auth_token: None,
            batch_policy: BatchPolicy::Strict,
            page_size: 10,
            pacing_delay_ms: 0,
            request_timeout_ms: None,
            log_level: "info".to_string(),
            share_base_url: "http://localhost:3000".to_string(),
            password_iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// `<data dir>/promptshare/promptshare.db`
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptshare")
        .join("promptshare.db")
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        PromptShareError::Config(format!("invalid value for {}{}: '{}'", ENV_PREFIX, key, raw))
    })
}

impl Config {
    /// Load from the process environment after reading `.env`
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; keys are full variable names
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(&format!("{}{}", ENV_PREFIX, key));
        let mut config = Config::default();

        if let Some(raw) = get("STORE") {
            config.store = raw.parse()?;
        }
        if let Some(raw) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(raw);
        }
        if let Some(raw) = get("BIND_ADDRESS") {
            config.bind_address = raw;
        }
        if let Some(raw) = get("AUTH_TOKEN") {
            if !raw.trim().is_empty() {
                config.auth_token = Some(raw.trim().to_string());
            }
        }
        if let Some(raw) = get("BATCH_POLICY") {
            config.batch_policy = raw.parse()?;
        }
        if let Some(raw) = get("PAGE_SIZE") {
            config.page_size = parse("PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = get("PACING_DELAY_MS") {
            config.pacing_delay_ms = parse("PACING_DELAY_MS", &raw)?;
        }
        if let Some(raw) = get("REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = Some(parse("REQUEST_TIMEOUT_MS", &raw)?);
        }
        if let Some(raw) = get("LOG_LEVEL") {
            config.log_level = raw;
        }
        if let Some(raw) = get("SHARE_BASE_URL") {
            config.share_base_url = raw;
        }
        if let Some(raw) = get("PASSWORD_ITERATIONS") {
            config.password_iterations = parse("PASSWORD_ITERATIONS", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(PromptShareError::Config("page_size must be at least 1".into()));
        }
        if self.password_iterations == 0 {
            return Err(PromptShareError::Config("password_iterations must be at least 1".into()));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(PromptShareError::Config("request_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
