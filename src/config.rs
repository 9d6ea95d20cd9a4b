// src/config.rs
//! Worker settings, built once at startup and handed to constructors.
//!
//! Precedence (lowest first): defaults, TOML file, environment.
//! The file is `$WORKER_CONFIG_PATH` if set, else `config/worker.toml` if it
//! exists. Keys in the file are the lower-case env names.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::fetch::DEFAULT_MAX_BODY_BYTES;

const ENV_CONFIG_PATH: &str = "WORKER_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/worker.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "compact" | "pretty" | "text" => Ok(LogFormat::Compact),
            other => Err(anyhow!("unsupported LOG_FORMAT {other:?} (json|compact)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub redis_url: String,
    pub database_url: String,
    pub discord_webhook_url: Option<String>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub max_retries: u32,
    pub retry_backoff_base: Duration,
    pub queue_name: String,
    pub dlq_name: String,
    pub fetch_timeout: Duration,
    pub max_body_bytes: usize,
    pub notify_timeout: Duration,
    pub poll_timeout: Duration,
    pub error_pause: Duration,
    pub metrics_addr: Option<SocketAddr>,
}

/// Optional overrides read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
    pub discord_webhook_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_backoff_base: Option<u64>,
    pub queue_name: Option<String>,
    pub dlq_name: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
    pub max_body_bytes: Option<usize>,
    pub notify_timeout_secs: Option<u64>,
    pub poll_timeout_secs: Option<u64>,
    pub error_pause_ms: Option<u64>,
    pub metrics_addr: Option<String>,
}

impl FileSettings {
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing worker config TOML")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading worker config from {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// 1) $WORKER_CONFIG_PATH (must exist)
    /// 2) config/worker.toml
    /// 3) nothing
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }
}

impl Settings {
    /// Defaults + config file + process environment.
    pub fn load() -> Result<Self> {
        let file = FileSettings::load_default()?;
        Self::resolve(file, |k| std::env::var(k).ok())
    }

    /// Merge `file` with values looked up through `env`, then validate.
    pub fn resolve(file: FileSettings, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |k: &str| env(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let redis_url = env("REDIS_URL")
            .or(file.redis_url)
            .unwrap_or_else(|| {
                let host = env("REDIS_HOST").unwrap_or_else(|| "localhost".into());
                let port = env("REDIS_PORT").unwrap_or_else(|| "6379".into());
                let db = env("REDIS_DB").unwrap_or_else(|| "0".into());
                format!("redis://{host}:{port}/{db}")
            });

        let settings = Settings {
            redis_url,
            database_url: env("DATABASE_URL")
                .or(file.database_url)
                .unwrap_or_else(|| "postgres://localhost:5432/article_pipeline".into()),
            discord_webhook_url: env("DISCORD_WEBHOOK_URL").or(file.discord_webhook_url),
            log_level: env("LOG_LEVEL")
                .or(file.log_level)
                .unwrap_or_else(|| "info".into()),
            log_format: env("LOG_FORMAT")
                .or(file.log_format)
                .as_deref()
                .map(LogFormat::from_str)
                .transpose()?
                .unwrap_or(LogFormat::Json),
            max_retries: parse_env(&env, "MAX_RETRIES")?
                .or(file.max_retries)
                .unwrap_or(3),
            retry_backoff_base: Duration::from_secs(
                parse_env(&env, "RETRY_BACKOFF_BASE")?
                    .or(file.retry_backoff_base)
                    .unwrap_or(1),
            ),
            queue_name: env("QUEUE_NAME")
                .or(file.queue_name)
                .unwrap_or_else(|| "article_queue".into()),
            dlq_name: env("DLQ_NAME")
                .or(file.dlq_name)
                .unwrap_or_else(|| "article_queue:failed".into()),
            fetch_timeout: Duration::from_secs(
                parse_env(&env, "FETCH_TIMEOUT_SECS")?
                    .or(file.fetch_timeout_secs)
                    .unwrap_or(30),
            ),
            max_body_bytes: parse_env(&env, "MAX_BODY_BYTES")?
                .or(file.max_body_bytes)
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            notify_timeout: Duration::from_secs(
                parse_env(&env, "NOTIFY_TIMEOUT_SECS")?
                    .or(file.notify_timeout_secs)
                    .unwrap_or(10),
            ),
            poll_timeout: Duration::from_secs(
                parse_env(&env, "POLL_TIMEOUT_SECS")?
                    .or(file.poll_timeout_secs)
                    .unwrap_or(1),
            ),
            error_pause: Duration::from_millis(
                parse_env(&env, "ERROR_PAUSE_MS")?
                    .or(file.error_pause_ms)
                    .unwrap_or(1_000),
            ),
            metrics_addr: env("METRICS_ADDR")
                .or(file.metrics_addr)
                .map(|a| {
                    a.parse::<SocketAddr>()
                        .with_context(|| format!("invalid METRICS_ADDR {a:?}"))
                })
                .transpose()?,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.max_retries < 1 {
            bail!("MAX_RETRIES must be at least 1");
        }
        if self.poll_timeout < Duration::from_secs(1) {
            bail!("POLL_TIMEOUT_SECS must be at least 1");
        }
        if self.fetch_timeout.is_zero() || self.notify_timeout.is_zero() {
            bail!("FETCH_TIMEOUT_SECS and NOTIFY_TIMEOUT_SECS must be positive");
        }
        if self.max_body_bytes == 0 {
            bail!("MAX_BODY_BYTES must be positive");
        }
        if self.queue_name.is_empty() || self.dlq_name.is_empty() {
            bail!("QUEUE_NAME and DLQ_NAME must not be empty");
        }
        if self.queue_name == self.dlq_name {
            bail!("QUEUE_NAME and DLQ_NAME must differ");
        }
        Ok(())
    }

    /// Redis URL with any password masked, for logs.
    pub fn redis_url_redacted(&self) -> String {
        redact_url(&self.redis_url)
    }

    pub fn database_url_redacted(&self) -> String {
        redact_url(&self.database_url)
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| anyhow!("invalid {key}={v:?}: {e}"))
        })
        .transpose()
}

fn redact_url(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "<unparseable url>".to_string(),
    }
}
