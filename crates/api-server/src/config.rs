use analyze_pipeline::TickerStrategyKind;
use anyhow::{Context, Result};
use completion_client::CompletionConfig;
use finder_core::RetryPolicy;
use searchcaster_client::SearchcasterConfig;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Server settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub searchcaster_url: String,
    pub http_timeout: Duration,
    pub http_max_retries: u32,
    pub ticker_strategy: TickerStrategyKind,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port: u16 = parse_var("PORT", &get("PORT", "5555"))?;
        let timeout_secs: u64 = parse_var("HTTP_TIMEOUT_SECS", &get("HTTP_TIMEOUT_SECS", "30"))?;
        let http_max_retries: u32 = parse_var("HTTP_MAX_RETRIES", &get("HTTP_MAX_RETRIES", "3"))?;
        let ticker_strategy = TickerStrategyKind::from_str(&get("TICKER_STRATEGY", "completion"))
            .map_err(anyhow::Error::msg)
            .context("Invalid TICKER_STRATEGY")?;

        Ok(Self {
            host: get("HOST", "0.0.0.0"),
            port,
            database_url: get("DATABASE_URL", "sqlite:token_finder.db"),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            openai_base_url: get("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_model: get("OPENAI_MODEL", "gpt-4"),
            searchcaster_url: get("SEARCHCASTER_URL", "https://searchcaster.xyz"),
            http_timeout: Duration::from_secs(timeout_secs),
            http_max_retries,
            ticker_strategy,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid HOST/PORT combination {}:{}", self.host, self.port))
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.http_max_retries, RETRY_BACKOFF)
    }

    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            base_url: self.openai_base_url.clone(),
            api_key: self.openai_api_key.clone(),
            model: self.openai_model.clone(),
            timeout: self.http_timeout,
            retry: self.retry_policy(),
        }
    }

    pub fn searchcaster_config(&self) -> SearchcasterConfig {
        SearchcasterConfig {
            base_url: self.searchcaster_url.clone(),
            timeout: self.http_timeout,
            retry: self.retry_policy(),
        }
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Invalid {} value '{}'", key, raw))
}
