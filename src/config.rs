use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use clap::{ArgAction, Parser};

const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_LITE_MODEL: &str = "claude-3-5-haiku-20241022";

/// Process configuration. Every flag can also be supplied through the
/// environment variable named next to it.
#[derive(Debug, Parser)]
#[command(name = "signalmap", version, about = "Market-research search and map service")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// SerpAPI key; search requests fail with 500 when unset
    #[arg(long, env = "SERPAPI_KEY", hide_env_values = true)]
    pub serpapi_key: Option<String>,

    #[arg(long, env = "SERPAPI_BASE_URL", default_value = "https://serpapi.com", hide = true)]
    pub serpapi_base_url: String,

    /// Anthropic key; entity extraction is skipped per result when unset
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = "https://api.anthropic.com", hide = true)]
    pub anthropic_base_url: String,

    /// Model used for entity extraction in normal mode
    #[arg(long, env = "EXTRACTION_MODEL", default_value = DEFAULT_MODEL)]
    pub extraction_model: String,

    /// Cheaper model used in resource-constrained mode
    #[arg(long, env = "EXTRACTION_MODEL_LITE", default_value = DEFAULT_LITE_MODEL)]
    pub extraction_model_lite: String,

    /// Resource-constrained mode: only the first page with text goes to the model
    #[arg(long, env = "DEV_MODE", action = ArgAction::SetTrue, value_parser = literal_true)]
    pub dev_mode: bool,

    /// Deadline for a whole search pipeline run
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Allow fetching pages on loopback/private hosts (local development only)
    #[arg(long, env = "ALLOW_PRIVATE_HOSTS", action = ArgAction::SetTrue, value_parser = literal_true)]
    pub allow_private_hosts: bool,
}

/// Switch parser for flag env vars: exactly `true` turns the switch on, any
/// other value (empty, `1`, `TRUE`) leaves it off instead of failing startup.
fn literal_true(raw: &str) -> Result<bool, Infallible> {
    Ok(raw == "true")
}

impl Config {
    pub fn resource_mode(&self) -> ResourceMode {
        if self.dev_mode {
            ResourceMode::Constrained
        } else {
            ResourceMode::Normal
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Volume policy for the enrichment pipeline.
///
/// `Constrained` trades coverage for cost: a single page is sent to the
/// model, truncated, using the lite model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResourceMode {
    #[default]
    Normal,
    Constrained,
}

/// Provider credential. Never printed by `Debug`.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for missing or blank keys.
    pub fn from_option(raw: Option<&str>) -> Option<Self> {
        raw.map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| Self(k.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}
