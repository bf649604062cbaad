use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiKey;
use crate::model::SearchHit;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything except the characters `encodeURIComponent` leaves alone.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("SERPAPI_KEY is not configured")]
    ProviderMisconfigured,

    #[error("SerpAPI request failed: {status} {message}")]
    ProviderUnavailable { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Query → ordered organic results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

#[derive(Clone)]
pub struct SerpApiClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(http: Client, api_key: ApiKey, base_url: &str) -> Self {
        Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search.json?q={}&api_key={}",
            self.base_url,
            utf8_percent_encode(query.trim(), QUERY_ENCODE_SET),
            utf8_percent_encode(self.api_key.expose(), QUERY_ENCODE_SET),
        )
    }
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .http
            .get(self.search_url(query))
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "search provider returned an error");
            return Err(SearchError::ProviderUnavailable {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).map_err(|e| {
            warn!(%e, "search provider returned a non-JSON body");
            SearchError::ProviderUnavailable {
                status: 502,
                message: "invalid JSON from provider".to_string(),
            }
        })?;

        let hits = organic_hits(&body);
        debug!(hits = hits.len(), "search provider results parsed");
        Ok(hits)
    }
}

/// Maps `organic_results` to hits; missing or non-string fields become "".
fn organic_hits(body: &Value) -> Vec<SearchHit> {
    let field = |item: &Value, key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    body.get("organic_results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| SearchHit {
                    title: field(item, "title"),
                    link: field(item, "link"),
                    snippet: field(item, "snippet"),
                })
                .collect()
        })
        .unwrap_or_default()
}
