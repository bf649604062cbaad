//! Text extraction: download a page and reduce it to readable text.

pub mod cleaner;
mod ssrf;

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tracing::debug;
use url::Url;

pub(crate) use ssrf::redact_url;
use ssrf::{DnsResolver, TokioDnsResolver, parse_target, reject_private_host};

/// Upper bound for one page download, connect to last byte.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_BYTES: usize = 10_000_000;
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL: must be HTTP(S)")]
    InvalidScheme,

    #[error("blocked: internal/private host not allowed")]
    InternalHost,

    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("HTTP {status}")]
    HttpError { status: u16 },

    #[error("response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge,

    #[error("Empty response from URL")]
    EmptyContent,

    #[error("No readable content extracted from URL")]
    NoReadableContent,

    #[error("fetch failed: {0}")]
    Http(reqwest::Error),
}

/// Downloads pages and cleans them to plain text. One attempt per call.
#[derive(Clone)]
pub struct PageFetcher {
    http: Client,
    block_private_hosts: bool,
}

impl PageFetcher {
    pub fn new(http: Client, block_private_hosts: bool) -> Self {
        Self {
            http,
            block_private_hosts,
        }
    }

    pub async fn extract_text(&self, url: &str) -> Result<String, FetchError> {
        self.extract_text_with(url, &TokioDnsResolver).await
    }

    async fn extract_text_with(
        &self,
        url: &str,
        resolver: &impl DnsResolver,
    ) -> Result<String, FetchError> {
        let target = parse_target(url)?;
        if self.block_private_hosts {
            reject_private_host(&target, resolver).await?;
        }

        let (final_url, html) = self.download(target).await?;

        // Redirects may land somewhere the original URL would not be allowed.
        if self.block_private_hosts {
            reject_private_host(&final_url, resolver).await?;
        }

        if html.trim().is_empty() {
            return Err(FetchError::EmptyContent);
        }

        let text = cleaner::clean_html(&html);
        debug!(
            url = %redact_url(final_url.as_str()),
            html_bytes = html.len(),
            text_bytes = text.len(),
            "page cleaned"
        );
        if text.is_empty() {
            return Err(FetchError::NoReadableContent);
        }
        Ok(text)
    }

    async fn download(&self, target: Url) -> Result<(Url, String), FetchError> {
        let shown = redact_url(target.as_str()).into_owned();
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(shown.clone())
            } else {
                FetchError::Http(e)
            }
        };

        let response = self
            .http
            .get(target)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let encoding = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type)
            .unwrap_or(UTF_8);

        if let Some(len) = response.content_length()
            && len as usize > MAX_RESPONSE_BYTES
        {
            return Err(FetchError::TooLarge);
        }

        let mut body = Vec::new();
        let mut stream = response;
        while let Some(chunk) = stream.chunk().await.map_err(classify)? {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_RESPONSE_BYTES {
                return Err(FetchError::TooLarge);
            }
        }

        let (html, _, _) = encoding.decode(&body);
        Ok((final_url, html.into_owned()))
    }
}

/// `text/html; charset=Shift_JIS` → the matching encoding, if known.
fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches('"').as_bytes())
    })
}
