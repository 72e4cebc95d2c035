// HTTP client for the projection site's JSON endpoints.
//
// Requests are plain GETs with query parameters, awaited one at a time.
// There are no retries: a 403 (the site's bot protection kicking in) is
// surfaced as a transient error and the user simply runs again later.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::request::Request;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://www.fangraphs.com";

const USER_AGENT: &str = concat!("scoutsheet/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} refused the request (HTTP 403); this is intermittent, try again later")]
    Forbidden { url: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected payload for {what}: {message}")]
    Decode { what: String, message: String },
}

impl FetchError {
    /// Whether running again later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Forbidden { .. })
    }

    pub(crate) fn decode(what: impl Into<String>, message: impl ToString) -> Self {
        FetchError::Decode {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Source of raw JSON payloads. The production implementation talks HTTP;
/// tests substitute canned payloads.
#[async_trait]
pub trait ProjectionProvider: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Value, FetchError>;
}

// ---------------------------------------------------------------------------
// FangraphsClient
// ---------------------------------------------------------------------------

pub struct FangraphsClient {
    http: reqwest::Client,
    base_url: String,
}

impl FangraphsClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against another host, e.g. a local mirror.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, request: &Request) -> String {
        format!("{}{}", self.base_url, request.path())
    }
}

#[async_trait]
impl ProjectionProvider for FangraphsClient {
    async fn fetch(&self, request: &Request) -> Result<Value, FetchError> {
        let url = self.url_for(request);
        info!("fetching {}", request.cache_key());

        let response = self.http.get(&url).query(&request.query()).send().await?;
        let status = response.status();
        debug!(%status, "{url}");

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::Forbidden { url });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::decode(request.cache_key(), e))
    }
}
