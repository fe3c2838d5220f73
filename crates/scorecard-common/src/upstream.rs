use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::CommonError;

pub const DEFAULT_GEOCODER_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_DISTRICT_BASE_URL: &str =
    "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb";
pub const DEFAULT_REPS_BASE_URL: &str = "https://whoismyrepresentative.com";
pub const DEFAULT_NEWS_FEED_URL: &str = "https://insights.niacouncil.org/feed";

/// Endpoints and limits for the read-only third-party services.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub geocoder_base_url: String,
    pub district_base_url: String,
    pub reps_base_url: String,
    pub news_feed_url: String,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            geocoder_base_url: DEFAULT_GEOCODER_BASE_URL.to_string(),
            district_base_url: DEFAULT_DISTRICT_BASE_URL.to_string(),
            reps_base_url: DEFAULT_REPS_BASE_URL.to_string(),
            news_feed_url: DEFAULT_NEWS_FEED_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_error_body_bytes: 8 * 1024,
        }
    }
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let url = |key: &str, default: String| {
            std::env::var(key)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default)
                .trim_end_matches('/')
                .to_string()
        };

        let timeout = std::env::var("UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let max_error_body_bytes = std::env::var("UPSTREAM_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_error_body_bytes);

        Self {
            geocoder_base_url: url("GEOCODER_BASE_URL", defaults.geocoder_base_url),
            district_base_url: url("DISTRICT_BASE_URL", defaults.district_base_url),
            reps_base_url: url("REPS_BASE_URL", defaults.reps_base_url),
            news_feed_url: url("NEWS_FEED_URL", defaults.news_feed_url),
            timeout,
            max_error_body_bytes,
        }
    }
}

/// Single-attempt HTTP client shared by the proxy endpoints.
#[derive(Clone)]
pub struct UpstreamClient {
    config: UpstreamConfig,
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("scorecard-server/1.0 (congressional scorecard lookup)")
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CommonError> {
        let resp = self.http.get(url).query(query).send().await?;
        Self::parse_json_response(resp, self.config.max_error_body_bytes).await
    }

    pub async fn get_text(&self, url: &str) -> Result<String, CommonError> {
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(Self::to_upstream_error(resp, self.config.max_error_body_bytes).await);
        }
        Ok(resp.text().await?)
    }

    async fn parse_json_response<T: DeserializeOwned>(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<T, CommonError> {
        if resp.status().is_success() {
            // The representative lookup serves JSON as text/html.
            let bytes = resp.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
        Err(Self::to_upstream_error(resp, max_error_body_bytes).await)
    }

    async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> CommonError {
        let status = resp.status().as_u16();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        CommonError::Upstream { status, body }
    }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}
