use std::net::SocketAddr;
use std::path::PathBuf;

use scorecard_common::upstream::UpstreamConfig;

use crate::error::AppError;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Where the scorecard CSV files are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLocation {
    Dir(PathBuf),
    Url(String),
}

/// Application configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataLocation,
    pub listen_addr: SocketAddr,
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Required (one of):
    /// - `SCORECARD_DATA_DIR`: directory holding `scores_wide.csv` and friends
    /// - `SCORECARD_DATA_URL`: base URL serving the same files
    ///
    /// Optional:
    /// - `SCORECARD_LISTEN_ADDR`: bind address, default `0.0.0.0:3000`
    /// - `GEOCODER_BASE_URL`, `DISTRICT_BASE_URL`, `REPS_BASE_URL`, `NEWS_FEED_URL`
    /// - `UPSTREAM_TIMEOUT_SECS`, `UPSTREAM_MAX_ERROR_BODY_BYTES`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok(), UpstreamConfig::from_env())
    }

    fn from_lookup(
        var: impl Fn(&str) -> Option<String>,
        upstream: UpstreamConfig,
    ) -> Result<Self, AppError> {
        let set = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let data = match (set("SCORECARD_DATA_DIR"), set("SCORECARD_DATA_URL")) {
            (Some(dir), _) => DataLocation::Dir(PathBuf::from(dir.trim())),
            (None, Some(url)) => DataLocation::Url(url.trim().to_string()),
            (None, None) => {
                return Err(AppError::Config(
                    "SCORECARD_DATA_DIR or SCORECARD_DATA_URL environment variable is required"
                        .to_string(),
                ))
            }
        };

        let raw_addr = set("SCORECARD_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = raw_addr.trim().parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("invalid SCORECARD_LISTEN_ADDR {raw_addr:?}: {e}"))
        })?;

        Ok(Self {
            data,
            listen_addr,
            upstream,
        })
    }
}
