use std::sync::Arc;

use scorecard_common::loader::{AnySource, DataStore};
use scorecard_common::model::Dataset;
use scorecard_common::upstream::UpstreamClient;
use tracing::warn;

use crate::error::AppError;
use crate::news::NewsCache;
use crate::rate_limit::RateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: DataStore<AnySource>,
    pub upstream: UpstreamClient,
    pub limiter: Option<RateLimiter>,
    pub news: NewsCache,
}

impl AppState {
    pub fn new(
        store: DataStore<AnySource>,
        upstream: UpstreamClient,
        limiter: Option<RateLimiter>,
    ) -> SharedState {
        Arc::new(Self {
            store,
            upstream,
            limiter,
            news: NewsCache::default(),
        })
    }

    /// The loaded dataset; a failed load is reported as unavailable and retried next time.
    pub async fn dataset(&self) -> Result<Arc<Dataset>, AppError> {
        self.store.load().await.map_err(|e| {
            warn!(error = %e, "dataset load failed");
            AppError::DataUnavailable(e.to_string())
        })
    }

    /// Gate an upstream call behind the rate limiter, when one is configured.
    pub async fn gate(&self) -> Result<(), AppError> {
        match &self.limiter {
            Some(limiter) => limiter.acquire().await,
            None => Ok(()),
        }
    }
}
