use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::AppError;

/// Token bucket in front of the geocoder, which allows about one request per second per client.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    bucket: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Option<Self> {
        (rps > 0).then(|| Self {
            rps,
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: rps as f64,
                refilled_at: Instant::now(),
            })),
        })
    }

    /// `RATE_LIMIT_RPS`; unset, zero or unparsable disables limiting.
    pub fn from_env() -> Option<Self> {
        std::env::var("RATE_LIMIT_RPS")
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .and_then(Self::new)
    }

    pub fn rps(&self) -> u32 {
        self.rps
    }

    /// Take one token, or report how long until the next one.
    pub async fn acquire(&self) -> Result<(), AppError> {
        let capacity = self.rps as f64;
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.refilled_at = now;
        bucket.tokens = (bucket.tokens + elapsed * capacity).min(capacity);

        if bucket.tokens < 1.0 {
            let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / capacity);
            return Err(AppError::RateLimited(format!(
                "too many lookups (RATE_LIMIT_RPS={}): retry in ~{}ms",
                self.rps,
                wait.as_millis()
            )));
        }
        bucket.tokens -= 1.0;
        Ok(())
    }
}
