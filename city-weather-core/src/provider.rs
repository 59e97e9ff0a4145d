//! Fetching raw observations from the weather provider.
//!
//! Only transport failures (timeouts, refused connections, broken bodies) are
//! retried. Every HTTP status other than 200 ends the attempt loop for that
//! city on first sight, 5xx included.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, time::Duration};
use thiserror::Error;

pub mod openweather;

pub use openweather::OpenWeatherFetcher;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.3;

/// How many times a city is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub max_retries: u32,
    /// Seconds; the wait after attempt `n` is `backoff_factor * 2^n`.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            backoff_factor,
        }
    }

    /// Delay after the failed attempt with zero-based index `attempt`. No jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_factor * 2f64.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}

/// Seam over the backoff wait so the retry loop can be observed in tests.
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Why a single attempt to fetch a city did not produce an observation.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("city '{0}' not found")]
    CityNotFound(String),

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("unexpected status code {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("response body is not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("connection error: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl FetchError {
    /// Sort a transport-level error into its specific kind.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else if err.is_connect() {
            Self::Connect(err)
        } else {
            Self::Transport(err)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connect(_) | Self::Transport(_))
    }
}
