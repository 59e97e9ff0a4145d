use reqwest::{Client, StatusCode};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use crate::{config::ApiKey, model::RawObservation};

use super::{FetchError, RetryPolicy, Sleeper, TokioSleeper};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// Current-weather client for OpenWeatherMap with a bounded retry loop.
#[derive(Debug, Clone)]
pub struct OpenWeatherFetcher {
    api_key: ApiKey,
    http: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl OpenWeatherFetcher {
    pub fn new(api_key: ApiKey) -> Self {
        Self::new_with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn new_with_base_url(api_key: ApiKey, base_url: &str) -> Self {
        Self {
            api_key,
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetch the current observation for `city`.
    ///
    /// Transport failures are retried with exponential backoff; any non-200
    /// status gives up on the city immediately. Failures are logged and
    /// reported as `None`.
    pub async fn fetch(&self, city: &str) -> Option<RawObservation> {
        let max_attempts = self.retry.max_retries;

        for attempt in 0..max_attempts {
            match self.fetch_once(city).await {
                Ok(observation) => {
                    if attempt > 0 {
                        info!(city, attempt = attempt + 1, "Fetched weather after retrying");
                    }
                    return Some(observation);
                }
                Err(err) if err.is_retryable() => {
                    warn!(city, attempt = attempt + 1, max_attempts, "{err}");
                }
                Err(err) => {
                    log_terminal_failure(city, &err);
                    return None;
                }
            }

            let delay = self.retry.delay_for_attempt(attempt);
            debug!(city, ?delay, "Backing off before next attempt");
            self.sleeper.sleep(delay).await;
        }

        error!(city, "Failed to fetch weather for '{city}' after {max_attempts} attempts");
        None
    }

    async fn fetch_once(&self, city: &str) -> Result<RawObservation, FetchError> {
        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.expose()),
                ("units", "metric"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::from_transport)?;

        match status {
            StatusCode::OK => serde_json::from_str(&body)
                .map(RawObservation::new)
                .map_err(FetchError::InvalidBody),
            StatusCode::NOT_FOUND => Err(FetchError::CityNotFound(city.to_string())),
            StatusCode::UNAUTHORIZED => Err(FetchError::InvalidApiKey),
            _ => Err(FetchError::UnexpectedStatus {
                status,
                body: truncate_body(&body),
            }),
        }
    }
}

fn log_terminal_failure(city: &str, err: &FetchError) {
    match err {
        FetchError::CityNotFound(_) => warn!(city, "City '{city}' not found, skipping"),
        FetchError::InvalidApiKey => {
            error!(city, "Invalid API key, check the API_KEY setting")
        }
        FetchError::UnexpectedStatus { status, body } => {
            warn!(city, %status, "Unexpected status code {status} for '{city}': {body}")
        }
        other => warn!(city, "Giving up on '{city}': {other}"),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn slept(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn key() -> ApiKey {
        ApiKey::new("test_key").unwrap()
    }

    fn seattle() -> serde_json::Value {
        serde_json::json!({
            "name": "Seattle",
            "sys": {"country": "US"},
            "main": {"temp": 15.0, "feels_like": 14.0, "humidity": 70},
            "weather": [{"main": "Clouds", "description": "overcast clouds"}],
            "wind": {"speed": 3.1},
            "dt": 1700000000
        })
    }

    #[tokio::test]
    async fn test_fetch_success_sends_expected_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Seattle"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(seattle()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = OpenWeatherFetcher::new_with_base_url(key(), &mock_server.uri());
        let observation = fetcher.fetch("Seattle").await.unwrap();

        assert_eq!(observation.as_value(), &seattle());
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404",
                "message": "city not found"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let fetcher = OpenWeatherFetcher::new_with_base_url(key(), &mock_server.uri())
            .with_sleeper(sleeper.clone());

        assert!(fetcher.fetch("Atlantis").await.is_none());
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let fetcher = OpenWeatherFetcher::new_with_base_url(key(), &mock_server.uri())
            .with_sleeper(sleeper.clone());

        assert!(fetcher.fetch("Seattle").await.is_none());
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let fetcher = OpenWeatherFetcher::new_with_base_url(key(), &mock_server.uri())
            .with_sleeper(sleeper.clone());

        assert!(fetcher.fetch("Seattle").await.is_none());
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = OpenWeatherFetcher::new_with_base_url(key(), &mock_server.uri())
            .with_sleeper(Arc::new(RecordingSleeper::default()));

        assert!(fetcher.fetch("Seattle").await.is_none());
    }

    #[tokio::test]
    async fn test_connection_error_exhausts_retries_with_backoff() {
        // Nothing listens on port 1, so every attempt is refused.
        let sleeper = Arc::new(RecordingSleeper::default());
        let fetcher = OpenWeatherFetcher::new_with_base_url(key(), "http://127.0.0.1:1")
            .with_retry_policy(RetryPolicy::new(3, 0.3))
            .with_sleeper(sleeper.clone());

        assert!(fetcher.fetch("Seattle").await.is_none());

        let factor = 0.3;
        assert_eq!(
            sleeper.slept(),
            vec![
                Duration::from_secs_f64(factor * 1.0),
                Duration::from_secs_f64(factor * 2.0),
                Duration::from_secs_f64(factor * 4.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_timeout_is_retried_up_to_max_attempts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(seattle())
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let fetcher = OpenWeatherFetcher::new_with_base_url(key(), &mock_server.uri())
            .with_timeout(Duration::from_millis(50))
            .with_retry_policy(RetryPolicy::new(2, 0.5))
            .with_sleeper(sleeper.clone());

        assert!(fetcher.fetch("Seattle").await.is_none());
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_millis(500), Duration::from_secs(1)]
        );
    }

    #[tokio::test]
    async fn test_zero_attempts_never_calls_provider() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(seattle()))
            .expect(0)
            .mount(&mock_server)
            .await;

        let fetcher = OpenWeatherFetcher::new_with_base_url(key(), &mock_server.uri())
            .with_retry_policy(RetryPolicy::new(0, 0.3));

        assert!(fetcher.fetch("Seattle").await.is_none());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(250);
        let truncated = truncate_body(&long);

        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
