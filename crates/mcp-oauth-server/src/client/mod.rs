//! National Weather Service API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff
//! - Response caching keyed by URL

use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{Config, weather};
use crate::error::{ClientError, ClientResult};
use crate::models::{AlertCollection, ForecastResponse, PointResponse};

/// Weather API client.
#[derive(Clone)]
pub struct WeatherClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Response cache.
    cache: Cache<String, serde_json::Value>,

    /// API base URL.
    api_url: String,
}

impl WeatherClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(weather::USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/geo+json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_secs(10))
            .build_with_max_retries(2);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let cache = Cache::builder()
            .max_capacity(config.cache_max_size)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self { client, cache, api_url: config.weather_api_url.trim_end_matches('/').to_string() })
    }

    /// Active alerts for a US state.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_alerts(&self, state: &str) -> ClientResult<AlertCollection> {
        let url = format!("{}/alerts/active/area/{state}", self.api_url);
        self.get(&url).await
    }

    /// Gridpoint metadata for a coordinate, including its forecast URL.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_point(&self, latitude: f64, longitude: f64) -> ClientResult<PointResponse> {
        let url = format!("{}/points/{latitude},{longitude}", self.api_url);
        self.get(&url).await
    }

    /// Forecast at an absolute URL returned by [`get_point`](Self::get_point).
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_forecast(&self, forecast_url: &str) -> ClientResult<ForecastResponse> {
        self.get(forecast_url).await
    }

    async fn get<T>(&self, url: &str) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if let Some(cached) = self.cache.get(url).await {
            return serde_json::from_value(cached).map_err(ClientError::from);
        }

        tracing::debug!(url = %url, "Requesting weather data");
        let response = self.client.get(url).send().await?;

        let response = self.handle_response(response).await?;
        let value: serde_json::Value = response.json().await?;

        self.cache.insert(url.to_string(), value.clone()).await;

        serde_json::from_value(value).map_err(ClientError::from)
    }

    async fn handle_response(&self, response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                Err(ClientError::rate_limited(retry_after))
            }
            404 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::not_found(text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }
}

impl std::fmt::Debug for WeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherClient").field("api_url", &self.api_url).finish()
    }
}
