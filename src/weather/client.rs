//! Remote weather service client
//!
//! One read-only call: current weather for a coordinate pair. Every failure
//! is classified into a [`WeatherError`] so the cache policy can fall back to
//! the cached snapshot.

use crate::config::WeatherConfig;
use crate::error::{ElysiaError, Result, WeatherError};
use crate::weather::model::{Coordinates, WeatherApiResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Retrieves the current weather for a location
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use elysia::error::WeatherError;
/// use elysia::weather::{Coordinates, WeatherApiResponse, WeatherFetcher};
///
/// struct Canned;
///
/// #[async_trait]
/// impl WeatherFetcher for Canned {
///     async fn fetch(&self, _at: Coordinates) -> Result<WeatherApiResponse, WeatherError> {
///         Ok(WeatherApiResponse::default())
///     }
/// }
/// ```
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    /// Fetch the raw current-weather response for `coordinates`
    async fn fetch(
        &self,
        coordinates: Coordinates,
    ) -> std::result::Result<WeatherApiResponse, WeatherError>;
}

/// Cached temperatures are formatted as Celsius, so only metric is requested
const METRIC_UNITS: &str = "metric";

/// OpenWeather-compatible HTTP client
pub struct OpenWeatherClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    language: String,
}

impl OpenWeatherClient {
    /// Build a client from the weather configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// created
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.read_timeout_seconds))
            .build()
            .map_err(|e| ElysiaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = weather_endpoint(&config.api_base)?;

        tracing::info!(
            "Initialized weather client: endpoint={}, units={}, lang={}",
            endpoint,
            METRIC_UNITS,
            config.language
        );

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }

    /// Fully-qualified endpoint the client calls
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn weather_endpoint(api_base: &str) -> Result<Url> {
    let mut base = api_base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let base = Url::parse(&base)
        .map_err(|e| ElysiaError::Config(format!("Invalid weather api_base {}: {}", api_base, e)))?;
    base.join("weather")
        .map_err(|e| ElysiaError::Config(format!("Invalid weather endpoint: {}", e)).into())
}

#[async_trait]
impl WeatherFetcher for OpenWeatherClient {
    async fn fetch(
        &self,
        coordinates: Coordinates,
    ) -> std::result::Result<WeatherApiResponse, WeatherError> {
        let key_prefix: String = self.api_key.chars().take(5).collect();
        tracing::debug!(
            lat = coordinates.latitude,
            lon = coordinates.longitude,
            "Fetching weather data, API key: {}...",
            key_prefix
        );

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", METRIC_UNITS.to_string()),
                ("lang", self.language.clone()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Weather request failed to send: {}", e);
                WeatherError::NetworkError {
                    status: None,
                    body: e.to_string(),
                }
            })?;

        let status = response.status();
        tracing::debug!("Weather API response code: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let body = if error_text.trim().is_empty() {
                "No error body".to_string()
            } else {
                error_text
            };
            tracing::error!("Weather API returned error {}: {}", status, body);
            return Err(WeatherError::NetworkError {
                status: Some(status.as_u16()),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::NetworkError {
                status: Some(status.as_u16()),
                body: format!("Failed to read response body: {}", e),
            })?;

        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            tracing::error!("Weather API returned an empty body despite status {}", status);
            return Err(WeatherError::EmptyResponse);
        }

        let parsed: WeatherApiResponse =
            serde_json::from_str(trimmed).map_err(|e| WeatherError::NetworkError {
                status: Some(status.as_u16()),
                body: format!("invalid response: {}", e),
            })?;

        tracing::debug!(
            "Weather API call successful. City: {}",
            parsed.city_name.as_deref().unwrap_or("<unknown>")
        );
        Ok(parsed)
    }
}
