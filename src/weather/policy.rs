//! Weather cache freshness and refresh policy
//!
//! The policy decides whether the cached snapshot can be trusted, and when
//! it cannot, runs one strictly sequential refresh:
//! permission check, location fix, remote fetch, persist.
//!
//! A failed refresh never touches the cache. Callers always get something
//! to display through [`WeatherView`]: a fresh snapshot, the last cached
//! snapshot with the refresh error, or the error alone.
//!
//! Concurrent refreshes (say the CLI and the widget refresher) are not
//! serialized; each runs to completion and the last persisted write wins.

use crate::config::WeatherConfig;
use crate::error::WeatherError;
use crate::preferences::PreferenceStore;
use crate::weather::client::WeatherFetcher;
use crate::weather::location::LocationSource;
use crate::weather::model::{WeatherApiResponse, WeatherSnapshot};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Whether a cached snapshot needs refreshing
///
/// True when there is no snapshot or it is strictly older than
/// `threshold_ms`; an age equal to the threshold is still fresh.
///
/// # Examples
///
/// ```
/// use elysia::weather::{is_stale, WeatherSnapshot};
///
/// let t0 = 1_700_000_000_000;
/// let cached = WeatherSnapshot {
///     city_name: Some("Jakarta".into()),
///     temperature: Some("30°C".into()),
///     condition: Some("Cerah".into()),
///     icon_code: Some("01d".into()),
///     last_updated: t0,
/// };
/// let thirty_minutes = 30 * 60 * 1000;
/// assert!(is_stale(Some(&cached), t0 + 40 * 60 * 1000, thirty_minutes));
/// assert!(!is_stale(Some(&cached), t0 + thirty_minutes, thirty_minutes));
/// assert!(is_stale(None, t0, thirty_minutes));
/// ```
pub fn is_stale(snapshot: Option<&WeatherSnapshot>, now_ms: i64, threshold_ms: i64) -> bool {
    match snapshot {
        None => true,
        Some(s) => now_ms.saturating_sub(s.last_updated) > threshold_ms,
    }
}

/// Reduce a raw response into the cached snapshot shape
///
/// Temperature is rounded to whole degrees with a `°C` suffix, the first
/// condition description gets a capitalised first letter, and the icon code
/// passes through unchanged.
pub fn reduce(raw: &WeatherApiResponse, fetched_at_ms: i64) -> WeatherSnapshot {
    let description = raw.primary_description();
    WeatherSnapshot {
        city_name: raw.city_name.clone(),
        temperature: raw.temperature().map(|t| format!("{:.0}°C", t)),
        condition: description
            .and_then(|d| d.description.as_deref())
            .map(capitalize_first),
        icon_code: description.and_then(|d| d.icon.clone()),
        last_updated: fetched_at_ms,
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// What the weather panel can display after a freshness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherView {
    /// The cache was fresh, or a refresh just succeeded
    Fresh(WeatherSnapshot),
    /// A refresh failed; the last cached snapshot is still shown
    Stale {
        /// Last successfully cached snapshot
        snapshot: WeatherSnapshot,
        /// Why the refresh failed
        error: WeatherError,
    },
    /// A refresh failed and nothing is cached
    Unavailable(WeatherError),
}

impl WeatherView {
    /// Snapshot to display, if any
    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            WeatherView::Fresh(s) | WeatherView::Stale { snapshot: s, .. } => Some(s),
            WeatherView::Unavailable(_) => None,
        }
    }

    /// Refresh error to display, if any
    pub fn error(&self) -> Option<&WeatherError> {
        match self {
            WeatherView::Fresh(_) => None,
            WeatherView::Stale { error, .. } | WeatherView::Unavailable(error) => Some(error),
        }
    }
}

/// Orchestrates weather refreshes against the cache
#[derive(Clone)]
pub struct WeatherCachePolicy {
    preferences: PreferenceStore,
    location: Arc<dyn LocationSource>,
    fetcher: Arc<dyn WeatherFetcher>,
    threshold_ms: i64,
    location_timeout: Duration,
}

impl WeatherCachePolicy {
    /// Create a policy using the thresholds from `config`
    pub fn new(
        preferences: PreferenceStore,
        location: Arc<dyn LocationSource>,
        fetcher: Arc<dyn WeatherFetcher>,
        config: &WeatherConfig,
    ) -> Self {
        Self {
            preferences,
            location,
            fetcher,
            threshold_ms: config.stale_threshold_ms(),
            location_timeout: config.location_timeout(),
        }
    }

    /// Override the location fix timeout
    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    /// Override the staleness threshold
    pub fn with_threshold_ms(mut self, threshold_ms: i64) -> Self {
        self.threshold_ms = threshold_ms;
        self
    }

    /// Staleness threshold in milliseconds
    pub fn threshold_ms(&self) -> i64 {
        self.threshold_ms
    }

    /// Currently cached snapshot
    pub fn cached(&self) -> Option<WeatherSnapshot> {
        self.preferences.weather_snapshot()
    }

    /// Whether the cache needs refreshing at `now_ms`
    pub fn needs_refresh_at(&self, now_ms: i64) -> bool {
        is_stale(self.cached().as_ref(), now_ms, self.threshold_ms)
    }

    /// Run one refresh: permission, location, fetch, persist
    ///
    /// On success the new snapshot has replaced the cached one. On failure
    /// the cache is untouched and the classified error is returned.
    pub async fn refresh(&self) -> Result<WeatherSnapshot, WeatherError> {
        tracing::debug!("Attempting to refresh weather");

        if !self.location.has_permission() {
            tracing::warn!("Location permission not granted");
            return Err(WeatherError::PermissionDenied);
        }

        tracing::debug!("Requesting location fix");
        let fix = tokio::time::timeout(self.location_timeout, self.location.current_fix())
            .await
            .map_err(|_| {
                tracing::warn!(
                    "Timed out after {:?} waiting for a location fix",
                    self.location_timeout
                );
                WeatherError::LocationUnavailable(format!(
                    "timed out after {}s waiting for a location fix",
                    self.location_timeout.as_secs_f32()
                ))
            })??;

        let coordinates = fix.ok_or_else(|| {
            tracing::warn!("Location source returned no fix");
            WeatherError::LocationUnavailable("no location fix available".to_string())
        })?;
        tracing::debug!(
            lat = coordinates.latitude,
            lon = coordinates.longitude,
            "Location acquired"
        );

        let raw = self.fetcher.fetch(coordinates).await?;
        let snapshot = reduce(&raw, Utc::now().timestamp_millis());

        self.preferences
            .save_weather_snapshot(&snapshot)
            .map_err(|e| WeatherError::Storage(e.to_string()))?;

        tracing::info!(
            "Weather refreshed for {}",
            snapshot.city_name.as_deref().unwrap_or("<unknown>")
        );
        Ok(snapshot)
    }

    /// Refresh only if the cache is stale at `now_ms`
    pub async fn ensure_fresh_at(&self, now_ms: i64) -> WeatherView {
        let cached = self.cached();
        if !is_stale(cached.as_ref(), now_ms, self.threshold_ms) {
            if let Some(snapshot) = cached {
                tracing::debug!("Cached weather is still fresh");
                return WeatherView::Fresh(snapshot);
            }
        }
        tracing::debug!("Cached weather is stale or missing, refreshing");
        self.resolve(cached).await
    }

    /// Refresh only if the cache is stale now
    pub async fn ensure_fresh(&self) -> WeatherView {
        self.ensure_fresh_at(Utc::now().timestamp_millis()).await
    }

    /// Refresh regardless of the cache age
    pub async fn force_refresh(&self) -> WeatherView {
        let cached = self.cached();
        self.resolve(cached).await
    }

    async fn resolve(&self, cached: Option<WeatherSnapshot>) -> WeatherView {
        match self.refresh().await {
            Ok(snapshot) => WeatherView::Fresh(snapshot),
            Err(error) => {
                tracing::error!("Failed to refresh weather: {}", error);
                match cached {
                    Some(snapshot) => WeatherView::Stale { snapshot, error },
                    None => WeatherView::Unavailable(error),
                }
            }
        }
    }
}
