//! Single-shot location sources
//!
//! A source answers two questions: whether the user has granted location
//! permission (never prompting), and where the device is right now. A fix
//! request produces at most one reading or an explicit absence (`None`).
//! Callers bound the request with a timeout; dropping the request future
//! releases whatever the source registered for it.

use crate::config::{LocationConfig, LocationSourceKind, WeatherConfig};
use crate::error::{ElysiaError, Result, WeatherError};
use crate::weather::model::Coordinates;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Provides at most one location fix on demand
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Whether location permission has been granted
    fn has_permission(&self) -> bool;

    /// Request one fix; `Ok(None)` is the terminal absence signal
    async fn current_fix(&self) -> std::result::Result<Option<Coordinates>, WeatherError>;
}

/// Location taken from configuration
#[derive(Debug, Clone)]
pub struct FixedLocation {
    coordinates: Option<Coordinates>,
    permission_granted: bool,
}

impl FixedLocation {
    /// Create a fixed source; `None` coordinates always report absence
    pub fn new(coordinates: Option<Coordinates>, permission_granted: bool) -> Self {
        Self {
            coordinates,
            permission_granted,
        }
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    fn has_permission(&self) -> bool {
        self.permission_granted
    }

    async fn current_fix(&self) -> std::result::Result<Option<Coordinates>, WeatherError> {
        if self.coordinates.is_none() {
            tracing::warn!("No coordinates configured for the fixed location source");
        }
        Ok(self.coordinates)
    }
}

/// Approximate location resolved from the public IP address
pub struct IpLookupLocation {
    client: Client,
    url: String,
    permission_granted: bool,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl IpLookupLocation {
    /// Create an IP lookup source hitting `url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn new(url: impl Into<String>, permission_granted: bool, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ElysiaError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            permission_granted,
        })
    }
}

#[async_trait]
impl LocationSource for IpLookupLocation {
    fn has_permission(&self) -> bool {
        self.permission_granted
    }

    async fn current_fix(&self) -> std::result::Result<Option<Coordinates>, WeatherError> {
        tracing::debug!("Resolving location via {}", self.url);
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            WeatherError::LocationUnavailable(format!("IP lookup request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::LocationUnavailable(format!(
                "IP lookup returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: IpLookupResponse = response.json().await.map_err(|e| {
            WeatherError::LocationUnavailable(format!("Invalid IP lookup response: {}", e))
        })?;

        if let Some(s) = body.status.as_deref() {
            if s != "success" {
                let reason = body.message.unwrap_or_else(|| s.to_string());
                tracing::warn!("IP lookup did not resolve a location: {}", reason);
                return Ok(None);
            }
        }

        Ok(match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        })
    }
}

/// Push-based location source
///
/// Producers publish readings with [`LocationFeed::publish`]. Each fix
/// request registers one subscription that ends on the first reading, or
/// when the request is dropped (timeout or cancellation).
///
/// This is the injection point for an embedding host that receives
/// positions from a platform provider. It is not selectable from
/// configuration because nothing in the CLI publishes readings; hand it to
/// [`WeatherCachePolicy::new`](crate::weather::WeatherCachePolicy::new) directly.
///
/// # Examples
///
/// ```
/// use elysia::weather::{Coordinates, LocationFeed, LocationSource};
///
/// # async fn example() {
/// let feed = LocationFeed::new(true);
/// let publisher = feed.clone();
/// let request = tokio::spawn(async move { feed.current_fix().await });
/// tokio::task::yield_now().await;
/// publisher.publish(Some(Coordinates::new(-6.2, 106.8)));
/// # }
/// ```
#[derive(Clone)]
pub struct LocationFeed {
    sender: broadcast::Sender<Option<Coordinates>>,
    permission_granted: Arc<AtomicBool>,
}

impl LocationFeed {
    /// Create a feed with the given initial permission state
    pub fn new(permission_granted: bool) -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            sender,
            permission_granted: Arc::new(AtomicBool::new(permission_granted)),
        }
    }

    /// Update the permission state
    pub fn set_permission(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    /// Deliver a reading (or an absence) to every pending request
    ///
    /// Returns the number of requests that received it.
    pub fn publish(&self, fix: Option<Coordinates>) -> usize {
        self.sender.send(fix).unwrap_or(0)
    }

    /// Number of fix requests currently registered
    pub fn active_subscriptions(&self) -> usize {
        self.sender.receiver_count()
    }

    fn subscribe(&self) -> LocationSubscription {
        tracing::debug!("Registering location subscription");
        LocationSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

/// One registered fix request; unregistered when dropped
struct LocationSubscription {
    receiver: broadcast::Receiver<Option<Coordinates>>,
}

impl LocationSubscription {
    async fn first(mut self) -> Option<Coordinates> {
        loop {
            match self.receiver.recv().await {
                Ok(fix) => return fix,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Location subscription lagged by {} readings", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        tracing::debug!("Removing location subscription");
    }
}

#[async_trait]
impl LocationSource for LocationFeed {
    fn has_permission(&self) -> bool {
        self.permission_granted.load(Ordering::SeqCst)
    }

    async fn current_fix(&self) -> std::result::Result<Option<Coordinates>, WeatherError> {
        Ok(self.subscribe().first().await)
    }
}

/// Build the configured location source
///
/// Only pull-based sources are configurable; push-based providers go
/// through [`LocationFeed`].
///
/// # Errors
///
/// Returns error if the source cannot be constructed
pub fn build_location_source(
    location: &LocationConfig,
    weather: &WeatherConfig,
) -> Result<Arc<dyn LocationSource>> {
    match location.source {
        LocationSourceKind::Fixed => {
            let coordinates = match (location.latitude, location.longitude) {
                (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
                _ => None,
            };
            Ok(Arc::new(FixedLocation::new(
                coordinates,
                location.permission_granted,
            )))
        }
        LocationSourceKind::IpLookup => Ok(Arc::new(IpLookupLocation::new(
            location.ip_lookup_url.clone(),
            location.permission_granted,
            weather.location_timeout(),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_location_returns_configured_fix() {
        let source = FixedLocation::new(Some(Coordinates::new(-6.2, 106.8)), true);
        assert!(source.has_permission());
        assert_eq!(
            source.current_fix().await.unwrap(),
            Some(Coordinates::new(-6.2, 106.8))
        );
    }

    #[tokio::test]
    async fn test_fixed_location_without_coordinates_reports_absence() {
        let source = FixedLocation::new(None, true);
        assert_eq!(source.current_fix().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_feed_delivers_first_fix_and_unsubscribes() {
        let feed = LocationFeed::new(true);
        let requester = feed.clone();
        let handle = tokio::spawn(async move { requester.current_fix().await });

        while feed.active_subscriptions() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(feed.publish(Some(Coordinates::new(1.0, 2.0))), 1);

        let fix = handle.await.unwrap().unwrap();
        assert_eq!(fix, Some(Coordinates::new(1.0, 2.0)));
        assert_eq!(feed.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_feed_releases_subscription_on_timeout() {
        let feed = LocationFeed::new(true);
        let result =
            tokio::time::timeout(Duration::from_millis(20), feed.current_fix()).await;
        assert!(result.is_err());
        assert_eq!(feed.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_feed_absence_signal() {
        let feed = LocationFeed::new(true);
        let requester = feed.clone();
        let handle = tokio::spawn(async move { requester.current_fix().await });

        while feed.active_subscriptions() == 0 {
            tokio::task::yield_now().await;
        }
        feed.publish(None);
        assert_eq!(handle.await.unwrap().unwrap(), None);
    }

    #[test]
    fn test_feed_permission_toggle() {
        let feed = LocationFeed::new(false);
        assert!(!feed.has_permission());
        feed.set_permission(true);
        assert!(feed.has_permission());
    }

    #[test]
    fn test_publish_without_subscribers_reaches_nobody() {
        let feed = LocationFeed::new(true);
        assert_eq!(feed.publish(Some(Coordinates::new(0.0, 0.0))), 0);
    }

    #[test]
    fn test_build_fixed_source_from_config() {
        let location = LocationConfig {
            latitude: Some(-6.2),
            longitude: Some(106.8),
            permission_granted: true,
            ..Default::default()
        };
        let source = build_location_source(&location, &WeatherConfig::default()).unwrap();
        assert!(source.has_permission());
    }
}
