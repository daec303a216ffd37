//! Background weather refresh for the home-screen widget
//!
//! Each run forces a refresh through the shared [`WeatherCachePolicy`], then
//! turns the result into three display lines. A failed run asks to be
//! retried; the cache keeps its previous snapshot.

use crate::weather::{WeatherCachePolicy, WeatherIcon, WeatherSnapshot};
use chrono::{Local, Locale, TimeZone};
use std::future::Future;
use std::time::Duration;

const UNKNOWN_CITY: &str = "Lokasi ?";
const UNKNOWN_TEMPERATURE: &str = "--°";
const UNKNOWN_CONDITION: &str = "...";
const DEFAULT_ERROR: &str = "Gagal memuat";

/// What the widget currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetState {
    Ready(WeatherSnapshot),
    Error {
        message: String,
        last: Option<WeatherSnapshot>,
    },
}

impl WidgetState {
    /// The three widget text lines: title, reading, footer
    ///
    /// # Examples
    ///
    /// ```
    /// use elysia::widget::WidgetState;
    ///
    /// let state = WidgetState::Error { message: String::new(), last: None };
    /// assert_eq!(state.lines(), ["Gagal memuat", "N/A", "Coba lagi nanti"]);
    /// ```
    pub fn lines(&self) -> [String; 3] {
        match self {
            WidgetState::Ready(snapshot) => [
                snapshot
                    .city_name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_CITY.to_string()),
                format!(
                    "{} / {}",
                    snapshot.temperature.as_deref().unwrap_or(UNKNOWN_TEMPERATURE),
                    snapshot.condition.as_deref().unwrap_or(UNKNOWN_CONDITION)
                ),
                format!("Update: {}", format_update_time(snapshot.last_updated)),
            ],
            WidgetState::Error { message, .. } => {
                let title = if message.trim().is_empty() {
                    DEFAULT_ERROR.to_string()
                } else {
                    message.clone()
                };
                [title, "N/A".to_string(), "Coba lagi nanti".to_string()]
            }
        }
    }

    /// Icon for the current state; `None` means the error or unknown icon
    pub fn icon(&self) -> Option<WeatherIcon> {
        match self {
            WidgetState::Ready(snapshot) => WeatherIcon::from_code(snapshot.icon_code.as_deref()),
            WidgetState::Error { .. } => None,
        }
    }
}

/// Local time with an Indonesian month abbreviation, e.g. `14:07, 05 Agu`
fn format_update_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => time
            .format_localized("%H:%M, %d %b", Locale::id_ID)
            .to_string(),
        None => "--:--".to_string(),
    }
}

/// Whether the scheduler should consider a run finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Success,
    Retry,
}

/// Runs widget refreshes
#[derive(Clone)]
pub struct WidgetRefresher {
    policy: WeatherCachePolicy,
}

impl WidgetRefresher {
    /// Create a refresher sharing `policy` with the rest of the app
    pub fn new(policy: WeatherCachePolicy) -> Self {
        Self { policy }
    }

    /// Force one refresh and report the resulting widget state
    pub async fn run_once(&self) -> (WidgetState, RefreshOutcome) {
        tracing::debug!("Widget refresh started");
        match self.policy.refresh().await {
            Ok(snapshot) => {
                tracing::info!("Widget updated with fresh weather");
                (WidgetState::Ready(snapshot), RefreshOutcome::Success)
            }
            Err(error) => {
                tracing::error!("Widget failed to refresh weather: {}", error);
                let state = WidgetState::Error {
                    message: error.to_string(),
                    last: self.policy.cached(),
                };
                (state, RefreshOutcome::Retry)
            }
        }
    }

    /// Refresh every `interval` until `shutdown` resolves
    ///
    /// The first run happens immediately. `on_state` sees every state the
    /// widget would display.
    pub async fn run_periodic<S, F>(&self, interval: Duration, shutdown: S, mut on_state: F)
    where
        S: Future<Output = ()>,
        F: FnMut(&WidgetState, RefreshOutcome),
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Widget refresher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let (state, outcome) = self.run_once().await;
                    if outcome == RefreshOutcome::Retry {
                        tracing::warn!("Widget refresh will be retried in {:?}", interval);
                    }
                    on_state(&state, outcome);
                }
            }
        }
    }
}
