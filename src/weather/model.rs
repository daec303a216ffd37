//! Weather data types
//!
//! [`WeatherApiResponse`] mirrors the remote service's JSON and is discarded
//! after each fetch. [`WeatherSnapshot`] is the reduced form that gets cached.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl Coordinates {
    /// Create a coordinate pair
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Display-ready weather record persisted in the preference store
///
/// Every field except `last_updated` may be missing; partial responses still
/// produce a valid snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// City name reported by the service
    pub city_name: Option<String>,
    /// Formatted temperature, e.g. `"28°C"`
    pub temperature: Option<String>,
    /// Condition description with a capitalised first letter
    pub condition: Option<String>,
    /// Service icon code, e.g. `"01d"`
    pub icon_code: Option<String>,
    /// Time of the successful fetch, milliseconds since the Unix epoch
    pub last_updated: i64,
}

/// Raw current-weather response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherApiResponse {
    #[serde(rename = "coord", default)]
    pub coordinates: Option<ResponseCoordinates>,
    #[serde(rename = "weather", default)]
    pub weather_descriptions: Option<Vec<WeatherDescription>>,
    #[serde(rename = "main", default)]
    pub main_weather_data: Option<MainWeatherData>,
    #[serde(rename = "wind", default)]
    pub wind_data: Option<WindData>,
    #[serde(rename = "sys", default)]
    pub system_data: Option<SystemData>,
    #[serde(rename = "name", default)]
    pub city_name: Option<String>,
    #[serde(rename = "cod", default)]
    pub response_code: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseCoordinates {
    #[serde(rename = "lon", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "lat", default)]
    pub latitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherDescription {
    #[serde(default)]
    pub id: Option<i64>,
    /// Category such as "Rain" or "Clouds"
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainWeatherData {
    #[serde(rename = "temp", default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub pressure: Option<i64>,
    #[serde(default)]
    pub humidity: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindData {
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(rename = "deg", default)]
    pub degree: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemData {
    #[serde(rename = "country", default)]
    pub country_code: Option<String>,
    #[serde(rename = "sunrise", default)]
    pub sunrise_timestamp: Option<i64>,
    #[serde(rename = "sunset", default)]
    pub sunset_timestamp: Option<i64>,
}

impl WeatherApiResponse {
    /// First condition descriptor, if any
    pub fn primary_description(&self) -> Option<&WeatherDescription> {
        self.weather_descriptions.as_ref()?.first()
    }

    /// Current temperature
    pub fn temperature(&self) -> Option<f64> {
        self.main_weather_data.as_ref()?.temperature
    }
}
