//! Weather panel core
//!
//! Fetches the current weather for the device location, reduces it to a
//! display-ready snapshot and keeps that snapshot cached in the
//! [`crate::preferences::PreferenceStore`].
//!
//! - `model`: raw API response and cached snapshot types
//! - `client`: remote weather service client
//! - `location`: single-shot location sources
//! - `policy`: staleness check and refresh orchestration
//! - `icon`: icon code mapping for display

pub mod client;
pub mod icon;
pub mod location;
pub mod model;
pub mod policy;

pub use client::{OpenWeatherClient, WeatherFetcher};
pub use icon::WeatherIcon;
pub use location::{
    build_location_source, FixedLocation, IpLookupLocation, LocationFeed, LocationSource,
};
pub use model::{Coordinates, WeatherApiResponse, WeatherSnapshot};
pub use policy::{is_stale, reduce, WeatherCachePolicy, WeatherView};
