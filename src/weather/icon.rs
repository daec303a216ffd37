//! Weather icon mapping

use std::fmt;

/// Closed set of condition icons
///
/// Clear sky, few clouds and rain have separate day and night variants;
/// every other condition shares one icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherIcon {
    ClearDay,
    ClearNight,
    FewCloudsDay,
    FewCloudsNight,
    ScatteredClouds,
    BrokenClouds,
    ShowerRain,
    RainDay,
    RainNight,
    Thunderstorm,
    Snow,
    Mist,
}

impl WeatherIcon {
    /// Map a service icon code such as `"10n"`; unknown or missing gives `None`
    ///
    /// # Examples
    ///
    /// ```
    /// use elysia::weather::WeatherIcon;
    ///
    /// assert_eq!(WeatherIcon::from_code(Some("01d")), Some(WeatherIcon::ClearDay));
    /// assert_eq!(WeatherIcon::from_code(Some("04n")), Some(WeatherIcon::BrokenClouds));
    /// assert_eq!(WeatherIcon::from_code(None), None);
    /// ```
    pub fn from_code(code: Option<&str>) -> Option<Self> {
        let icon = match code? {
            "01d" => WeatherIcon::ClearDay,
            "01n" => WeatherIcon::ClearNight,
            "02d" => WeatherIcon::FewCloudsDay,
            "02n" => WeatherIcon::FewCloudsNight,
            "03d" | "03n" => WeatherIcon::ScatteredClouds,
            "04d" | "04n" => WeatherIcon::BrokenClouds,
            "09d" | "09n" => WeatherIcon::ShowerRain,
            "10d" => WeatherIcon::RainDay,
            "10n" => WeatherIcon::RainNight,
            "11d" | "11n" => WeatherIcon::Thunderstorm,
            "13d" | "13n" => WeatherIcon::Snow,
            "50d" | "50n" => WeatherIcon::Mist,
            _ => return None,
        };
        Some(icon)
    }

    /// Terminal glyph for the icon
    pub fn glyph(&self) -> &'static str {
        match self {
            WeatherIcon::ClearDay => "☀",
            WeatherIcon::ClearNight => "☾",
            WeatherIcon::FewCloudsDay => "🌤",
            WeatherIcon::FewCloudsNight => "☁",
            WeatherIcon::ScatteredClouds => "☁",
            WeatherIcon::BrokenClouds => "☁",
            WeatherIcon::ShowerRain => "🌧",
            WeatherIcon::RainDay => "🌦",
            WeatherIcon::RainNight => "🌧",
            WeatherIcon::Thunderstorm => "⛈",
            WeatherIcon::Snow => "❄",
            WeatherIcon::Mist => "🌫",
        }
    }
}

impl fmt::Display for WeatherIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}
