use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cities reported on when the config file does not list any.
pub const DEFAULT_CITIES: &[&str] = &["Seattle", "Mumbai", "Los Angeles"];

/// Unprocessed provider response for one city's current weather.
///
/// The document is kept as received; [`crate::extract`] is the only place
/// that looks inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation(Value);

impl RawObservation {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Pretty-printed JSON, for dumping responses to the terminal.
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

/// Normalized, flat weather reading for one city.
///
/// Field order is the column order of the CSV export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub country: String,
    pub temp_celsius: f64,
    pub feels_like_celsius: Option<f64>,
    pub weather_main: Option<String>,
    pub weather_desc: Option<String>,
    pub humidity: Option<u8>,
    pub wind_speed: Option<f64>,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub timestamp_utc: String,
}

impl WeatherRecord {
    pub const FIELDS: [&'static str; 9] = [
        "city",
        "country",
        "temp_celsius",
        "feels_like_celsius",
        "weather_main",
        "weather_desc",
        "humidity",
        "wind_speed",
        "timestamp_utc",
    ];
}
