//! Normalization of a raw provider response into a [`WeatherRecord`].
//!
//! The response is read through [`OwCurrentView`], a view of the OpenWeather
//! current-weather document in which every field is optional. A field that is
//! missing becomes `None`; a field with the wrong shape fails the whole view.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::model::{RawObservation, WeatherRecord};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unexpected response structure: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("observation has no timestamp")]
    MissingTimestamp,

    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("missing essential field '{0}'")]
    MissingField(&'static str),
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWeather {
    main: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwCurrentView {
    name: Option<String>,
    sys: Option<OwSys>,
    main: Option<OwMain>,
    weather: Option<Vec<OwWeather>>,
    wind: Option<OwWind>,
    dt: Option<i64>,
}

impl OwCurrentView {
    fn country(&self) -> Option<&str> {
        self.sys.as_ref()?.country.as_deref()
    }

    fn main(&self) -> Option<&OwMain> {
        self.main.as_ref()
    }

    fn condition(&self) -> Option<&OwWeather> {
        self.weather.as_ref()?.first()
    }

    fn wind_speed(&self) -> Option<f64> {
        self.wind.as_ref()?.speed
    }
}

/// Extract a record, logging and discarding any failure.
pub fn extract(observation: &RawObservation) -> Option<WeatherRecord> {
    match try_extract(observation) {
        Ok(record) => Some(record),
        Err(err @ ExtractError::MissingField(_)) => {
            warn!("Skipping observation: {err}");
            None
        }
        Err(err) => {
            warn!("Couldn't extract the required fields: {err}");
            None
        }
    }
}

pub fn try_extract(observation: &RawObservation) -> Result<WeatherRecord, ExtractError> {
    let view = OwCurrentView::deserialize(observation.as_value())?;

    let dt = view.dt.ok_or(ExtractError::MissingTimestamp)?;
    let timestamp_utc = format_timestamp(dt)?;

    let city = non_empty(view.name.as_deref()).ok_or(ExtractError::MissingField("city"))?;
    let country = non_empty(view.country()).ok_or(ExtractError::MissingField("country"))?;
    let temp_celsius = view
        .main()
        .and_then(|m| m.temp)
        .ok_or(ExtractError::MissingField("temp_celsius"))?;

    let condition = view.condition();

    Ok(WeatherRecord {
        city: city.to_string(),
        country: country.to_string(),
        temp_celsius,
        feels_like_celsius: view.main().and_then(|m| m.feels_like),
        weather_main: condition.and_then(|w| w.main.clone()),
        weather_desc: condition.and_then(|w| w.description.clone()),
        humidity: view.main().and_then(|m| m.humidity),
        wind_speed: view.wind_speed(),
        timestamp_utc,
    })
}

fn format_timestamp(ts: i64) -> Result<String, ExtractError> {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .ok_or(ExtractError::InvalidTimestamp(ts))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
