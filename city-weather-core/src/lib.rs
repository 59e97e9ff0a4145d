//! Core library for the `city-weather` report.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap fetcher with its retry policy
//! - Normalization of raw responses into flat records
//! - Tabulation, CSV/JSON export and a terminal bar chart
//!
//! It is used by `city-weather-cli`, but can also be reused by other binaries or services.

pub mod chart;
pub mod config;
pub mod extract;
pub mod model;
pub mod provider;
pub mod report;
pub mod table;

pub use chart::render_bar_chart;
pub use config::{ApiKey, Config};
pub use extract::{ExtractError, extract, try_extract};
pub use model::{DEFAULT_CITIES, RawObservation, WeatherRecord};
pub use provider::{FetchError, OpenWeatherFetcher, RetryPolicy, Sleeper, TokioSleeper};
pub use report::Report;
pub use table::WeatherTable;
