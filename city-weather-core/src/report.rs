//! The sequential batch: fetch every city, then normalize what came back.

use tracing::{error, info};

use crate::{
    config::{API_KEY_VAR, ApiKey, Config},
    extract::extract,
    model::{RawObservation, WeatherRecord},
    provider::OpenWeatherFetcher,
    table::WeatherTable,
};

/// Everything one run produced, raw and normalized.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub observations: Vec<RawObservation>,
    pub records: Vec<WeatherRecord>,
}

impl Report {
    /// Fetch `cities` one at a time and normalize the responses.
    pub async fn gather(fetcher: &OpenWeatherFetcher, cities: &[String]) -> Self {
        let observations = collect_observations(fetcher, cities).await;
        let records = normalize(&observations);

        info!(
            cities = cities.len(),
            observations = observations.len(),
            records = records.len(),
            "Weather report gathered"
        );

        Self {
            observations,
            records,
        }
    }

    pub fn table(&self) -> WeatherTable {
        WeatherTable::new(self.records.clone())
    }
}

/// Run the batch described by `config`. Without a credential nothing is
/// fetched and the report is empty.
pub async fn run(config: &Config, api_key: Option<ApiKey>) -> Report {
    let Some(api_key) = api_key else {
        error!("API key not found, set {API_KEY_VAR} or add api_key to the config file");
        return Report::default();
    };

    let fetcher = OpenWeatherFetcher::new(api_key).with_retry_policy(config.retry);
    Report::gather(&fetcher, &config.cities).await
}

/// Observations for the cities that could be fetched, in city order.
pub async fn collect_observations(
    fetcher: &OpenWeatherFetcher,
    cities: &[String],
) -> Vec<RawObservation> {
    let mut observations = Vec::with_capacity(cities.len());
    for city in cities {
        if let Some(observation) = fetcher.fetch(city).await {
            observations.push(observation);
        }
    }
    observations
}

/// Records for the observations that passed extraction, in the same order.
pub fn normalize(observations: &[RawObservation]) -> Vec<WeatherRecord> {
    observations.iter().filter_map(extract).collect()
}
