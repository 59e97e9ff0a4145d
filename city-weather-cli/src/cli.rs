use anyhow::Context;
use clap::Parser;
use city_weather_core::{Config, WeatherTable, render_bar_chart, report};
use std::fs;
use tracing::info;

const SEPARATOR: &str = "==============================================================================";

/// Top-level CLI struct. The report takes no arguments; cities, output
/// directory and retry settings come from the config file.
#[derive(Debug, Parser)]
#[command(
    name = "city-weather",
    version,
    about = "Current weather for a list of cities, saved as CSV and JSON"
)]
pub struct Cli {}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;
        let api_key = config.api_key_from_env();

        let report = report::run(&config, api_key).await;

        for observation in &report.observations {
            println!("{}", observation.to_pretty_string());
        }

        println!("{SEPARATOR}");
        println!("Cleaned data:");
        println!("{}", serde_json::to_string_pretty(&report.records)?);

        let mut table = report.table();
        println!("{SEPARATOR}");
        print!("{}", table.render());

        table.sort_by_temperature();
        println!("{SEPARATOR}");
        print!("{}", table.render());

        println!("{SEPARATOR}");
        save(&config, &table)?;

        println!("{SEPARATOR}");
        print!("{}", render_bar_chart(table.records()));

        Ok(())
    }
}

fn save(config: &Config, table: &WeatherTable) -> anyhow::Result<()> {
    let dir = config.output_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let csv_path = config.csv_path();
    table.write_csv(&csv_path)?;
    info!(path = %csv_path.display(), rows = table.len(), "CSV saved");

    let json_path = config.json_path();
    table.write_json(&json_path)?;
    info!(path = %json_path.display(), rows = table.len(), "JSON saved");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["city-weather", "--city", "Paris"]).is_err());
        assert!(Cli::try_parse_from(["city-weather"]).is_ok());
    }

    #[test]
    fn save_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: Some(dir.path().join("out")),
            ..Config::default()
        };

        save(&config, &WeatherTable::default()).unwrap();

        let csv = fs::read_to_string(config.csv_path()).unwrap();
        assert!(csv.starts_with("city,country,temp_celsius"));
        let json = fs::read_to_string(config.json_path()).unwrap();
        assert_eq!(json.trim(), "[]");
    }
}
