//! Tabular view over normalized records, with CSV and JSON export.

use anyhow::{Context, Result};
use std::{fs::File, io::BufWriter, io::Write, path::Path};

use crate::model::WeatherRecord;

const ABSENT: &str = "-";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherTable {
    records: Vec<WeatherRecord>,
}

impl WeatherTable {
    pub fn new(records: Vec<WeatherRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ascending by `temp_celsius`; equal temperatures keep their order.
    pub fn sort_by_temperature(&mut self) {
        self.records
            .sort_by(|a, b| a.temp_celsius.total_cmp(&b.temp_celsius));
    }

    /// Column-aligned text rendering with a header row and no index column.
    pub fn render(&self) -> String {
        let rows: Vec<[String; 9]> = self.records.iter().map(row_cells).collect();

        let mut widths = WeatherRecord::FIELDS.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_line(&mut out, WeatherRecord::FIELDS.iter().copied(), &widths);
        for row in &rows {
            push_line(&mut out, row.iter().map(String::as_str), &widths);
        }
        out
    }

    /// Write one header row plus one row per record. Overwrites `path`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        self.write_csv_to(file)
            .with_context(|| format!("Failed to write CSV file: {}", path.display()))
    }

    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        // Headers are written by hand so an empty table still gets them.
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        wtr.write_record(WeatherRecord::FIELDS)?;
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write a pretty-printed JSON array of records. Overwrites `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create JSON file: {}", path.display()))?;
        self.write_json_to(BufWriter::new(file))
            .with_context(|| format!("Failed to write JSON file: {}", path.display()))
    }

    pub fn write_json_to<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, &self.records)
            .context("Failed to serialize records to JSON")?;
        writer.flush()?;
        Ok(())
    }
}

impl From<Vec<WeatherRecord>> for WeatherTable {
    fn from(records: Vec<WeatherRecord>) -> Self {
        Self::new(records)
    }
}

/// Read records back from a CSV export.
pub fn read_csv(path: &Path) -> Result<Vec<WeatherRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    reader
        .deserialize()
        .collect::<Result<Vec<WeatherRecord>, _>>()
        .with_context(|| format!("Failed to parse CSV file: {}", path.display()))
}

fn row_cells(record: &WeatherRecord) -> [String; 9] {
    fn opt<T: ToString>(value: &Option<T>) -> String {
        value
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| ABSENT.to_string())
    }

    [
        record.city.clone(),
        record.country.clone(),
        record.temp_celsius.to_string(),
        opt(&record.feels_like_celsius),
        opt(&record.weather_main),
        opt(&record.weather_desc),
        opt(&record.humidity),
        opt(&record.wind_speed),
        record.timestamp_utc.clone(),
    ]
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:>width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}
