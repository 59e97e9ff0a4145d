//! Terminal bar chart of temperature per city.

use crate::model::WeatherRecord;

pub const CHART_TITLE: &str = "Temperatures by City";
pub const VALUE_LABEL: &str = "°C";

const MAX_BAR_WIDTH: usize = 40;
const ABOVE_ZERO: char = '█';
const BELOW_ZERO: char = '░';

/// One bar per record, in record order. Bars scale to the largest absolute
/// temperature; sub-zero readings use a lighter glyph.
pub fn render_bar_chart(records: &[WeatherRecord]) -> String {
    let mut out = format!("{CHART_TITLE}\n");

    if records.is_empty() {
        out.push_str("(no data)\n");
        return out;
    }

    let label_width = records
        .iter()
        .map(|r| r.city.chars().count())
        .max()
        .unwrap_or(0);
    let scale = records
        .iter()
        .map(|r| r.temp_celsius.abs())
        .fold(0.0_f64, f64::max);

    out.push_str(&format!("{:>label_width$} | {VALUE_LABEL}\n", ""));

    for record in records {
        let glyph = if record.temp_celsius < 0.0 { BELOW_ZERO } else { ABOVE_ZERO };
        let bar: String = std::iter::repeat_n(glyph, bar_len(record.temp_celsius, scale)).collect();
        out.push_str(&format!(
            "{:>label_width$} | {bar} {:.1}\n",
            record.city, record.temp_celsius
        ));
    }

    out
}

fn bar_len(value: f64, scale: f64) -> usize {
    if scale <= 0.0 {
        return 0;
    }
    let ratio = (value.abs() / scale).clamp(0.0, 1.0);
    // ratio is within [0, 1], so the cast cannot overflow.
    (ratio * MAX_BAR_WIDTH as f64).round() as usize
}
