use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use common::{BacktestError, Bar, Result};
use rust_decimal::Decimal;

/// Column positions resolved from the CSV header
#[derive(Debug)]
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
                .ok_or_else(|| {
                    BacktestError::CsvError(format!("Missing column: {}", names.join("/")))
                })
        };

        Ok(Self {
            timestamp: find(&["date", "timestamp", "datetime", "time"])?,
            open: find(&["open"])?,
            high: find(&["high"])?,
            low: find(&["low"])?,
            close: find(&["close"])?,
            volume: find(&["volume"])?,
        })
    }
}

/// Load bars from CSV file
///
/// Columns are matched by header name, so exports with extra columns
/// (`Adj Close`, `Dividends`) load unchanged.
pub fn load_csv(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).map_err(|e| BacktestError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| BacktestError::CsvError(e.to_string()))?
        .clone();
    let cols = Columns::from_headers(&headers)?;

    let mut bars = Vec::new();

    for (row, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| BacktestError::CsvError(e.to_string()))?;

        // Skip blank trailing lines
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let field = |idx: usize, name: &str| {
            record.get(idx).ok_or_else(|| {
                BacktestError::CsvError(format!("Row {}: missing {} value", row + 1, name))
            })
        };

        bars.push(Bar {
            timestamp: parse_timestamp(field(cols.timestamp, "timestamp")?)?,
            open: parse_decimal(field(cols.open, "open")?, "open")?,
            high: parse_decimal(field(cols.high, "high")?, "high")?,
            low: parse_decimal(field(cols.low, "low")?, "low")?,
            close: parse_decimal(field(cols.close, "close")?, "close")?,
            volume: parse_decimal(field(cols.volume, "volume")?, "volume")?,
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Load bars from JSON file
pub fn load_json(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).map_err(|e| BacktestError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut bars: Vec<Bar> = serde_json::from_reader(reader)?;
    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Parse a price or volume, tolerating thousands separators and a currency sign
fn parse_decimal(s: &str, name: &str) -> Result<Decimal> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| BacktestError::CsvError(format!("Invalid {}: {}", name, s)))
}

/// Parse timestamp from various formats
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    // Try ISO 8601 format first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for fmt in &date_formats {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
        }
    }

    // Try Unix timestamp (seconds)
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(BacktestError::CsvError(format!(
        "Unable to parse timestamp: {}",
        s
    )))
}
