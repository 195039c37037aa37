//! CSV import for chart-platform exports (TradingView and similar).
//!
//! Headers are matched case-insensitively after trimming, with the usual
//! short aliases. A missing OHLC column is fatal; a row with an empty or
//! NaN OHLC cell is dropped.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use super::normalize;
use super::provider::{DataError, DataSource, LoadedBars};
use crate::domain::Bar;

const TIME_ALIASES: &[&str] = &["time", "date", "datetime", "timestamp"];
const REQUIRED: [&str; 4] = ["open", "high", "low", "close"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn canonical_header(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    match lower.as_str() {
        "o" => "open".into(),
        "h" => "high".into(),
        "l" => "low".into(),
        "c" => "close".into(),
        "v" => "volume".into(),
        _ => lower,
    }
}

/// Column positions after alias resolution.
#[derive(Debug)]
struct Columns {
    time: Option<usize>,
    ohlc: [usize; 4],
    volume: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, DataError> {
        let names: Vec<String> = headers.iter().map(canonical_header).collect();
        let find = |name: &str| names.iter().position(|n| n == name);

        let missing: Vec<String> = REQUIRED
            .iter()
            .filter(|c| find(**c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DataError::MissingColumn {
                missing,
                available: names.clone(),
            });
        }

        let mut ohlc = [0usize; 4];
        for (slot, name) in ohlc.iter_mut().zip(REQUIRED) {
            *slot = find(name).unwrap_or_default();
        }
        Ok(Self {
            time: TIME_ALIASES.iter().find_map(|a| find(*a)),
            ohlc,
            volume: find("volume"),
        })
    }
}

/// Parse a timestamp cell.
///
/// Accepts RFC 3339 (converted to UTC), naive date-times, bare dates, and
/// UNIX seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    s.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
}

/// `None` for an empty or NaN cell, an error for anything else unparseable.
fn parse_price(raw: &str, row: usize, column: &str) -> Result<Option<f64>, DataError> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    s.parse::<f64>()
        .map(|v| if v.is_nan() { None } else { Some(v) })
        .map_err(|_| DataError::InvalidNumber {
            row,
            column: column.to_string(),
            value: s.to_string(),
        })
}

fn synthetic_timestamp(row: usize) -> NaiveDateTime {
    DateTime::from_timestamp(row as i64 * 60, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

/// Read bars from any CSV source. Rows are returned normalized.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::resolve(rdr.headers()?)?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let mut ohlc = [0.0f64; 4];
        let mut complete = true;
        for (value, (&idx, name)) in ohlc.iter_mut().zip(columns.ohlc.iter().zip(REQUIRED)) {
            match parse_price(cell(idx), row, name)? {
                Some(v) => *value = v,
                None => complete = false,
            }
        }
        if !complete {
            dropped += 1;
            continue;
        }

        let timestamp = match columns.time {
            Some(idx) => parse_timestamp(cell(idx)).ok_or_else(|| DataError::InvalidTimestamp {
                row,
                value: cell(idx).to_string(),
            })?,
            None => synthetic_timestamp(row),
        };
        let volume = columns
            .volume
            .and_then(|idx| cell(idx).parse::<f64>().ok())
            .filter(|v| v.is_finite());

        let [open, high, low, close] = ohlc;
        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if dropped > 0 {
        warn!(dropped, "dropped CSV rows with missing OHLC values");
    }
    if columns.time.is_none() {
        warn!("no time column; using row order as one-minute timestamps");
    }
    normalize(bars)
}

/// Load and normalize a CSV file of bars.
pub fn load_csv(path: &Path) -> Result<LoadedBars, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let bars = read_bars(file)?;
    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => info!(
            path = %path.display(),
            bars = bars.len(),
            from = %first.timestamp,
            to = %last.timestamp,
            "loaded bars from CSV"
        ),
        _ => warn!(path = %path.display(), "CSV contains no usable bars"),
    }
    Ok(LoadedBars {
        label: path.display().to_string(),
        bars,
        source: DataSource::CsvImport,
    })
}
