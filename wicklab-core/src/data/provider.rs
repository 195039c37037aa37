//! Bar provider trait and structured data errors.
//!
//! A `BarProvider` abstracts over bar sources (CSV export, Yahoo Finance) so
//! the command line can fall back from one symbol or source to another and
//! tests can substitute an in-memory source.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Structured error types for bar loading.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns {missing:?}; available columns: {available:?}")]
    MissingColumn {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("row {row}: cannot parse {column} value '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: cannot parse timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("duplicate timestamp {timestamp}")]
    DuplicateTimestamp { timestamp: String },

    #[error("insufficient data: {got} bars, at least {required} required")]
    InsufficientBars { got: usize, required: usize },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Where the bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    CsvImport,
    YahooFinance,
    Synthetic,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CsvImport => "csv_import",
            Self::YahooFinance => "yahoo_finance",
            Self::Synthetic => "synthetic",
        }
    }
}

/// A normalized bar sequence plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    /// Symbol, or the file path for CSV imports.
    pub label: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
}

impl LoadedBars {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Trait for bar sources keyed by symbol.
pub trait BarProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str) -> Result<LoadedBars, DataError>;
}
