//! wicklab runner: scoring, parameter search and result export.
//!
//! Builds on `wicklab-core` to provide:
//! - Metrics aggregation over a trade list and the trial score
//! - Single-backtest runner with trade extraction
//! - Search spaces, random and grid strategies
//! - The parallel, cancellable search controller
//! - TOML search configuration
//! - Best-parameters report, trade log CSV, JSON summary

pub mod config;
pub mod export;
pub mod fitness;
pub mod metrics;
pub mod runner;
pub mod search;

pub use config::{ConfigError, SearchConfig, SearchSection};
pub use export::{ExportError, ReportContext};
pub use metrics::MetricsSummary;
pub use runner::{run_backtest, score_params, BacktestResult, RunError};
pub use search::{
    run_search, GridSearch, ParamDomain, RandomSearch, SearchError, SearchOutcome,
    SearchProgress, SearchSettings, SearchSpace, SearchStrategy, StrategyKind, Trial,
};
