//! Result persistence: best-parameters report, trade log CSV, JSON summary.
//!
//! The trade log column order is fixed:
//! entry_time, exit_time, direction, entry, exit, stop, target, pnl_points,
//! pnl_ticks, pnl_dollars, exit_reason, risk, r_multiple

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use wicklab_core::domain::Trade;
use wicklab_core::ParameterSet;

use crate::metrics::MetricsSummary;
use crate::runner::SCHEMA_VERSION;
use crate::search::Trial;

pub const BEST_PARAMETERS_FILE: &str = "best_parameters.txt";
pub const TRADE_LOG_FILE: &str = "optimized_trades.csv";
pub const BEST_TRIAL_FILE: &str = "best_trial.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_time(t: &NaiveDateTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn format_ratio(v: f64) -> String {
    if v.is_infinite() {
        "inf".to_string()
    } else {
        format!("{v:.2}")
    }
}

/// Context printed in the report header and results block.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    /// Where the bars came from (file path or symbol).
    pub data_label: String,
    pub bar_count: usize,
    pub dataset_hash: String,
    pub strategy: String,
    pub trials_completed: usize,
}

/// Render the best-parameters report.
pub fn render_best_parameters(
    params: &ParameterSet,
    metrics: &MetricsSummary,
    score: f64,
    ctx: &ReportContext,
) -> String {
    let mut out = String::with_capacity(1024);

    out.push_str("OPTIMIZED PARAMETERS - Displacement Wick Strategy\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');
    out.push_str(&format!("Data: {} ({} bars)\n", ctx.data_label, ctx.bar_count));
    out.push_str(&format!(
        "Search: {} ({} trials)\n",
        ctx.strategy, ctx.trials_completed
    ));
    out.push('\n');

    for (name, value) in params.entries() {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out.push('\n');

    out.push_str("RESULTS\n");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    out.push_str(&format!("Score: {}\n", format_ratio(score)));
    out.push_str(&format!("Total Trades: {}\n", metrics.total_trades));
    out.push_str(&format!("Win Rate: {:.2}%\n", metrics.win_rate));
    out.push_str(&format!(
        "Profit Factor: {}\n",
        format_ratio(metrics.profit_factor)
    ));
    out.push_str(&format!("Total P&L: ${:.2}\n", metrics.total_pnl));
    out.push_str(&format!("Avg R: {:.2}\n", metrics.avg_r));
    out.push_str(&format!("Max Drawdown: ${:.2}\n", metrics.max_drawdown));
    out.push_str(&format!("Sharpe: {:.2}\n", metrics.sharpe));
    out.push_str(&format!("Dataset: {}\n", ctx.dataset_hash));
    out
}

pub fn write_best_parameters(
    path: &Path,
    params: &ParameterSet,
    metrics: &MetricsSummary,
    score: f64,
    ctx: &ReportContext,
) -> Result<(), ExportError> {
    let text = render_best_parameters(params, metrics, score, ctx);
    std::fs::write(path, text).map_err(io_err(path))?;
    info!(path = %path.display(), "wrote best parameters");
    Ok(())
}

/// One row of the trade log.
#[derive(Debug, Serialize)]
struct TradeRow<'a> {
    entry_time: String,
    exit_time: String,
    direction: &'a str,
    entry: f64,
    exit: f64,
    stop: f64,
    target: f64,
    pnl_points: f64,
    pnl_ticks: f64,
    pnl_dollars: f64,
    exit_reason: &'a str,
    risk: f64,
    r_multiple: f64,
}

impl<'a> From<&'a Trade> for TradeRow<'a> {
    fn from(t: &'a Trade) -> Self {
        Self {
            entry_time: format_time(&t.entry_time),
            exit_time: format_time(&t.exit_time),
            direction: t.direction.as_str(),
            entry: t.entry_price,
            exit: t.exit_price,
            stop: t.stop,
            target: t.target,
            pnl_points: t.pnl_points,
            pnl_ticks: t.pnl_ticks,
            pnl_dollars: t.pnl_dollars,
            exit_reason: t.exit_reason.as_str(),
            risk: t.risk,
            r_multiple: t.r_multiple,
        }
    }
}

const TRADE_LOG_HEADER: [&str; 13] = [
    "entry_time",
    "exit_time",
    "direction",
    "entry",
    "exit",
    "stop",
    "target",
    "pnl_points",
    "pnl_ticks",
    "pnl_dollars",
    "exit_reason",
    "risk",
    "r_multiple",
];

/// Trade log as CSV text. An empty log still has its header row.
pub fn trade_log_csv(trades: &[Trade]) -> Result<String, ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(TRADE_LOG_HEADER)?;
    for trade in trades {
        wtr.serialize(TradeRow::from(trade))?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

pub fn write_trade_log(path: &Path, trades: &[Trade]) -> Result<(), ExportError> {
    let text = trade_log_csv(trades)?;
    std::fs::write(path, text).map_err(io_err(path))?;
    info!(path = %path.display(), trades = trades.len(), "wrote trade log");
    Ok(())
}

#[derive(Debug, Serialize)]
struct BestTrialFile<'a> {
    schema_version: u32,
    data_label: &'a str,
    dataset_hash: &'a str,
    strategy: &'a str,
    trials_completed: usize,
    best: &'a Trial,
}

pub fn write_best_trial_json(
    path: &Path,
    trial: &Trial,
    ctx: &ReportContext,
) -> Result<(), ExportError> {
    let doc = BestTrialFile {
        schema_version: SCHEMA_VERSION,
        data_label: &ctx.data_label,
        dataset_hash: &ctx.dataset_hash,
        strategy: &ctx.strategy,
        trials_completed: ctx.trials_completed,
        best: trial,
    };
    let json = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, json).map_err(io_err(path))?;
    info!(path = %path.display(), "wrote best trial");
    Ok(())
}
