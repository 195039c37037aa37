//! wicklab CLI: parameter search and single backtests for the
//! displacement-wick reversal strategy.
//!
//! Commands:
//! - `optimize` runs the parameter search and writes the best set, its trade
//!   log and a JSON summary. Ctrl-C stops it early; the best trial so far is
//!   still reported and written.
//! - `backtest` evaluates one Parameter Set and writes its trade log

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use wicklab_core::data::{
    load_csv, require_min_bars, BarProvider, LoadedBars, YahooProvider, MIN_BARS,
};
use wicklab_core::ParameterSet;
use wicklab_runner::export::{
    write_best_parameters, write_best_trial_json, write_trade_log, ReportContext,
    BEST_PARAMETERS_FILE, BEST_TRIAL_FILE, TRADE_LOG_FILE,
};
use wicklab_runner::{
    run_backtest, run_search, BacktestResult, MetricsSummary, SearchConfig, SearchOutcome,
    SearchProgress, StrategyKind,
};

/// Symbols tried, in order, after the requested one comes back short.
const FALLBACK_SYMBOLS: [&str; 2] = ["NQ=F", "SPY"];

#[derive(Parser)]
#[command(
    name = "wicklab",
    about = "Displacement-wick reversal strategy: backtest and parameter search"
)]
struct Cli {
    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// CSV file with time/open/high/low/close columns.
    #[arg(long, conflicts_with = "symbol")]
    data: Option<PathBuf>,

    /// Yahoo Finance symbol to download when no --data file is given.
    #[arg(long, default_value = "MNQ=F")]
    symbol: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the parameter space for the best-scoring set.
    Optimize {
        #[command(flatten)]
        data: DataArgs,

        /// Search configuration (TOML).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Trial budget. Overrides the config file.
        #[arg(long)]
        trials: Option<usize>,

        /// random or grid. Overrides the config file.
        #[arg(long)]
        strategy: Option<StrategyKind>,

        /// Master seed. Overrides the config file.
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads. Defaults to all cores.
        #[arg(long)]
        threads: Option<usize>,

        /// Directory for the result files.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Evaluate a single Parameter Set.
    Backtest {
        #[command(flatten)]
        data: DataArgs,

        /// Config whose [params] table is the Parameter Set. Defaults otherwise.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the trade log.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file)?;

    match cli.command {
        Commands::Optimize {
            data,
            config,
            trials,
            strategy,
            seed,
            threads,
            output_dir,
        } => run_optimize(
            &data,
            config.as_deref(),
            SearchOverrides {
                trials,
                strategy,
                seed,
                threads,
            },
            &output_dir,
        ),
        Commands::Backtest {
            data,
            config,
            output_dir,
        } => run_backtest_cmd(&data, config.as_deref(), &output_dir),
    }
}

fn init_tracing(log_file: Option<PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| anyhow!("failed to create log directory {parent:?}: {err}"))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| anyhow!("failed to open log file {path:?}: {err}"))?;
        let (writer, guard) = non_blocking(file);
        // Dropping the guard stops the writer thread.
        let _guard = Box::leak(Box::new(guard));
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    }
}

/// Load bars from `--data`, or download `--symbol` with the fallback chain.
fn load_bars(args: &DataArgs) -> Result<LoadedBars> {
    if let Some(path) = &args.data {
        let loaded = load_csv(path).with_context(|| format!("loading {}", path.display()))?;
        require_min_bars(&loaded.bars, MIN_BARS)?;
        return Ok(loaded);
    }

    let provider = YahooProvider::new()?;
    let mut candidates = vec![args.symbol.as_str()];
    candidates.extend(FALLBACK_SYMBOLS.iter().filter(|s| **s != args.symbol));

    for symbol in candidates {
        info!(symbol, provider = provider.name(), "downloading bars");
        match provider.fetch(symbol) {
            Ok(loaded) if loaded.len() >= MIN_BARS => return Ok(loaded),
            Ok(loaded) => warn!(symbol, bars = loaded.len(), required = MIN_BARS, "too few bars"),
            Err(err) => warn!(symbol, error = %err, "download failed"),
        }
    }
    bail!("no data source returned at least {MIN_BARS} bars")
}

fn load_config(path: Option<&Path>) -> Result<SearchConfig> {
    match path {
        Some(p) => SearchConfig::from_file(p).with_context(|| format!("config {}", p.display())),
        None => Ok(SearchConfig::default()),
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir {}", dir.display()))
}

struct SearchOverrides {
    trials: Option<usize>,
    strategy: Option<StrategyKind>,
    seed: Option<u64>,
    threads: Option<usize>,
}

fn run_optimize(
    data: &DataArgs,
    config_path: Option<&Path>,
    overrides: SearchOverrides,
    output_dir: &Path,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(trials) = overrides.trials {
        config.search.trials = trials;
    }
    if let Some(strategy) = overrides.strategy {
        config.search.strategy = strategy;
    }
    if let Some(seed) = overrides.seed {
        config.search.seed = seed;
    }
    if overrides.threads.is_some() {
        config.search.threads = overrides.threads;
    }

    let loaded = load_bars(data)?;
    let space = config.search_space()?;
    let mut strategy = config
        .search
        .strategy
        .build(space, config.params.clone(), config.search.seed)?;

    println!(
        "Optimizing on {} ({} bars): {} search, {} trials, seed {}",
        loaded.label,
        loaded.len(),
        config.search.strategy,
        config.search.trials,
        config.search.seed
    );

    let progress = |p: &SearchProgress| {
        let best = p
            .best_score
            .map_or_else(|| "-".to_string(), |s| format!("{s:.4}"));
        eprintln!("  trial {}/{}  best score {best}", p.completed, p.total);
    };
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("failed to install Ctrl-C handler")?;

    let outcome = run_search(
        &loaded.bars,
        strategy.as_mut(),
        &config.settings(),
        Some(&progress),
        Some(cancel.as_ref()),
    )?;
    if outcome.cancelled {
        warn!(
            completed = outcome.trials_completed,
            requested = outcome.trials_requested,
            "search cancelled"
        );
    }

    let Some(best) = outcome.best.as_ref() else {
        bail!("search stopped before any trial completed");
    };

    // Re-run the winner to recover its trade list.
    let result = run_backtest(&loaded.bars, &best.params)?;

    println!();
    println!("=== Best Parameters (trial {}) ===", best.index);
    for (name, value) in best.params.entries() {
        println!("{name:<28} {value}");
    }
    print_metrics(&result.metrics, result.score);
    println!("{}", completion_line(&outcome));

    ensure_dir(output_dir)?;
    let ctx = ReportContext {
        data_label: loaded.label.clone(),
        bar_count: loaded.len(),
        dataset_hash: result.dataset_hash.clone(),
        strategy: outcome.strategy.clone(),
        trials_completed: outcome.trials_completed,
    };
    write_best_parameters(
        &output_dir.join(BEST_PARAMETERS_FILE),
        &best.params,
        &result.metrics,
        result.score,
        &ctx,
    )?;
    write_trade_log(&output_dir.join(TRADE_LOG_FILE), &result.trades)?;
    write_best_trial_json(&output_dir.join(BEST_TRIAL_FILE), best, &ctx)?;
    println!("Results written to {}", output_dir.display());
    Ok(())
}

fn completion_line(outcome: &SearchOutcome) -> String {
    let verb = if outcome.cancelled { "Cancelled after" } else { "Completed" };
    format!(
        "{verb} {} of {} trials in {:.1}s",
        outcome.trials_completed, outcome.trials_requested, outcome.elapsed_secs
    )
}

fn run_backtest_cmd(data: &DataArgs, config_path: Option<&Path>, output_dir: &Path) -> Result<()> {
    let params: ParameterSet = load_config(config_path)?.params;
    let loaded = load_bars(data)?;
    let result = run_backtest(&loaded.bars, &params)?;

    print_backtest(&loaded, &result);

    ensure_dir(output_dir)?;
    let log_path = output_dir.join("backtest_trades.csv");
    write_trade_log(&log_path, &result.trades)?;
    let json_path = output_dir.join("backtest_result.json");
    let json = serde_json::to_string_pretty(&result).context("serializing backtest result")?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;
    println!("Trade log written to {}", log_path.display());
    Ok(())
}

fn print_backtest(loaded: &LoadedBars, result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Data:           {} ({})", loaded.label, loaded.source.as_str());
    println!("Period:         {} to {}", result.first_bar, result.last_bar);
    println!("Bars:           {}", result.bar_count);
    println!(
        "Signals:        {} ({} with a risk level)",
        result.signal_count, result.actionable_count
    );
    if result.open_at_end {
        println!("Open at end:    yes (discarded)");
    }
    print_metrics(&result.metrics, result.score);
}

fn print_metrics(metrics: &MetricsSummary, score: f64) {
    println!();
    println!("--- Performance ---");
    println!("Score:          {score:.4}");
    println!(
        "Trades:         {} ({} won, {} lost)",
        metrics.total_trades, metrics.winners, metrics.losers
    );
    println!("Win Rate:       {:.1}%", metrics.win_rate);
    println!("Profit Factor:  {:.2}", metrics.profit_factor);
    println!("Total P&L:      ${:.2}", metrics.total_pnl);
    println!("Avg Winner:     ${:.2}", metrics.avg_winner);
    println!("Avg Loser:      ${:.2}", metrics.avg_loser);
    println!("Avg R:          {:.2}", metrics.avg_r);
    println!("Max Drawdown:   ${:.2}", metrics.max_drawdown);
    println!("Sharpe:         {:.3}", metrics.sharpe);
}
