//! End-to-end: CSV on disk, search, re-evaluation of the best set, export.

use std::io::Write;
use std::sync::atomic::AtomicBool;

use wicklab_core::data::{load_csv, MIN_BARS};
use wicklab_core::ParameterSet;
use wicklab_runner::export::{
    write_best_parameters, write_best_trial_json, write_trade_log, ReportContext,
    BEST_PARAMETERS_FILE, BEST_TRIAL_FILE, TRADE_LOG_FILE,
};
use wicklab_runner::{
    fitness, run_backtest, run_search, SearchConfig, SearchSettings, SearchSpace, StrategyKind,
};

/// Write `n` five-minute bars of a seeded walk as a chart-export CSV.
fn write_csv(path: &std::path::Path, n: usize) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "Time, Open, High, Low, Close, Volume").unwrap();
    let mut state: u64 = 0xD1B5_4A32_D192_ED03;
    let mut price = 21_000.0f64;
    for i in 0..n {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let r = ((state >> 33) as f64) / (1u64 << 31) as f64;
        let mut body = (r - 0.5) * 10.0;
        if i % 19 == 7 {
            body *= 7.0;
        }
        let upper = 0.25 * ((state >> 8) % 24) as f64;
        let lower = 0.25 * ((state >> 16) % 24) as f64;
        let open = price;
        let close = open + body;
        let minutes = 5 * i as i64;
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 9, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::minutes(minutes);
        writeln!(
            file,
            "{},{:.2},{:.2},{:.2},{:.2},{}",
            ts.format("%Y-%m-%d %H:%M:%S"),
            open,
            open.max(close) + upper,
            open.min(close) - lower,
            close,
            100 + i
        )
        .unwrap();
        price = close;
    }
}

#[test]
fn optimize_pipeline_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("bars.csv");
    write_csv(&csv_path, 2_000);

    let loaded = load_csv(&csv_path).unwrap();
    assert_eq!(loaded.len(), 2_000);
    assert!(loaded.len() >= MIN_BARS);

    let config = SearchConfig::from_toml(
        r#"
        [search]
        trials = 24
        seed = 11
        batch_size = 8
        threads = 2
        "#,
    )
    .unwrap();
    let mut strategy = config
        .search
        .strategy
        .build(config.search_space().unwrap(), config.params.clone(), config.search.seed)
        .unwrap();
    let outcome = run_search(&loaded.bars, strategy.as_mut(), &config.settings(), None, None).unwrap();
    assert_eq!(outcome.trials_completed, 24);
    assert!(!outcome.cancelled);
    let best = outcome.best.unwrap();

    // Re-evaluating the best set reproduces its score.
    let result = run_backtest(&loaded.bars, &best.params).unwrap();
    assert_eq!(result.metrics, best.metrics);
    assert_eq!(result.score.to_bits(), best.score.to_bits());

    let ctx = ReportContext {
        data_label: loaded.label.clone(),
        bar_count: loaded.len(),
        dataset_hash: result.dataset_hash.clone(),
        strategy: outcome.strategy.clone(),
        trials_completed: outcome.trials_completed,
    };
    write_best_parameters(
        &dir.path().join(BEST_PARAMETERS_FILE),
        &best.params,
        &best.metrics,
        best.score,
        &ctx,
    )
    .unwrap();
    write_trade_log(&dir.path().join(TRADE_LOG_FILE), &result.trades).unwrap();
    write_best_trial_json(&dir.path().join(BEST_TRIAL_FILE), &best, &ctx).unwrap();

    let log = std::fs::read_to_string(dir.path().join(TRADE_LOG_FILE)).unwrap();
    assert_eq!(log.lines().count(), result.trades.len() + 1);
    let report = std::fs::read_to_string(dir.path().join(BEST_PARAMETERS_FILE)).unwrap();
    assert!(report.contains(&format!("Dataset: {}", result.dataset_hash)));
}

#[test]
fn same_seed_same_best_across_thread_counts() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("bars.csv");
    write_csv(&csv_path, 1_200);
    let bars = load_csv(&csv_path).unwrap().bars;

    let run = |threads: usize, batch_size: usize| {
        let mut strategy = StrategyKind::Random
            .build(SearchSpace::default_space(), ParameterSet::default(), 5)
            .unwrap();
        let settings = SearchSettings {
            trials: 20,
            batch_size,
            threads: Some(threads),
        };
        run_search(&bars, strategy.as_mut(), &settings, None, None)
            .unwrap()
            .best
            .unwrap()
    };
    assert_eq!(run(1, 1), run(4, 6));
}

#[test]
fn grid_search_over_small_space_visits_every_point() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("bars.csv");
    write_csv(&csv_path, 800);
    let bars = load_csv(&csv_path).unwrap().bars;

    let config = SearchConfig::from_toml(
        r#"
        [search]
        strategy = "grid"
        "#,
    )
    .unwrap();
    let space = SearchSpace::new()
        .with("target_rr", wicklab_runner::ParamDomain::float(1.0, 2.0, 0.5))
        .with("trade_direction", wicklab_runner::ParamDomain::choices(&["auto", "both"]));
    let mut strategy = config
        .search
        .strategy
        .build(space, config.params.clone(), 0)
        .unwrap();
    let settings = SearchSettings {
        trials: 6,
        ..SearchSettings::default()
    };
    let outcome = run_search(&bars, strategy.as_mut(), &settings, None, None).unwrap();
    assert_eq!(outcome.strategy, "grid");
    assert_eq!(outcome.trials_completed, 6);
}

#[test]
fn pre_cancelled_search_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("bars.csv");
    write_csv(&csv_path, 300);
    let bars = load_csv(&csv_path).unwrap().bars;

    let cancel = AtomicBool::new(true);
    let mut strategy = StrategyKind::Random
        .build(SearchSpace::default_space(), ParameterSet::default(), 1)
        .unwrap();
    let outcome = run_search(
        &bars,
        strategy.as_mut(),
        &SearchSettings::default(),
        None,
        Some(&cancel),
    )
    .unwrap();
    assert!(outcome.cancelled);
    assert!(outcome.best.is_none());
}

#[test]
fn short_history_scores_the_penalty() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("bars.csv");
    write_csv(&csv_path, 120);
    let bars = load_csv(&csv_path).unwrap().bars;
    let result = run_backtest(&bars, &ParameterSet::default()).unwrap();
    assert!(result.trades.len() < fitness::MIN_TRADES);
    assert_eq!(result.score, fitness::PENALTY_SCORE);
}
