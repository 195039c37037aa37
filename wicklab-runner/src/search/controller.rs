//! Parameter Search Controller.
//!
//! Trials are proposed sequentially in batches, each batch is evaluated in
//! parallel with Rayon, and results are folded into the best-so-far in trial
//! index order. The fold is the only serialization point; a trial never
//! reads another trial's state.
//!
//! Ties: a later trial replaces the best only with a strictly greater score,
//! so the first-seen trial wins exact ties regardless of thread count.
//!
//! Cancellation is cooperative and checked before each trial starts. A
//! cancelled search returns the best trial among those that ran.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use wicklab_core::domain::Bar;
use wicklab_core::ParameterSet;

use super::strategy::SearchStrategy;
use super::SearchError;
use crate::fitness;
use crate::metrics::MetricsSummary;
use crate::runner::score_params;

/// One scored evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub index: usize,
    pub params: ParameterSet,
    pub metrics: MetricsSummary,
    #[serde(with = "crate::metrics::extended_f64")]
    pub score: f64,
}

/// Controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Trial budget.
    pub trials: usize,
    /// Trials proposed and evaluated together. 0 means one batch per
    /// available worker thread.
    pub batch_size: usize,
    /// Worker thread cap. `None` uses Rayon's global pool.
    pub threads: Option<usize>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            trials: 100,
            batch_size: 0,
            threads: None,
        }
    }
}

/// Progress update sent after every batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchProgress {
    pub completed: usize,
    pub total: usize,
    pub best_score: Option<f64>,
}

/// Final result of a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub strategy: String,
    /// `None` only if the search was cancelled before any trial ran.
    pub best: Option<Trial>,
    pub trials_completed: usize,
    pub trials_requested: usize,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|f| f.load(Ordering::Relaxed))
}

fn evaluate_trial(
    bars: &[Bar],
    index: usize,
    params: ParameterSet,
    cancel: Option<&AtomicBool>,
) -> Option<Result<Trial, SearchError>> {
    if is_cancelled(cancel) {
        return None;
    }
    debug!(trial = index, "trial started");
    let result = score_params(bars, &params)
        .map(|(metrics, score)| {
            debug!(trial = index, score, trades = metrics.total_trades, "trial finished");
            Trial {
                index,
                params,
                metrics,
                score,
            }
        })
        .map_err(SearchError::from);
    Some(result)
}

/// Run a search of `settings.trials` trials over `bars`.
///
/// # Arguments
/// - `strategy`: proposes parameter sets and receives their scores.
/// - `progress_cb`: called after each batch with `(completed, total, best score)`.
/// - `cancel`: optional flag to stop cooperatively between trials.
pub fn run_search(
    bars: &[Bar],
    strategy: &mut dyn SearchStrategy,
    settings: &SearchSettings,
    progress_cb: Option<&dyn Fn(&SearchProgress)>,
    cancel: Option<&AtomicBool>,
) -> Result<SearchOutcome, SearchError> {
    if settings.trials == 0 {
        return Err(SearchError::ZeroTrials);
    }
    let start_time = Instant::now();

    let thread_pool = match settings.threads {
        Some(n) if n > 0 => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| SearchError::ThreadPool(e.to_string()))?,
        ),
        _ => None,
    };
    let workers = thread_pool
        .as_ref()
        .map_or_else(rayon::current_num_threads, |tp| tp.current_num_threads());
    let batch_size = if settings.batch_size == 0 {
        workers.max(1)
    } else {
        settings.batch_size
    };

    info!(
        strategy = strategy.name(),
        trials = settings.trials,
        batch_size,
        workers,
        bars = bars.len(),
        "search started"
    );

    let mut history: Vec<Trial> = Vec::with_capacity(settings.trials);
    let mut best: Option<Trial> = None;
    let mut cancelled = false;
    let mut next_index = 0usize;

    while next_index < settings.trials {
        if is_cancelled(cancel) {
            cancelled = true;
            break;
        }

        let end = (next_index + batch_size).min(settings.trials);
        let mut batch = Vec::with_capacity(end - next_index);
        for index in next_index..end {
            batch.push((index, strategy.propose(index, &history)?));
        }
        next_index = end;

        let run_batch = || -> Vec<Option<Result<Trial, SearchError>>> {
            batch
                .into_par_iter()
                .map(|(index, params)| evaluate_trial(bars, index, params, cancel))
                .collect()
        };
        let results = match &thread_pool {
            Some(tp) => tp.install(run_batch),
            None => run_batch(),
        };

        // Fold in index order: `collect` on an indexed parallel iterator
        // preserves the batch order.
        for result in results {
            let Some(result) = result else {
                cancelled = true;
                continue;
            };
            let trial = result?;
            strategy.observe(trial.index, &trial.params, trial.score);

            let improved = match &best {
                None => true,
                Some(b) => fitness::is_better(trial.score, b.score),
            };
            if improved {
                info!(
                    trial = trial.index,
                    score = trial.score,
                    trades = trial.metrics.total_trades,
                    "new best trial"
                );
                best = Some(trial.clone());
            }
            history.push(trial);
        }

        if let Some(cb) = progress_cb {
            cb(&SearchProgress {
                completed: history.len(),
                total: settings.trials,
                best_score: best.as_ref().map(|b| b.score),
            });
        }
        if cancelled {
            break;
        }
    }

    if cancelled {
        info!(completed = history.len(), "search cancelled");
    }
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    info!(
        completed = history.len(),
        best_score = best.as_ref().map(|b| b.score),
        elapsed_secs,
        "search finished"
    );

    Ok(SearchOutcome {
        strategy: strategy.name().to_string(),
        best,
        trials_completed: history.len(),
        trials_requested: settings.trials,
        cancelled,
        elapsed_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::space::{ParamDomain, SearchSpace};
    use crate::search::strategy::{GridSearch, RandomSearch};
    use crate::search::tests::synthetic_bars;
    use std::sync::Mutex;
    use wicklab_core::ParamValue;

    /// Proposes a fixed list of parameter sets and records what it observed.
    struct Scripted {
        proposals: Vec<ParameterSet>,
        observed: Vec<(usize, f64)>,
    }

    impl SearchStrategy for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn propose(&mut self, trial_index: usize, history: &[Trial]) -> Result<ParameterSet, SearchError> {
            assert!(history.iter().enumerate().all(|(i, t)| t.index == i));
            Ok(self.proposals[trial_index % self.proposals.len()].clone())
        }

        fn observe(&mut self, trial_index: usize, _params: &ParameterSet, score: f64) {
            self.observed.push((trial_index, score));
        }
    }

    fn settings(trials: usize, batch_size: usize, threads: Option<usize>) -> SearchSettings {
        SearchSettings {
            trials,
            batch_size,
            threads,
        }
    }

    #[test]
    fn all_penalized_trials_keep_the_first() {
        // 30 bars cannot produce 20 trades, so every trial scores the floor.
        let bars = synthetic_bars(30);
        let mut strategy =
            RandomSearch::new(SearchSpace::default_space(), ParameterSet::default(), 9).unwrap();
        let outcome = run_search(&bars, &mut strategy, &settings(12, 5, Some(3)), None, None).unwrap();

        let best = outcome.best.unwrap();
        assert_eq!(best.score, fitness::PENALTY_SCORE);
        assert_eq!(best.index, 0);
        assert_eq!(outcome.trials_completed, 12);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn result_is_independent_of_threads_and_batching() {
        let bars = synthetic_bars(1_500);
        let run = |batch, threads| {
            let mut strategy =
                RandomSearch::new(SearchSpace::default_space(), ParameterSet::default(), 42).unwrap();
            run_search(&bars, &mut strategy, &settings(16, batch, threads), None, None)
                .unwrap()
                .best
                .unwrap()
        };
        let a = run(1, Some(1));
        let b = run(7, Some(4));
        let c = run(0, None);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn identical_scores_keep_first_seen() {
        let bars = synthetic_bars(1_500);
        let low = ParameterSet::default();
        let proposals = vec![low.clone(), low.clone(), low];
        let mut strategy = Scripted {
            proposals,
            observed: Vec::new(),
        };
        let outcome = run_search(&bars, &mut strategy, &settings(3, 2, None), None, None).unwrap();
        // Identical proposals tie; the first wins.
        assert_eq!(outcome.best.unwrap().index, 0);
        assert_eq!(
            strategy.observed.iter().map(|(i, _)| *i).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn best_matches_max_over_history() {
        let bars = synthetic_bars(1_500);
        let space = SearchSpace::new()
            .with("target_rr", ParamDomain::float(1.0, 3.0, 0.5))
            .with("stop_method", ParamDomain::choices(&["atr", "fixed_ticks"]))
            .with("displacement_length", ParamDomain::fixed(ParamValue::Int(30)));
        let mut strategy = GridSearch::new(space, ParameterSet::default()).unwrap();
        let outcome = run_search(&bars, &mut strategy, &settings(10, 3, Some(2)), None, None).unwrap();
        let best = outcome.best.unwrap();

        let mut max_score = f64::NEG_INFINITY;
        let mut first_index = usize::MAX;
        for i in 0..10 {
            let params = strategy.propose(i, &[]).unwrap();
            let (_, score) = score_params(&bars, &params).unwrap();
            if score > max_score {
                max_score = score;
                first_index = i;
            }
        }
        assert_eq!(best.index, first_index);
        assert_eq!(best.score.to_bits(), max_score.to_bits());
    }

    #[test]
    fn cancellation_before_start_returns_no_trial() {
        let bars = synthetic_bars(200);
        let cancel = AtomicBool::new(true);
        let mut strategy =
            RandomSearch::new(SearchSpace::default_space(), ParameterSet::default(), 1).unwrap();
        let outcome =
            run_search(&bars, &mut strategy, &settings(50, 4, None), None, Some(&cancel)).unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.trials_completed, 0);
        assert!(outcome.best.is_none());
    }

    #[test]
    fn cancellation_mid_search_keeps_best_so_far() {
        let bars = synthetic_bars(300);
        let cancel = AtomicBool::new(false);
        let seen = Mutex::new(Vec::new());
        let progress = |p: &SearchProgress| {
            seen.lock().unwrap().push(p.completed);
            if p.completed >= 4 {
                cancel.store(true, Ordering::Relaxed);
            }
        };
        let mut strategy =
            RandomSearch::new(SearchSpace::default_space(), ParameterSet::default(), 3).unwrap();
        let outcome = run_search(
            &bars,
            &mut strategy,
            &settings(40, 2, Some(2)),
            Some(&progress),
            Some(&cancel),
        )
        .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.trials_completed, 4);
        assert!(outcome.best.is_some());
        assert_eq!(*seen.lock().unwrap(), vec![2, 4]);
    }

    #[test]
    fn zero_trials_is_an_error() {
        let bars = synthetic_bars(10);
        let mut strategy =
            RandomSearch::new(SearchSpace::default_space(), ParameterSet::default(), 1).unwrap();
        assert!(matches!(
            run_search(&bars, &mut strategy, &settings(0, 1, None), None, None),
            Err(SearchError::ZeroTrials)
        ));
    }

    #[test]
    fn trial_serializes_infinite_scores() {
        let trial = Trial {
            index: 3,
            params: ParameterSet::default(),
            metrics: MetricsSummary::default(),
            score: f64::INFINITY,
        };
        let json = serde_json::to_string(&trial).unwrap();
        let back: Trial = serde_json::from_str(&json).unwrap();
        assert_eq!(back.score, f64::INFINITY);
    }
}
