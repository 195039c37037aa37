//! Pluggable search strategies.
//!
//! A strategy proposes one parameter set per trial index and may learn from
//! the scores it is shown. Proposals must be a deterministic function of the
//! strategy's seed, the trial index and the history it has observed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wicklab_core::rng::RngHierarchy;
use wicklab_core::ParameterSet;

use super::controller::Trial;
use super::space::SearchSpace;
use super::SearchError;

pub trait SearchStrategy: Send {
    fn name(&self) -> &str;

    /// Parameter set for trial `trial_index`. `history` holds every trial
    /// completed so far, in index order.
    fn propose(
        &mut self,
        trial_index: usize,
        history: &[Trial],
    ) -> Result<ParameterSet, SearchError>;

    /// Feedback after trial `trial_index` has been scored.
    fn observe(&mut self, _trial_index: usize, _params: &ParameterSet, _score: f64) {}
}

/// Independent uniform draws, one RNG stream per trial index.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: SearchSpace,
    base: ParameterSet,
    rng: RngHierarchy,
}

impl RandomSearch {
    pub const STREAM: &'static str = "random_search";

    pub fn new(space: SearchSpace, base: ParameterSet, seed: u64) -> Result<Self, SearchError> {
        space.validate_with(&base)?;
        Ok(Self {
            space,
            base,
            rng: RngHierarchy::new(seed),
        })
    }
}

impl SearchStrategy for RandomSearch {
    fn name(&self) -> &str {
        "random"
    }

    fn propose(&mut self, trial_index: usize, _history: &[Trial]) -> Result<ParameterSet, SearchError> {
        let mut rng = self.rng.rng_for(Self::STREAM, trial_index as u64);
        SearchSpace::apply(&self.base, self.space.sample(&mut rng))
    }
}

/// Exhaustive enumeration; wraps around when the budget exceeds the grid.
#[derive(Debug, Clone)]
pub struct GridSearch {
    space: SearchSpace,
    base: ParameterSet,
    size: usize,
}

impl GridSearch {
    pub fn new(space: SearchSpace, base: ParameterSet) -> Result<Self, SearchError> {
        space.validate_with(&base)?;
        let size = space.grid_size();
        if size == 0 {
            return Err(SearchError::EmptySpace);
        }
        Ok(Self { space, base, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl SearchStrategy for GridSearch {
    fn name(&self) -> &str {
        "grid"
    }

    fn propose(&mut self, trial_index: usize, _history: &[Trial]) -> Result<ParameterSet, SearchError> {
        SearchSpace::apply(&self.base, self.space.point(trial_index % self.size))
    }
}

/// Strategy selector for configuration files and the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Random,
    Grid,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Grid => "grid",
        }
    }

    pub fn build(
        self,
        space: SearchSpace,
        base: ParameterSet,
        seed: u64,
    ) -> Result<Box<dyn SearchStrategy>, SearchError> {
        Ok(match self {
            Self::Random => Box::new(RandomSearch::new(space, base, seed)?),
            Self::Grid => Box::new(GridSearch::new(space, base)?),
        })
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "grid" => Ok(Self::Grid),
            other => Err(SearchError::UnknownStrategy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::space::ParamDomain;
    use wicklab_core::params::TradeDirection;

    #[test]
    fn random_proposals_replay_by_index() {
        let mut a = RandomSearch::new(SearchSpace::default_space(), ParameterSet::default(), 42).unwrap();
        let mut b = RandomSearch::new(SearchSpace::default_space(), ParameterSet::default(), 42).unwrap();

        let forward: Vec<ParameterSet> = (0..10).map(|i| a.propose(i, &[]).unwrap()).collect();
        let backward: Vec<ParameterSet> = (0..10).rev().map(|i| b.propose(i, &[]).unwrap()).collect();
        assert!(forward.iter().eq(backward.iter().rev()));
        assert_ne!(forward[0], forward[1]);
    }

    #[test]
    fn random_seed_changes_proposals() {
        let mut a = RandomSearch::new(SearchSpace::default_space(), ParameterSet::default(), 1).unwrap();
        let mut b = RandomSearch::new(SearchSpace::default_space(), ParameterSet::default(), 2).unwrap();
        let pa: Vec<_> = (0..5).map(|i| a.propose(i, &[]).unwrap()).collect();
        let pb: Vec<_> = (0..5).map(|i| b.propose(i, &[]).unwrap()).collect();
        assert_ne!(pa, pb);
    }

    #[test]
    fn grid_enumerates_then_wraps() {
        let space = SearchSpace::new()
            .with("target_rr", ParamDomain::float(1.0, 2.0, 0.5))
            .with("trade_direction", ParamDomain::choices(&["auto", "both"]));
        let mut grid = GridSearch::new(space, ParameterSet::default()).unwrap();
        assert_eq!(grid.size(), 6);

        let first: Vec<ParameterSet> = (0..6).map(|i| grid.propose(i, &[]).unwrap()).collect();
        for (i, p) in first.iter().enumerate() {
            for q in &first[i + 1..] {
                assert_ne!(p, q);
            }
        }
        assert_eq!(first[0].target_rr, 1.0);
        assert_eq!(first[0].trade_direction, TradeDirection::Auto);
        assert_eq!(first[5].target_rr, 2.0);
        assert_eq!(first[5].trade_direction, TradeDirection::Both);
        assert_eq!(grid.propose(6, &[]).unwrap(), first[0]);
    }

    #[test]
    fn invalid_space_is_rejected_at_construction() {
        let space = SearchSpace::new().with("nope", ParamDomain::int(1, 2));
        assert!(RandomSearch::new(space.clone(), ParameterSet::default(), 0).is_err());
        assert!(GridSearch::new(space, ParameterSet::default()).is_err());

        let zero_ema = SearchSpace::new().with("trend_ema_length", ParamDomain::int(0, 10));
        assert!(RandomSearch::new(zero_ema.clone(), ParameterSet::default(), 0).is_err());
        assert!(GridSearch::new(zero_ema, ParameterSet::default()).is_err());
    }

    #[test]
    fn strategy_kind_parsing() {
        assert_eq!("grid".parse::<StrategyKind>().unwrap(), StrategyKind::Grid);
        assert_eq!(" Random ".parse::<StrategyKind>().unwrap(), StrategyKind::Random);
        assert!(matches!(
            "bayes".parse::<StrategyKind>(),
            Err(SearchError::UnknownStrategy(_))
        ));
        let built = StrategyKind::Grid
            .build(SearchSpace::default_space(), ParameterSet::default(), 0)
            .unwrap();
        assert_eq!(built.name(), "grid");
    }
}
