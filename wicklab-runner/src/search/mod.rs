//! Parameter search: spaces, strategies and the batch controller.

pub mod controller;
pub mod space;
pub mod strategy;

pub use controller::{run_search, SearchOutcome, SearchProgress, SearchSettings, Trial};
pub use space::{ParamDomain, SearchSpace};
pub use strategy::{GridSearch, RandomSearch, SearchStrategy, StrategyKind};

use thiserror::Error;
use wicklab_core::ParamError;

/// Errors from building or running a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unknown parameter in search space: {0}")]
    UnknownParameter(String),
    #[error("invalid domain for {name}: {reason}")]
    InvalidDomain { name: String, reason: String },
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error("search space has no grid points")]
    EmptySpace,
    #[error("unknown search strategy: {0} (expected random or grid)")]
    UnknownStrategy(String),
    #[error("trial budget must be at least 1")]
    ZeroTrials,
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}
