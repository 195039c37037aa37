//! WickLab Core: bars, parameter set, indicators, signals, risk levels and
//! the trade simulator.
//!
//! One evaluation flows strictly through
//! - the Indicator Calculator (`indicators`)
//! - the Signal Generator (`signal`)
//! - the Risk-Level Calculator (`risk`)
//! - the Trade Simulator (`simulator`)
//!
//! and `pipeline::evaluate` runs all four for one parameter set. Every stage
//! is a pure function of the bars and the parameters; bar loading lives in
//! `data` and is never called from the pipeline.

pub mod data;
pub mod domain;
pub mod indicators;
pub mod params;
pub mod pipeline;
pub mod risk;
pub mod rng;
pub mod signal;
pub mod simulator;

pub use domain::{Bar, Direction, ExitReason, Position, Trade};
pub use params::{ParamError, ParamValue, ParameterSet};
pub use pipeline::{evaluate, evaluate_trades, Evaluation};
