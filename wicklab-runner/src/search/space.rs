//! Search space: a typed domain per tunable parameter.
//!
//! Dimensions keep declaration order. Grid enumeration is mixed-radix over
//! that order with the first dimension varying fastest.

use rand::Rng;
use serde::{Deserialize, Serialize};

use wicklab_core::params::{EntryMethod, StopMethod, TargetMethod};
use wicklab_core::{ParamValue, ParameterSet};

use super::SearchError;

/// Domain of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamDomain {
    /// Inclusive integer range.
    IntRange { min: i64, max: i64 },
    /// `min, min + step, ...` up to and including `max` when it lands on the grid.
    FloatRange { min: f64, max: f64, step: f64 },
    Categorical { choices: Vec<String> },
    /// Pinned to one value.
    Fixed { value: ParamValue },
}

/// Values per dimension checked by [`SearchSpace::validate_with`], plus the last.
const CHECKED_VALUES: usize = 64;

/// Float grid points are rounded to this many decimals, so `0.15 + 7 * 0.05`
/// reports as `0.5`.
const FLOAT_DECIMALS: i32 = 10;

fn round_grid(v: f64) -> f64 {
    let scale = 10f64.powi(FLOAT_DECIMALS);
    (v * scale).round() / scale
}

impl ParamDomain {
    pub fn int(min: i64, max: i64) -> Self {
        Self::IntRange { min, max }
    }

    pub fn float(min: f64, max: f64, step: f64) -> Self {
        Self::FloatRange { min, max, step }
    }

    pub fn choices<T: ToString>(choices: &[T]) -> Self {
        Self::Categorical {
            choices: choices.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn fixed(value: ParamValue) -> Self {
        Self::Fixed { value }
    }

    /// Number of distinct values.
    pub fn cardinality(&self) -> usize {
        match self {
            Self::IntRange { min, max } => usize::try_from(max - min + 1).unwrap_or(0),
            Self::FloatRange { min, max, step } if max >= min && *step > 0.0 => {
                (((max - min) / step + 1e-9).floor() as usize).saturating_add(1)
            }
            Self::FloatRange { .. } => 0,
            Self::Categorical { choices } => choices.len(),
            Self::Fixed { .. } => 1,
        }
    }

    /// The `index`-th value, `index < cardinality()`.
    pub fn value_at(&self, index: usize) -> ParamValue {
        match self {
            Self::IntRange { min, .. } => ParamValue::Int(min + index as i64),
            Self::FloatRange { min, step, .. } => {
                ParamValue::Float(round_grid(min + index as f64 * step))
            }
            Self::Categorical { choices } => ParamValue::Choice(choices[index].clone()),
            Self::Fixed { value } => value.clone(),
        }
    }

    /// Uniform draw over the domain's values.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParamValue {
        let n = self.cardinality();
        let index = if n <= 1 { 0 } else { rng.gen_range(0..n) };
        self.value_at(index)
    }

    fn check(&self, name: &str) -> Result<(), SearchError> {
        let invalid = |reason: String| SearchError::InvalidDomain {
            name: name.to_string(),
            reason,
        };
        match self {
            Self::IntRange { min, max } if max < min => {
                Err(invalid(format!("max {max} < min {min}")))
            }
            Self::FloatRange { min, max, step } => {
                if !(min.is_finite() && max.is_finite()) || max < min {
                    Err(invalid(format!("bad bounds [{min}, {max}]")))
                } else if !(*step > 0.0 && step.is_finite()) {
                    Err(invalid(format!("step {step} is not positive")))
                } else {
                    Ok(())
                }
            }
            Self::Categorical { choices } if choices.is_empty() => {
                Err(invalid("no choices".into()))
            }
            _ => Ok(()),
        }
    }
}

/// Ordered set of (parameter name, domain) dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    dims: Vec<(String, ParamDomain)>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self { dims: Vec::new() }
    }

    /// Add a dimension, replacing any existing one with the same name.
    pub fn with(mut self, name: &str, domain: ParamDomain) -> Self {
        self.set(name, domain);
        self
    }

    pub fn set(&mut self, name: &str, domain: ParamDomain) {
        match self.dims.iter_mut().find(|(n, _)| n == name) {
            Some((_, d)) => *d = domain,
            None => self.dims.push((name.to_string(), domain)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamDomain> {
        let pos = self.dims.iter().position(|(n, _)| n == name)?;
        Some(self.dims.remove(pos).1)
    }

    pub fn get(&self, name: &str) -> Option<&ParamDomain> {
        self.dims.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn dims(&self) -> &[(String, ParamDomain)] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// The displacement-wick objective's space. Tick size and value are not
    /// searched; the max-risk filter is always on.
    pub fn default_space() -> Self {
        Self::new()
            .with("displacement_length", ParamDomain::int(50, 200))
            .with("min_displacement_strength", ParamDomain::int(1, 3))
            .with("max_displacement_strength", ParamDomain::int(2, 4))
            .with("min_wick_pct", ParamDomain::float(10.0, 30.0, 5.0))
            .with("min_wick_body_ratio", ParamDomain::float(0.15, 0.50, 0.05))
            .with("trend_ema_length", ParamDomain::int(20, 100))
            .with("entry_method", ParamDomain::choices(EntryMethod::ALL))
            .with("target_method", ParamDomain::choices(TargetMethod::ALL))
            .with("stop_method", ParamDomain::choices(StopMethod::ALL))
            .with("atr_stop_mult", ParamDomain::float(1.0, 3.0, 0.25))
            .with("wick_extreme_mult", ParamDomain::float(0.5, 2.0, 0.25))
            .with("fixed_stop_ticks", ParamDomain::int(8, 40))
            .with("target_rr", ParamDomain::float(1.0, 3.0, 0.25))
            .with("use_max_risk_filter", ParamDomain::fixed(ParamValue::Bool(true)))
            .with("max_risk_ticks", ParamDomain::int(30, 100))
            .with("trade_direction", ParamDomain::choices(&["auto", "both"]))
            .with("zone_extend_bars", ParamDomain::int(20, 100))
    }

    /// Check every dimension names a real parameter, has a well-formed
    /// domain, and yields values the parameter accepts, against the default
    /// Parameter Set.
    pub fn validate(&self) -> Result<(), SearchError> {
        self.validate_with(&ParameterSet::default())
    }

    /// As [`validate`](Self::validate), but each checked value is written into
    /// `base` and the result must pass [`ParameterSet::validated`], so a
    /// domain that would fail at proposal time is rejected up front.
    ///
    /// Parameter checks are per field, so trying one dimension at a time
    /// covers every combination. The first values and the last one are
    /// checked, since range limits sit at the ends.
    pub fn validate_with(&self, base: &ParameterSet) -> Result<(), SearchError> {
        for (name, domain) in &self.dims {
            if !ParameterSet::NAMES.contains(&name.as_str()) {
                return Err(SearchError::UnknownParameter(name.clone()));
            }
            domain.check(name)?;
            let n = domain.cardinality();
            let checked = (0..n.min(CHECKED_VALUES)).chain(n.checked_sub(1));
            for index in checked {
                let mut trial = base.clone();
                trial.set(name, domain.value_at(index))?;
                trial.validated()?;
            }
        }
        Ok(())
    }

    /// Number of grid points, saturating at `usize::MAX`.
    pub fn grid_size(&self) -> usize {
        self.dims
            .iter()
            .fold(1usize, |acc, (_, d)| acc.saturating_mul(d.cardinality()))
    }

    /// Grid point `index` in mixed-radix order.
    pub fn point(&self, index: usize) -> Vec<(&str, ParamValue)> {
        let mut rest = index;
        self.dims
            .iter()
            .map(|(name, domain)| {
                let n = domain.cardinality().max(1);
                let digit = rest % n;
                rest /= n;
                (name.as_str(), domain.value_at(digit))
            })
            .collect()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<(&str, ParamValue)> {
        self.dims
            .iter()
            .map(|(name, domain)| (name.as_str(), domain.sample(rng)))
            .collect()
    }

    /// Write `values` into a copy of `base` and validate the result.
    pub fn apply(
        base: &ParameterSet,
        values: Vec<(&str, ParamValue)>,
    ) -> Result<ParameterSet, SearchError> {
        let mut params = base.clone();
        for (name, value) in values {
            params.set(name, value)?;
        }
        Ok(params.validated()?)
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::default_space()
    }
}
