//! Parameter Set: the complete, typed configuration of one strategy evaluation.
//!
//! Replaces a loose string-keyed dictionary with a fixed record. Search
//! spaces still address fields by name through [`ParameterSet::set`], which
//! checks the value kind and categorical spelling before assignment.
//!
//! Policy: `max_displacement_strength < min_displacement_strength` is
//! corrected by raising the max to the min, never rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lowest and highest displacement strength the indicator can emit.
pub const MIN_STRENGTH: u8 = 1;
pub const MAX_STRENGTH: u8 = 4;

/// ATR period used for the `atr` stop method. Not a tunable parameter.
pub const ATR_PERIOD: usize = 14;

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("parameter '{name}' expects {expected}, got {got}")]
    WrongKind {
        name: String,
        expected: &'static str,
        got: String,
    },

    #[error("invalid option '{value}' for '{name}' (valid: {valid})")]
    InvalidOption {
        name: String,
        value: String,
        valid: &'static str,
    },

    #[error("parameter '{name}' out of range: {reason}")]
    OutOfRange { name: String, reason: String },
}

// ─── Categorical options ─────────────────────────────────────────────

macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident, $param:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            const VALID: &'static str = concat!($($text, " "),+);

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParamError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParamError::InvalidOption {
                        name: $param.to_string(),
                        value: other.to_string(),
                        valid: Self::VALID.trim_end(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

categorical!(
    /// How a setup is entered. Both methods fill at the next bar's open.
    EntryMethod, "entry_method" {
        ZoneTouch => "zone_touch",
        WickSweep => "wick_sweep",
    }
);

categorical!(
    /// Where the signal-bar target is placed.
    TargetMethod, "target_method" {
        FixedRr => "fixed_rr",
        WickFill => "wick_fill",
        BodyFill => "body_fill",
        EntireCandle => "entire_candle",
    }
);

categorical!(
    /// How the protective stop distance is derived.
    StopMethod, "stop_method" {
        WickExtreme => "wick_extreme",
        Atr => "atr",
        FixedTicks => "fixed_ticks",
    }
);

categorical!(
    /// Which sides may trade, and whether the trend filter applies.
    TradeDirection, "trade_direction" {
        Auto => "auto",
        LongOnly => "long_only",
        ShortOnly => "short_only",
        Both => "both",
    }
);

// ─── Named values ────────────────────────────────────────────────────

/// A dynamically-typed value addressed to a named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Choice(String),
}

impl ParamValue {
    fn kind(&self) -> String {
        match self {
            Self::Bool(b) => format!("bool {b}"),
            Self::Int(i) => format!("int {i}"),
            Self::Float(f) => format!("float {f}"),
            Self::Choice(s) => format!("option '{s}'"),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Choice(s) => f.write_str(s),
        }
    }
}

// ─── Parameter Set ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    // ── Displacement ──
    pub displacement_length: usize,
    pub min_displacement_strength: u8,
    pub max_displacement_strength: u8,

    // ── Wick ──
    pub min_wick_pct: f64,
    pub min_wick_body_ratio: f64,

    // ── Trend ──
    pub trend_ema_length: usize,

    // ── Risk management ──
    pub entry_method: EntryMethod,
    pub target_method: TargetMethod,
    pub stop_method: StopMethod,
    pub atr_stop_mult: f64,
    pub wick_extreme_mult: f64,
    pub fixed_stop_ticks: u32,
    pub target_rr: f64,

    // ── Filters ──
    pub use_max_risk_filter: bool,
    pub max_risk_ticks: u32,
    pub trade_direction: TradeDirection,

    // ── Zone ──
    pub zone_extend_bars: usize,

    // ── Instrument ──
    pub tick_size: f64,
    pub tick_value: f64,
}

impl Default for ParameterSet {
    /// MNQ defaults.
    fn default() -> Self {
        Self {
            displacement_length: 100,
            min_displacement_strength: 1,
            max_displacement_strength: 4,
            min_wick_pct: 15.0,
            min_wick_body_ratio: 0.25,
            trend_ema_length: 50,
            entry_method: EntryMethod::ZoneTouch,
            target_method: TargetMethod::FixedRr,
            stop_method: StopMethod::Atr,
            atr_stop_mult: 1.5,
            wick_extreme_mult: 1.0,
            fixed_stop_ticks: 10,
            target_rr: 2.0,
            use_max_risk_filter: true,
            max_risk_ticks: 60,
            trade_direction: TradeDirection::Auto,
            zone_extend_bars: 50,
            tick_size: 0.25,
            tick_value: 0.50,
        }
    }
}

impl ParameterSet {
    /// Every addressable parameter name, in report order.
    pub const NAMES: &'static [&'static str] = &[
        "displacement_length",
        "min_displacement_strength",
        "max_displacement_strength",
        "min_wick_pct",
        "min_wick_body_ratio",
        "trend_ema_length",
        "entry_method",
        "target_method",
        "stop_method",
        "atr_stop_mult",
        "wick_extreme_mult",
        "fixed_stop_ticks",
        "target_rr",
        "use_max_risk_filter",
        "max_risk_ticks",
        "trade_direction",
        "zone_extend_bars",
        "tick_size",
        "tick_value",
    ];

    /// Validate and normalize.
    ///
    /// Strengths are clamped into `1..=4`, then a max below the min is raised
    /// to the min. Window lengths too short for their statistic and a
    /// non-positive tick size are rejected.
    pub fn validated(mut self) -> Result<Self, ParamError> {
        self.min_displacement_strength = self
            .min_displacement_strength
            .clamp(MIN_STRENGTH, MAX_STRENGTH);
        self.max_displacement_strength = self
            .max_displacement_strength
            .clamp(MIN_STRENGTH, MAX_STRENGTH);
        if self.max_displacement_strength < self.min_displacement_strength {
            self.max_displacement_strength = self.min_displacement_strength;
        }

        if self.displacement_length < 2 {
            return Err(ParamError::OutOfRange {
                name: "displacement_length".into(),
                reason: format!("{} < 2 (standard deviation needs two bars)", self.displacement_length),
            });
        }
        if self.trend_ema_length == 0 {
            return Err(ParamError::OutOfRange {
                name: "trend_ema_length".into(),
                reason: "must be >= 1".into(),
            });
        }
        if !(self.tick_size > 0.0 && self.tick_size.is_finite()) {
            return Err(ParamError::OutOfRange {
                name: "tick_size".into(),
                reason: format!("{} is not a positive number", self.tick_size),
            });
        }
        Ok(self)
    }

    /// Maximum tolerated risk in price units.
    pub fn max_risk(&self) -> f64 {
        self.max_risk_ticks as f64 * self.tick_size
    }

    /// Assign a named parameter from a dynamically-typed value.
    ///
    /// Integer values are accepted for float parameters; nothing else is
    /// coerced.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        match name {
            "displacement_length" => self.displacement_length = as_count(name, &value)?,
            "min_displacement_strength" => {
                self.min_displacement_strength = as_strength(name, &value)?
            }
            "max_displacement_strength" => {
                self.max_displacement_strength = as_strength(name, &value)?
            }
            "min_wick_pct" => self.min_wick_pct = as_float(name, &value)?,
            "min_wick_body_ratio" => self.min_wick_body_ratio = as_float(name, &value)?,
            "trend_ema_length" => self.trend_ema_length = as_count(name, &value)?,
            "entry_method" => self.entry_method = as_choice(name, &value)?.parse()?,
            "target_method" => self.target_method = as_choice(name, &value)?.parse()?,
            "stop_method" => self.stop_method = as_choice(name, &value)?.parse()?,
            "atr_stop_mult" => self.atr_stop_mult = as_float(name, &value)?,
            "wick_extreme_mult" => self.wick_extreme_mult = as_float(name, &value)?,
            "fixed_stop_ticks" => self.fixed_stop_ticks = as_ticks(name, &value)?,
            "target_rr" => self.target_rr = as_float(name, &value)?,
            "use_max_risk_filter" => self.use_max_risk_filter = as_bool(name, &value)?,
            "max_risk_ticks" => self.max_risk_ticks = as_ticks(name, &value)?,
            "trade_direction" => self.trade_direction = as_choice(name, &value)?.parse()?,
            "zone_extend_bars" => self.zone_extend_bars = as_count(name, &value)?,
            "tick_size" => self.tick_size = as_float(name, &value)?,
            "tick_value" => self.tick_value = as_float(name, &value)?,
            other => return Err(ParamError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }

    /// Read a named parameter back as a dynamically-typed value.
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        let value = match name {
            "displacement_length" => ParamValue::Int(self.displacement_length as i64),
            "min_displacement_strength" => ParamValue::Int(self.min_displacement_strength as i64),
            "max_displacement_strength" => ParamValue::Int(self.max_displacement_strength as i64),
            "min_wick_pct" => ParamValue::Float(self.min_wick_pct),
            "min_wick_body_ratio" => ParamValue::Float(self.min_wick_body_ratio),
            "trend_ema_length" => ParamValue::Int(self.trend_ema_length as i64),
            "entry_method" => ParamValue::Choice(self.entry_method.as_str().into()),
            "target_method" => ParamValue::Choice(self.target_method.as_str().into()),
            "stop_method" => ParamValue::Choice(self.stop_method.as_str().into()),
            "atr_stop_mult" => ParamValue::Float(self.atr_stop_mult),
            "wick_extreme_mult" => ParamValue::Float(self.wick_extreme_mult),
            "fixed_stop_ticks" => ParamValue::Int(self.fixed_stop_ticks as i64),
            "target_rr" => ParamValue::Float(self.target_rr),
            "use_max_risk_filter" => ParamValue::Bool(self.use_max_risk_filter),
            "max_risk_ticks" => ParamValue::Int(self.max_risk_ticks as i64),
            "trade_direction" => ParamValue::Choice(self.trade_direction.as_str().into()),
            "zone_extend_bars" => ParamValue::Int(self.zone_extend_bars as i64),
            "tick_size" => ParamValue::Float(self.tick_size),
            "tick_value" => ParamValue::Float(self.tick_value),
            _ => return None,
        };
        Some(value)
    }

    /// `(name, value)` pairs for every parameter, in report order.
    pub fn entries(&self) -> Vec<(&'static str, ParamValue)> {
        Self::NAMES
            .iter()
            .filter_map(|name| self.get(name).map(|v| (*name, v)))
            .collect()
    }
}

fn wrong_kind(name: &str, expected: &'static str, got: &ParamValue) -> ParamError {
    ParamError::WrongKind {
        name: name.to_string(),
        expected,
        got: got.kind(),
    }
}

fn as_int(name: &str, value: &ParamValue) -> Result<i64, ParamError> {
    match value {
        ParamValue::Int(i) => Ok(*i),
        other => Err(wrong_kind(name, "an integer", other)),
    }
}

fn as_count(name: &str, value: &ParamValue) -> Result<usize, ParamError> {
    let i = as_int(name, value)?;
    usize::try_from(i).map_err(|_| ParamError::OutOfRange {
        name: name.to_string(),
        reason: format!("{i} is negative"),
    })
}

fn as_ticks(name: &str, value: &ParamValue) -> Result<u32, ParamError> {
    let i = as_int(name, value)?;
    u32::try_from(i).map_err(|_| ParamError::OutOfRange {
        name: name.to_string(),
        reason: format!("{i} does not fit a tick count"),
    })
}

fn as_strength(name: &str, value: &ParamValue) -> Result<u8, ParamError> {
    let i = as_int(name, value)?;
    if !(MIN_STRENGTH as i64..=MAX_STRENGTH as i64).contains(&i) {
        return Err(ParamError::OutOfRange {
            name: name.to_string(),
            reason: format!("{i} not in {MIN_STRENGTH}..={MAX_STRENGTH}"),
        });
    }
    Ok(i as u8)
}

fn as_float(name: &str, value: &ParamValue) -> Result<f64, ParamError> {
    match value {
        ParamValue::Float(f) => Ok(*f),
        ParamValue::Int(i) => Ok(*i as f64),
        other => Err(wrong_kind(name, "a number", other)),
    }
}

fn as_bool(name: &str, value: &ParamValue) -> Result<bool, ParamError> {
    match value {
        ParamValue::Bool(b) => Ok(*b),
        other => Err(wrong_kind(name, "a bool", other)),
    }
}

fn as_choice<'a>(name: &str, value: &'a ParamValue) -> Result<&'a str, ParamError> {
    match value {
        ParamValue::Choice(s) => Ok(s.as_str()),
        other => Err(wrong_kind(name, "an option name", other)),
    }
}
