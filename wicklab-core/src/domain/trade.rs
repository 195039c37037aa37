//! Trade: a closed position, plus the direction and exit-reason enums.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a position or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }

    /// +1 for long, -1 for short. Multiplies a favorable price move.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Stop,
    Target,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete round-trip trade: entry → exit.
///
/// `signal_bar`, `entry_bar` and `exit_bar` are indices into the evaluated
/// bar sequence, kept for traceability and for the overlap invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,

    // ── Traceability ──
    pub signal_bar: usize,
    pub entry_bar: usize,
    pub exit_bar: usize,

    // ── Entry / exit ──
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Levels ──
    pub stop: f64,
    pub target: f64,
    pub risk: f64,

    // ── PnL ──
    pub pnl_points: f64,
    pub pnl_ticks: f64,
    pub pnl_dollars: f64,
    pub r_multiple: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl_dollars > 0.0
    }
}

/// Realized R-multiple: PnL in price units over the risk taken, 0 when risk ≤ 0.
pub fn r_multiple(pnl_points: f64, risk: f64) -> f64 {
    if risk > 0.0 {
        pnl_points / risk
    } else {
        0.0
    }
}
