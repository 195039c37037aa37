use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::trade::Direction;

/// An open position held by the trade simulator.
///
/// Runtime-only: at most one exists at any simulated time, and it is
/// either closed into a `Trade` or discarded at the end of the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub signal_bar: usize,
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub stop: f64,
    pub target: f64,
    pub risk: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == super::Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == super::Direction::Short
    }

    /// Signed price-unit PnL if the position were closed at `price`.
    pub fn pnl_points_at(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price)
    }
}
