//! Trade simulator: a two-state machine (Flat / InPosition) over the bar sequence.
//!
//! The scan visits each adjacent pair `(i, i + 1)` once, in order:
//! 1. InPosition: test bar `i + 1` against the stop, then the target.
//!    Stop is checked first, so a bar spanning both levels exits at the stop.
//! 2. Flat (including just after an exit in step 1): if bar `i` carries an
//!    actionable setup, open at bar `i + 1`'s open.
//!
//! A position opened from bar `i` is first tested against bar `i + 2`; the
//! fill bar's own range never triggers an exit.
//!
//! Because step 2 runs after step 1 on the same pair, a setup on bar `i`
//! re-fills at bar `i + 1`'s open when the previous position exits on bar
//! `i + 1`. The new entry then shares its bar and timestamp with the previous
//! exit: `entry_bar >= previous exit_bar`. At most one position is open at
//! any point in the scan, and holding periods touch but never interleave. A position still open when
//! the bars run out is returned as `unrealized` and produces no trade.

use serde::{Deserialize, Serialize};

use crate::domain::{r_multiple, Bar, Direction, ExitReason, Position, Trade};
use crate::params::ParameterSet;
use crate::risk::{RiskLevel, Setup};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SimState {
    #[default]
    Flat,
    InPosition(Position),
}

impl SimState {
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            Self::Flat => None,
            Self::InPosition(p) => Some(p),
        }
    }
}

/// Output of one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    /// Position still open at the last bar. Discarded, not realized.
    pub unrealized: Option<Position>,
}

/// Test an open position against the next bar. Stop before target.
pub fn check_exit(position: &Position, next: &Bar) -> Option<(ExitReason, f64)> {
    let (stop_hit, target_hit) = match position.direction {
        Direction::Long => (next.low <= position.stop, next.high >= position.target),
        Direction::Short => (next.high >= position.stop, next.low <= position.target),
    };
    if stop_hit {
        Some((ExitReason::Stop, position.stop))
    } else if target_hit {
        Some((ExitReason::Target, position.target))
    } else {
        None
    }
}

/// Open at the fill bar's open, inheriting direction and risk from the
/// signal bar and re-anchoring stop and target on the actual fill.
pub fn open_position(
    signal_bar: usize,
    level: &RiskLevel,
    fill_index: usize,
    fill_bar: &Bar,
    params: &ParameterSet,
) -> Position {
    let sign = level.direction.sign();
    let entry_price = fill_bar.open;
    Position {
        direction: level.direction,
        signal_bar,
        entry_bar: fill_index,
        entry_time: fill_bar.timestamp,
        entry_price,
        stop: entry_price - sign * level.risk,
        target: entry_price + sign * level.risk * params.target_rr,
        risk: level.risk,
    }
}

/// Realize a position into a trade.
pub fn close_position(
    position: Position,
    exit_index: usize,
    exit_bar: &Bar,
    reason: ExitReason,
    exit_price: f64,
    params: &ParameterSet,
) -> Trade {
    let pnl_points = position.pnl_points_at(exit_price);
    let pnl_ticks = pnl_points / params.tick_size;
    Trade {
        direction: position.direction,
        signal_bar: position.signal_bar,
        entry_bar: position.entry_bar,
        exit_bar: exit_index,
        entry_time: position.entry_time,
        entry_price: position.entry_price,
        exit_time: exit_bar.timestamp,
        exit_price,
        exit_reason: reason,
        stop: position.stop,
        target: position.target,
        risk: position.risk,
        pnl_points,
        pnl_ticks,
        pnl_dollars: pnl_ticks * params.tick_value,
        r_multiple: r_multiple(pnl_points, position.risk),
    }
}

/// Sequential simulator. Never parallelized internally.
#[derive(Debug, Clone)]
pub struct TradeSimulator<'a> {
    params: &'a ParameterSet,
    state: SimState,
    trades: Vec<Trade>,
}

impl<'a> TradeSimulator<'a> {
    pub fn new(params: &'a ParameterSet) -> Self {
        Self {
            params,
            state: SimState::Flat,
            trades: Vec::new(),
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// InPosition → Flat when the next bar hits stop or target.
    ///
    /// Returns the realized trade, if any. No-op while flat.
    pub fn on_exit_check(&mut self, next_index: usize, next: &Bar) -> Option<&Trade> {
        let SimState::InPosition(position) = &self.state else {
            return None;
        };
        let (reason, price) = check_exit(position, next)?;
        let SimState::InPosition(position) = std::mem::take(&mut self.state) else {
            return None;
        };
        let trade = close_position(position, next_index, next, reason, price, self.params);
        self.trades.push(trade);
        self.trades.last()
    }

    /// Flat → InPosition when bar `signal_index` has an actionable setup.
    ///
    /// Ignored while in a position: no pyramiding.
    pub fn on_setup(
        &mut self,
        signal_index: usize,
        setup: &Setup,
        fill_index: usize,
        fill_bar: &Bar,
    ) -> Option<&Position> {
        if !self.state.is_flat() {
            return None;
        }
        let level = setup.actionable()?;
        let position = open_position(signal_index, level, fill_index, fill_bar, self.params);
        self.state = SimState::InPosition(position);
        self.state.position()
    }

    /// Advance across the pair `(i, i + 1)`: exit check, then entry check.
    pub fn step(&mut self, i: usize, setup: &Setup, next: &Bar) {
        self.on_exit_check(i + 1, next);
        self.on_setup(i, setup, i + 1, next);
    }

    pub fn finish(self) -> SimulationResult {
        SimulationResult {
            trades: self.trades,
            unrealized: match self.state {
                SimState::Flat => None,
                SimState::InPosition(p) => Some(p),
            },
        }
    }
}

/// Run the simulator over a full annotated bar sequence.
pub fn simulate(bars: &[Bar], setups: &[Setup], params: &ParameterSet) -> SimulationResult {
    debug_assert_eq!(bars.len(), setups.len());
    let mut sim = TradeSimulator::new(params);
    for (i, pair) in bars.windows(2).enumerate() {
        sim.step(i, &setups[i], &pair[1]);
    }
    sim.finish()
}
