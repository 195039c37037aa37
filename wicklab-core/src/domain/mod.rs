//! Domain types for wicklab

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use position::Position;
pub use trade::{r_multiple, Direction, ExitReason, Trade};
