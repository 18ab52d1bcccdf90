//! Matching and position accounting.

pub mod engine;
pub mod position_calc;

pub use engine::{MakerFill, MatchResult, MatchingEngine};
pub use position_calc::PositionCalculator;
