//! Command modules for calculator hosts
//!
//! ## Architecture
//!
//! - `calculator`: catalog listing, mounting and event dispatch
//! - `units`: unit lists for unit dropdowns

pub mod calculator;
pub mod units;

pub use calculator::{execute, execute_json, list_calculators, open_calculator};
pub use units::units_for;
