//! Calculator engine
//!
//! Registries and formatting are leaves; `spec` and `relation` describe a
//! calculator; `solver` resolves one event; `session` owns a mounted
//! calculator; `calculators` is the built-in catalog.

pub mod calculators;
pub mod conversion;
pub mod format;
pub mod presets;
pub mod relation;
pub mod session;
pub mod solver;
pub mod spec;
