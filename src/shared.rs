pub mod types;
pub mod settings;
pub mod errors;

#[cfg(test)]
mod types_test;

// Re-export EngineError for convenience
pub use errors::{EngineError, EngineResult};
