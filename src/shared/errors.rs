//! Strict error handling with EngineError enum
//!
//! Numeric outcomes (blank results, division by zero, domain violations) are
//! never errors: they travel as `Computed` values and render as blanks or the
//! undefined marker. The variants below are programming defects (unknown ids,
//! malformed specs or tables) that a host wired to closed enums never hits.
//! All errors are serializable for the host bridge.

use thiserror::Error;
use serde::Serialize;

/// Engine errors
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum EngineError {
    /// Field id not declared by the calculator
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Field exists but is not part of the active mode
    #[error("Field is not active in the current mode: {0}")]
    InactiveField(String),

    /// Field is computed only and cannot be edited
    #[error("Field is read-only: {0}")]
    ReadOnlyField(String),

    /// Mode id not declared by the calculator
    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    /// Preset selector id not declared by the calculator
    #[error("Unknown selector: {0}")]
    UnknownSelector(String),

    /// Unit symbol not registered for the quantity kind
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// Key missing from an exact-match preset table
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// Preset table not registered
    #[error("Unknown preset table: {0}")]
    UnknownTable(String),

    /// Calculator id not in the catalog
    #[error("Unknown calculator: {0}")]
    UnknownCalculator(String),

    /// Threshold lookup input below every band
    #[error("Input below all thresholds: {0}")]
    BelowAllThresholds(String),

    /// Conversion factor must be finite and positive
    #[error("Invalid conversion factor: {0}")]
    InvalidFactor(String),

    /// Threshold bands must be strictly descending
    #[error("Thresholds not in descending order: {0}")]
    UnsortedThresholds(String),

    /// Calculator definition is inconsistent
    #[error("Invalid calculator spec: {0}")]
    InvalidSpec(String),

    /// Settings could not be read or applied
    #[error("Settings error: {0}")]
    Settings(String),

    /// JSON payload could not be read or written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Host stream could not be read or written
    #[error("IO error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

// Helper type alias for engine results
pub type EngineResult<T> = Result<T, EngineError>;
