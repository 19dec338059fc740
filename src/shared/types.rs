use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Role a field plays in its calculator.
///
/// Declared on the field definition; for `Hybrid` fields the snapshot reports
/// the role the field currently plays (`Input` once the user typed into it,
/// `Derived` once the engine filled it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum FieldRole {
    Input,
    Derived,
    Hybrid,
}

/// What the host renders for one field after an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FieldSnapshot {
    pub id: String,
    pub display_value: String,
    pub unit: Option<String>,
    pub role: FieldRole,
}

// Events a host page forwards to a calculator session.
// Using adjacently tagged serialization for frontend compatibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
#[ts(export)]
pub enum EngineCommand {
    #[serde(rename_all = "camelCase")]
    Edit { field_id: String, raw_text: String },
    ModeChange { mode: String },
    #[serde(rename_all = "camelCase")]
    UnitChange { field_id: String, unit: String },
    #[serde(rename_all = "camelCase")]
    Select { selector_id: String, key: String },
    Reset,
}

// Rich Unit Data Transfer Object for frontend dropdowns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnitDTO {
    pub id: String,       // Unit symbol (e.g., "yd", "ac")
    pub label: String,    // Display name (e.g., "Yards", "Acres")
    pub category: String, // Quantity kind (e.g., "length", "area")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CalculatorInfo {
    pub id: String,
    pub title: String,
    pub modes: Vec<String>,
}
