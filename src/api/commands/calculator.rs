//! Calculator command module
//!
//! Mounts catalog calculators and forwards host commands to them.

use crate::core::calculators::{BuiltinCalculator, CalculatorDefinition};
use crate::core::conversion::ConversionRegistry;
use crate::core::presets::PresetRegistry;
use crate::core::session::Calculator;
use crate::shared::errors::EngineResult;
use crate::shared::settings::EngineSettings;
use crate::shared::types::{CalculatorInfo, EngineCommand, FieldSnapshot};
use std::sync::Arc;
use tracing::{debug, warn};

/// Every built-in calculator with its modes
pub fn list_calculators() -> EngineResult<Vec<CalculatorInfo>> {
    let presets = PresetRegistry::shared();
    BuiltinCalculator::all()
        .iter()
        .map(|calculator| calculator.info(&presets))
        .collect()
}

/// Mounts a built-in calculator with default settings
pub fn open_calculator(id: &str) -> EngineResult<Calculator> {
    open_calculator_with(id, Arc::new(EngineSettings::default()))
}

pub fn open_calculator_with(id: &str, settings: Arc<EngineSettings>) -> EngineResult<Calculator> {
    let presets = PresetRegistry::shared();
    let spec = BuiltinCalculator::find(id)?.build(&presets)?;
    debug!(calculator = id, "opening calculator");
    Calculator::with_registries(spec, ConversionRegistry::shared(), presets, settings)
}

/// Applies one host command and returns the fresh snapshots
pub fn execute(calculator: &mut Calculator, command: EngineCommand) -> EngineResult<Vec<FieldSnapshot>> {
    let result = match &command {
        EngineCommand::Edit { field_id, raw_text } => calculator.on_edit(field_id, raw_text),
        EngineCommand::ModeChange { mode } => calculator.on_mode_change(mode),
        EngineCommand::UnitChange { field_id, unit } => calculator.on_unit_change(field_id, unit),
        EngineCommand::Select { selector_id, key } => calculator.on_select(selector_id, key),
        EngineCommand::Reset => Ok(calculator.reset()),
    };

    if let Err(e) = &result {
        warn!(calculator = %calculator.spec().id, ?command, error = %e, "command rejected");
    }
    result
}

/// Parses a JSON command (`{"type": "edit", "payload": {...}}`) and applies it
pub fn execute_json(calculator: &mut Calculator, command: &str) -> EngineResult<Vec<FieldSnapshot>> {
    let command: EngineCommand = serde_json::from_str(command)?;
    execute(calculator, command)
}
