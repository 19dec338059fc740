//! Unit command module

use crate::core::conversion::{ConversionRegistry, QuantityKind};
use crate::shared::errors::EngineResult;
use crate::shared::types::UnitDTO;

/// Units of one quantity kind, smallest first
pub fn units_for(kind: QuantityKind) -> EngineResult<Vec<UnitDTO>> {
    ConversionRegistry::shared().units(kind)
}
