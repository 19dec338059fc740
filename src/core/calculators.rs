//! Built-in calculator catalog
//!
//! Uses enum_dispatch for static dispatch over the closed set of calculators.
//! Each definition only declares fields, relations and modes; the solver does
//! all the work.

use crate::core::presets::PresetRegistry;
use crate::core::spec::CalculatorSpec;
use crate::shared::errors::{EngineError, EngineResult};
use crate::shared::types::CalculatorInfo;
use enum_dispatch::enum_dispatch;

pub mod cooking;
pub mod exam;
pub mod geometry;
pub mod health;
pub mod math;
pub mod percent;
pub mod sports;
pub mod stats;

#[enum_dispatch]
pub trait CalculatorDefinition {
    /// Unique identifier, used by hosts to open the calculator
    fn id(&self) -> &'static str;

    fn title(&self) -> &'static str;

    /// Builds the spec; preset-backed calculators read their tables here
    fn build(&self, presets: &PresetRegistry) -> EngineResult<CalculatorSpec>;
}

#[enum_dispatch(CalculatorDefinition)]
#[derive(Debug, Clone, Copy)]
pub enum BuiltinCalculator {
    Area(geometry::AreaCalculator),
    Butter(cooking::ButterCalculator),
    Ingredient(cooking::IngredientCalculator),
    Slugging(sports::SluggingCalculator),
    Fielding(sports::FieldingCalculator),
    BattingAverage(sports::BattingAverageCalculator),
    PercentChange(percent::PercentChangeCalculator),
    PercentagePoints(percent::PercentagePointsCalculator),
    Logarithm(math::LogarithmCalculator),
    ConfusionMatrix(stats::ConfusionMatrixCalculator),
    LifeExpectancy(health::LifeExpectancyCalculator),
    ScaledScore(exam::ScaledScoreCalculator),
}

impl BuiltinCalculator {
    pub fn all() -> Vec<Self> {
        vec![
            BuiltinCalculator::Area(geometry::AreaCalculator),
            BuiltinCalculator::Butter(cooking::ButterCalculator),
            BuiltinCalculator::Ingredient(cooking::IngredientCalculator),
            BuiltinCalculator::Slugging(sports::SluggingCalculator),
            BuiltinCalculator::Fielding(sports::FieldingCalculator),
            BuiltinCalculator::BattingAverage(sports::BattingAverageCalculator),
            BuiltinCalculator::PercentChange(percent::PercentChangeCalculator),
            BuiltinCalculator::PercentagePoints(percent::PercentagePointsCalculator),
            BuiltinCalculator::Logarithm(math::LogarithmCalculator),
            BuiltinCalculator::ConfusionMatrix(stats::ConfusionMatrixCalculator),
            BuiltinCalculator::LifeExpectancy(health::LifeExpectancyCalculator),
            BuiltinCalculator::ScaledScore(exam::ScaledScoreCalculator),
        ]
    }

    pub fn find(id: &str) -> EngineResult<Self> {
        Self::all()
            .into_iter()
            .find(|calculator| calculator.id() == id)
            .ok_or_else(|| EngineError::UnknownCalculator(id.to_string()))
    }

    pub fn info(&self, presets: &PresetRegistry) -> EngineResult<CalculatorInfo> {
        let spec = self.build(presets)?;
        Ok(CalculatorInfo {
            id: spec.id,
            title: spec.title,
            modes: spec.modes.into_iter().map(|mode| mode.id).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversion::ConversionRegistry;
    use std::collections::HashSet;

    #[test]
    fn test_every_builtin_validates() {
        let conversions = ConversionRegistry::shared();
        let presets = PresetRegistry::shared();
        for calculator in BuiltinCalculator::all() {
            let spec = calculator.build(&presets).unwrap();
            assert_eq!(spec.id, calculator.id());
            if let Err(e) = spec.validate(&conversions, &presets) {
                panic!("{} is invalid: {}", calculator.id(), e);
            }
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<&str> = BuiltinCalculator::all().iter().map(|c| c.id()).collect();
        assert_eq!(ids.len(), BuiltinCalculator::all().len());
    }

    #[test]
    fn test_find() {
        assert_eq!(BuiltinCalculator::find("slugging").unwrap().title(), "Slugging Percentage");
        assert!(matches!(
            BuiltinCalculator::find("mortgage"),
            Err(EngineError::UnknownCalculator(_))
        ));
    }

    #[test]
    fn test_info_lists_modes() {
        let info = BuiltinCalculator::find("batting-average")
            .unwrap()
            .info(&PresetRegistry::shared())
            .unwrap();
        assert_eq!(info.modes, vec!["baseball", "cricket"]);
    }
}
