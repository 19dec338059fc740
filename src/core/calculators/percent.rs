use super::CalculatorDefinition;
use crate::core::format::FormatPolicy;
use crate::core::presets::PresetRegistry;
use crate::core::relation::{Direction, PercentChange, PercentagePoint};
use crate::core::spec::{CalculatorSpec, ClearPolicy, FieldDef, Mode};
use crate::shared::errors::EngineResult;

/// Value after a percentage increase or decrease
#[derive(Debug, Clone, Copy)]
pub struct PercentChangeCalculator;

impl CalculatorDefinition for PercentChangeCalculator {
    fn id(&self) -> &'static str {
        "percent-change"
    }

    fn title(&self) -> &'static str {
        "Percentage Increase / Decrease"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::hybrid("initial", "Initial Value"))
            .field(FieldDef::hybrid("percent", "Percentage"))
            .field(FieldDef::hybrid("final", "Final Value"))
            .mode(Mode::new("increase", "Increase").relation(
                "increase",
                PercentChange::new("initial", "percent", "final", Direction::Increase),
            ))
            .mode(Mode::new("decrease", "Decrease").relation(
                "decrease",
                PercentChange::new("initial", "percent", "final", Direction::Decrease),
            ))
            .clear_policy(ClearPolicy::Cascade)
            .default_format(FormatPolicy::ThousandsGrouped(2)))
    }
}

/// Difference of two percentages in points and in relative percent
#[derive(Debug, Clone, Copy)]
pub struct PercentagePointsCalculator;

impl CalculatorDefinition for PercentagePointsCalculator {
    fn id(&self) -> &'static str {
        "percentage-points"
    }

    fn title(&self) -> &'static str {
        "Percentage Point Difference"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::hybrid("first", "First Percentage"))
            .field(FieldDef::hybrid("second", "Second Percentage"))
            .field(FieldDef::hybrid("points", "Difference (pp)"))
            .field(FieldDef::hybrid("relative", "Difference (%)"))
            .relation("difference", PercentagePoint::new("first", "second", "points", "relative"))
            .clear_policy(ClearPolicy::Cascade)
            .default_format(FormatPolicy::TrimTrailingZeros(4)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::Calculator;
    use crate::shared::types::FieldSnapshot;

    fn mount(definition: impl CalculatorDefinition) -> Calculator {
        Calculator::new(definition.build(&PresetRegistry::shared()).unwrap()).unwrap()
    }

    fn display(snapshots: &[FieldSnapshot], id: &str) -> String {
        snapshots.iter().find(|s| s.id == id).unwrap().display_value.clone()
    }

    #[test]
    fn test_increase_then_toggle_to_decrease() {
        let mut calc = mount(PercentChangeCalculator);
        calc.on_edit("initial", "1200").unwrap();
        let snapshots = calc.on_edit("percent", "25").unwrap();
        assert_eq!(display(&snapshots, "final"), "1,500.00");

        // Re-derived the instant the mode changes
        let snapshots = calc.on_mode_change("decrease").unwrap();
        assert_eq!(display(&snapshots, "initial"), "1200");
        assert_eq!(display(&snapshots, "final"), "900.00");
    }

    #[test]
    fn test_percent_above_hundred() {
        let mut calc = mount(PercentChangeCalculator);
        calc.on_edit("initial", "40").unwrap();
        let snapshots = calc.on_edit("final", "100").unwrap();
        assert_eq!(display(&snapshots, "percent"), "150.00");
    }

    #[test]
    fn test_decrease_by_hundred_percent_leaves_initial_blank() {
        let mut calc = mount(PercentChangeCalculator);
        calc.on_mode_change("decrease").unwrap();
        calc.on_edit("percent", "100").unwrap();
        let snapshots = calc.on_edit("final", "0").unwrap();
        assert_eq!(display(&snapshots, "initial"), "");
    }

    #[test]
    fn test_percentage_points_from_two_rates() {
        let mut calc = mount(PercentagePointsCalculator);
        calc.on_edit("first", "40").unwrap();
        let snapshots = calc.on_edit("second", "50").unwrap();
        assert_eq!(display(&snapshots, "points"), "10");
        assert_eq!(display(&snapshots, "relative"), "25");
    }

    #[test]
    fn test_negative_point_difference() {
        let mut calc = mount(PercentagePointsCalculator);
        calc.on_edit("first", "12.5").unwrap();
        let snapshots = calc.on_edit("points", "-2.5").unwrap();
        assert_eq!(display(&snapshots, "second"), "10");
        assert_eq!(display(&snapshots, "relative"), "-20");
    }
}
