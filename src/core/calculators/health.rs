use super::CalculatorDefinition;
use crate::core::format::FormatPolicy;
use crate::core::presets::{PresetRegistry, LIFE_EXPECTANCY};
use crate::core::relation::{Computed, Formula, Sum};
use crate::core::spec::{CalculatorSpec, ClearPolicy, FieldDef};
use crate::shared::errors::EngineResult;

fn share_lived(v: &[f64]) -> Computed {
    Computed::ratio(100.0 * v[0], v[1])
}

/// Years left from a country's life expectancy and the current age
#[derive(Debug, Clone, Copy)]
pub struct LifeExpectancyCalculator;

impl CalculatorDefinition for LifeExpectancyCalculator {
    fn id(&self) -> &'static str {
        "life-expectancy"
    }

    fn title(&self) -> &'static str {
        "Life Expectancy"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::hybrid("expectancy", "Life Expectancy (years)"))
            .field(FieldDef::hybrid("age", "Current Age"))
            .field(FieldDef::hybrid("remaining", "Years Remaining"))
            .field(FieldDef::derived("lived", "Life Lived (%)").with_format(FormatPolicy::Fixed(1)))
            .relation("remaining", Sum::new("expectancy", "age", "remaining"))
            .relation("lived", Formula::new("lived", &["age", "expectancy"], share_lived))
            .selector("country", LIFE_EXPECTANCY, "expectancy")
            .clear_policy(ClearPolicy::Cascade)
            .default_format(FormatPolicy::TrimTrailingZeros(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::Calculator;
    use crate::shared::types::{FieldRole, FieldSnapshot};

    fn display(snapshots: &[FieldSnapshot], id: &str) -> String {
        snapshots.iter().find(|s| s.id == id).unwrap().display_value.clone()
    }

    fn calculator() -> Calculator {
        Calculator::new(LifeExpectancyCalculator.build(&PresetRegistry::shared()).unwrap()).unwrap()
    }

    #[test]
    fn test_country_then_age() {
        let mut calc = calculator();
        calc.on_select("country", "Japan").unwrap();
        let snapshots = calc.on_edit("age", "30").unwrap();

        assert_eq!(display(&snapshots, "expectancy"), "84.3");
        assert_eq!(display(&snapshots, "remaining"), "54.3");
        assert_eq!(display(&snapshots, "lived"), "35.6");
        let expectancy = snapshots.iter().find(|s| s.id == "expectancy").unwrap();
        assert_eq!(expectancy.role, FieldRole::Input);
    }

    #[test]
    fn test_new_country_keeps_age() {
        let mut calc = calculator();
        calc.on_edit("age", "40").unwrap();
        calc.on_select("country", "Japan").unwrap();
        let snapshots = calc.on_select("country", "Nigeria").unwrap();

        assert_eq!(display(&snapshots, "age"), "40");
        assert_eq!(display(&snapshots, "remaining"), "22.6");
        assert_eq!(calc.selection("country"), Some("Nigeria"));
    }

    #[test]
    fn test_unknown_country() {
        let mut calc = calculator();
        assert!(calc.on_select("country", "Atlantis").is_err());
        assert_eq!(calc.selection("country"), None);
    }
}
