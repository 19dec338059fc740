use super::CalculatorDefinition;
use crate::core::format::FormatPolicy;
use crate::core::presets::PresetRegistry;
use crate::core::relation::Logarithm;
use crate::core::spec::{CalculatorSpec, ClearPolicy, FieldDef};
use crate::shared::errors::EngineResult;

/// `result = log_base(argument)`, solvable for any member
#[derive(Debug, Clone, Copy)]
pub struct LogarithmCalculator;

impl CalculatorDefinition for LogarithmCalculator {
    fn id(&self) -> &'static str {
        "logarithm"
    }

    fn title(&self) -> &'static str {
        "Logarithm"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::hybrid("base", "Base"))
            .field(FieldDef::hybrid("argument", "Number"))
            .field(FieldDef::hybrid("result", "Logarithm"))
            .relation("log", Logarithm::new("base", "argument", "result"))
            .clear_policy(ClearPolicy::Cascade)
            .default_format(FormatPolicy::ExponentialBelow { threshold: 1e-4, digits: 6 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::Calculator;
    use crate::shared::types::FieldSnapshot;

    fn display(snapshots: &[FieldSnapshot], id: &str) -> String {
        snapshots.iter().find(|s| s.id == id).unwrap().display_value.clone()
    }

    fn calculator() -> Calculator {
        Calculator::new(LogarithmCalculator.build(&PresetRegistry::shared()).unwrap()).unwrap()
    }

    #[test]
    fn test_log_base_two() {
        let mut calc = calculator();
        calc.on_edit("base", "2").unwrap();
        let snapshots = calc.on_edit("argument", "1024").unwrap();
        assert_eq!(display(&snapshots, "result"), "10");
    }

    #[test]
    fn test_non_positive_argument_is_undefined() {
        let mut calc = calculator();
        calc.on_edit("base", "10").unwrap();
        let snapshots = calc.on_edit("argument", "0").unwrap();
        assert_eq!(display(&snapshots, "result"), "Undefined");
    }

    #[test]
    fn test_base_one_is_blank() {
        let mut calc = calculator();
        calc.on_edit("base", "1").unwrap();
        let snapshots = calc.on_edit("argument", "5").unwrap();
        assert_eq!(display(&snapshots, "result"), "");
    }

    #[test]
    fn test_tiny_argument_goes_exponential() {
        let mut calc = calculator();
        calc.on_edit("base", "10").unwrap();
        let snapshots = calc.on_edit("result", "-6").unwrap();
        assert_eq!(display(&snapshots, "argument"), "1.000000e-6");
    }
}
