use super::CalculatorDefinition;
use crate::core::format::FormatPolicy;
use crate::core::presets::{PresetRegistry, SCALED_SCORE};
use crate::core::relation::{Computed, Formula, Lookup};
use crate::core::spec::{CalculatorSpec, ClearPolicy, FieldDef};
use crate::shared::errors::EngineResult;

const MAX_RAW_SCORE: f64 = 58.0;

fn percent_correct(v: &[f64]) -> Computed {
    Computed::from_f64(100.0 * v[0] / MAX_RAW_SCORE)
}

/// Raw section score to its scaled band
#[derive(Debug, Clone, Copy)]
pub struct ScaledScoreCalculator;

impl CalculatorDefinition for ScaledScoreCalculator {
    fn id(&self) -> &'static str {
        "scaled-score"
    }

    fn title(&self) -> &'static str {
        "SAT Math Score"
    }

    fn build(&self, presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::input("raw", "Correct Answers"))
            .field(FieldDef::derived("scaled", "Scaled Score").with_format(FormatPolicy::CompositeRounded))
            .field(FieldDef::derived("percent", "Percent Correct").with_format(FormatPolicy::Fixed(1)))
            .relation("scaled", Lookup::new("raw", "scaled", presets.threshold(SCALED_SCORE)?))
            .relation("percent", Formula::new("percent", &["raw"], percent_correct))
            .clear_policy(ClearPolicy::Cascade))
    }
}
