use super::CalculatorDefinition;
use crate::core::format::FormatPolicy;
use crate::core::presets::PresetRegistry;
use crate::core::relation::{Computed, Formula};
use crate::core::spec::{CalculatorSpec, ClearPolicy, FieldDef};
use crate::shared::errors::EngineResult;

const COUNTS: [&str; 4] = ["true_positive", "false_positive", "false_negative", "true_negative"];

// Inputs in COUNTS order: tp, fp, fn, tn. Metrics are percentages.

fn accuracy(v: &[f64]) -> Computed {
    Computed::ratio(100.0 * (v[0] + v[3]), v.iter().sum())
}

fn sensitivity(v: &[f64]) -> Computed {
    Computed::ratio(100.0 * v[0], v[0] + v[2])
}

fn specificity(v: &[f64]) -> Computed {
    Computed::ratio(100.0 * v[3], v[3] + v[1])
}

fn precision(v: &[f64]) -> Computed {
    Computed::ratio(100.0 * v[0], v[0] + v[1])
}

fn f1_score(v: &[f64]) -> Computed {
    Computed::ratio(100.0 * 2.0 * v[0], 2.0 * v[0] + v[1] + v[2])
}

/// Diagnostic metrics, each computed on its own from one confusion matrix
#[derive(Debug, Clone, Copy)]
pub struct ConfusionMatrixCalculator;

impl CalculatorDefinition for ConfusionMatrixCalculator {
    fn id(&self) -> &'static str {
        "confusion-matrix"
    }

    fn title(&self) -> &'static str {
        "Sensitivity and Specificity"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        let metrics: [(&str, &str, fn(&[f64]) -> Computed); 5] = [
            ("accuracy", "Accuracy (%)", accuracy),
            ("sensitivity", "Sensitivity (%)", sensitivity),
            ("specificity", "Specificity (%)", specificity),
            ("precision", "Precision (%)", precision),
            ("f1", "F1 Score (%)", f1_score),
        ];

        let mut spec = CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::input("true_positive", "True Positives"))
            .field(FieldDef::input("false_positive", "False Positives"))
            .field(FieldDef::input("false_negative", "False Negatives"))
            .field(FieldDef::input("true_negative", "True Negatives"));
        for (id, label, eval) in metrics {
            spec = spec
                .field(FieldDef::derived(id, label))
                .relation(id, Formula::new(id, &COUNTS, eval));
        }

        Ok(spec
            .clear_policy(ClearPolicy::Cascade)
            .default_format(FormatPolicy::Fixed(2)))
    }
}
