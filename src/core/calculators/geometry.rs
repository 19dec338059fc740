use super::CalculatorDefinition;
use crate::core::conversion::QuantityKind;
use crate::core::format::FormatPolicy;
use crate::core::presets::PresetRegistry;
use crate::core::relation::Product;
use crate::core::spec::{CalculatorSpec, ClearPolicy, FieldDef};
use crate::shared::errors::EngineResult;

/// Rectangle area; any two of width, length and area give the third
#[derive(Debug, Clone, Copy)]
pub struct AreaCalculator;

impl CalculatorDefinition for AreaCalculator {
    fn id(&self) -> &'static str {
        "area"
    }

    fn title(&self) -> &'static str {
        "Area"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::hybrid("width", "Width").with_unit(QuantityKind::Length, "ft"))
            .field(FieldDef::hybrid("length", "Length").with_unit(QuantityKind::Length, "ft"))
            .field(FieldDef::hybrid("area", "Area").with_unit(QuantityKind::Area, "ft2"))
            .relation("area", Product::new("area", "width", "length"))
            .clear_policy(ClearPolicy::Cascade)
            .default_format(FormatPolicy::TrimTrailingZeros(6)))
    }
}
