use super::CalculatorDefinition;
use crate::core::conversion::QuantityKind;
use crate::core::format::FormatPolicy;
use crate::core::presets::{PresetRegistry, INGREDIENT_DENSITY};
use crate::core::relation::{Equivalence, Product};
use crate::core::spec::{CalculatorSpec, ClearPolicy, FieldDef};
use crate::shared::errors::EngineResult;

// Densities are g/ml; volumes are solved in liters
const ML_PER_LITER: f64 = 1000.0;

/// Butter amounts across sticks, weight and kitchen volume
#[derive(Debug, Clone, Copy)]
pub struct ButterCalculator;

impl CalculatorDefinition for ButterCalculator {
    fn id(&self) -> &'static str {
        "butter"
    }

    fn title(&self) -> &'static str {
        "Butter Converter"
    }

    fn build(&self, presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        let grams_per_liter = presets.lookup_exact(INGREDIENT_DENSITY, "butter")? * ML_PER_LITER;
        let liters_per_gram = 1.0 / grams_per_liter;

        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::hybrid("sticks", "Sticks").with_unit(QuantityKind::Mass, "stick"))
            .field(FieldDef::hybrid("grams", "Grams").with_unit(QuantityKind::Mass, "g"))
            .field(FieldDef::hybrid("ounces", "Ounces").with_unit(QuantityKind::Mass, "oz"))
            .field(FieldDef::hybrid("tablespoons", "Tablespoons").with_unit(QuantityKind::Volume, "tbsp"))
            .field(FieldDef::hybrid("cups", "Cups").with_unit(QuantityKind::Volume, "cup"))
            .relation(
                "butter",
                Equivalence::weighted(&[
                    ("sticks", 1.0),
                    ("grams", 1.0),
                    ("ounces", 1.0),
                    ("tablespoons", liters_per_gram),
                    ("cups", liters_per_gram),
                ]),
            )
            .clear_policy(ClearPolicy::Full)
            .default_format(FormatPolicy::TrimTrailingZeros(4)))
    }
}

/// Mass and volume of a chosen ingredient
#[derive(Debug, Clone, Copy)]
pub struct IngredientCalculator;

impl CalculatorDefinition for IngredientCalculator {
    fn id(&self) -> &'static str {
        "ingredient"
    }

    fn title(&self) -> &'static str {
        "Ingredient Weight to Volume"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::hybrid("density", "Density (g/ml)").with_format(FormatPolicy::TrimTrailingZeros(3)))
            .field(FieldDef::hybrid("volume", "Volume").with_unit(QuantityKind::Volume, "cup"))
            .field(FieldDef::hybrid("mass", "Mass").with_unit(QuantityKind::Mass, "g"))
            .relation("mass", Product::new("mass", "density", "volume").scaled(ML_PER_LITER))
            .selector("ingredient", INGREDIENT_DENSITY, "density")
            .clear_policy(ClearPolicy::Cascade)
            .default_format(FormatPolicy::TrimTrailingZeros(2)))
    }
}
