use super::CalculatorDefinition;
use crate::core::format::FormatPolicy;
use crate::core::presets::PresetRegistry;
use crate::core::relation::{Computed, Formula, Product};
use crate::core::spec::{CalculatorSpec, ClearPolicy, FieldDef, Mode};
use crate::shared::errors::EngineResult;

// Baseball rates render like ".620"
const RATE_FORMAT: FormatPolicy = FormatPolicy::LeadingZeroStrip(3);

fn total_bases(v: &[f64]) -> Computed {
    Computed::from_f64(v[0] + 2.0 * v[1] + 3.0 * v[2] + 4.0 * v[3])
}

fn per_at_bat(v: &[f64]) -> Computed {
    Computed::ratio(v[0], v[1])
}

fn fielding_percentage(v: &[f64]) -> Computed {
    let chances = v[0] + v[1];
    Computed::ratio(chances, chances + v[2])
}

#[derive(Debug, Clone, Copy)]
pub struct SluggingCalculator;

impl CalculatorDefinition for SluggingCalculator {
    fn id(&self) -> &'static str {
        "slugging"
    }

    fn title(&self) -> &'static str {
        "Slugging Percentage"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::input("singles", "Singles"))
            .field(FieldDef::input("doubles", "Doubles"))
            .field(FieldDef::input("triples", "Triples"))
            .field(FieldDef::input("home_runs", "Home Runs"))
            .field(FieldDef::input("at_bats", "At Bats"))
            .field(FieldDef::derived("total_bases", "Total Bases").with_format(FormatPolicy::ThousandsGrouped(0)))
            .field(FieldDef::derived("slugging", "Slugging Percentage").with_format(RATE_FORMAT))
            .relation(
                "total_bases",
                Formula::new("total_bases", &["singles", "doubles", "triples", "home_runs"], total_bases),
            )
            .relation("slugging", Formula::new("slugging", &["total_bases", "at_bats"], per_at_bat))
            .clear_policy(ClearPolicy::Cascade))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldingCalculator;

impl CalculatorDefinition for FieldingCalculator {
    fn id(&self) -> &'static str {
        "fielding"
    }

    fn title(&self) -> &'static str {
        "Fielding Percentage"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::input("putouts", "Putouts"))
            .field(FieldDef::input("assists", "Assists"))
            .field(FieldDef::input("errors", "Errors"))
            .field(FieldDef::derived("fielding", "Fielding Percentage").with_format(RATE_FORMAT))
            .relation(
                "fielding",
                Formula::new("fielding", &["putouts", "assists", "errors"], fielding_percentage),
            )
            .clear_policy(ClearPolicy::Cascade))
    }
}

/// Baseball (hits per at bat) or cricket (runs per dismissal)
#[derive(Debug, Clone, Copy)]
pub struct BattingAverageCalculator;

impl CalculatorDefinition for BattingAverageCalculator {
    fn id(&self) -> &'static str {
        "batting-average"
    }

    fn title(&self) -> &'static str {
        "Batting Average"
    }

    fn build(&self, _presets: &PresetRegistry) -> EngineResult<CalculatorSpec> {
        Ok(CalculatorSpec::new(self.id(), self.title())
            .field(FieldDef::hybrid("hits", "Hits"))
            .field(FieldDef::hybrid("at_bats", "At Bats"))
            .field(FieldDef::hybrid("runs", "Runs"))
            .field(FieldDef::hybrid("outs", "Times Out"))
            .field(FieldDef::hybrid("average", "Batting Average").with_format(RATE_FORMAT))
            .mode(
                Mode::new("baseball", "Baseball")
                    .fields(&["hits", "at_bats", "average"])
                    .relation("baseball", Product::new("hits", "average", "at_bats")),
            )
            .mode(
                Mode::new("cricket", "Cricket")
                    .fields(&["runs", "outs", "average"])
                    .relation("cricket", Product::new("runs", "average", "outs"))
                    .format("average", FormatPolicy::Fixed(2)),
            )
            .clear_policy(ClearPolicy::Full))
    }
}
