use crate::shared::errors::{EngineError, EngineResult};
use crate::shared::types::UnitDTO;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Unit Registry
// ============================================================================

/// Physical quantity kinds a calculator field can be measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityKind {
    Length,
    Area,
    Mass,
    Volume,
    Time,
}

impl QuantityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuantityKind::Length => "length",
            QuantityKind::Area => "area",
            QuantityKind::Mass => "mass",
            QuantityKind::Volume => "volume",
            QuantityKind::Time => "time",
        }
    }
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit definition with its multiplier to the canonical unit of its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub symbol: String,
    pub name: String,
    pub factor: f64,
}

// Length (canonical: meters)
const LENGTH_UNITS: &[(&str, &str, f64)] = &[
    ("mm", "Millimeters", 0.001),
    ("cm", "Centimeters", 0.01),
    ("m", "Meters", 1.0),
    ("km", "Kilometers", 1000.0),
    ("in", "Inches", 0.0254),
    ("ft", "Feet", 0.3048),
    ("yd", "Yards", 0.9144),
    ("mi", "Miles", 1609.344),
];

// Area (canonical: square meters)
const AREA_UNITS: &[(&str, &str, f64)] = &[
    ("cm2", "Square Centimeters", 0.0001),
    ("m2", "Square Meters", 1.0),
    ("km2", "Square Kilometers", 1_000_000.0),
    ("in2", "Square Inches", 0.00064516),
    ("ft2", "Square Feet", 0.09290304),
    ("yd2", "Square Yards", 0.83612736),
    ("ac", "Acres", 4046.8564224),
    ("ha", "Hectares", 10_000.0),
    ("mi2", "Square Miles", 2_589_988.110336),
];

// Mass (canonical: grams)
// 1 stick of butter = 4 oz
const MASS_UNITS: &[(&str, &str, f64)] = &[
    ("mg", "Milligrams", 0.001),
    ("g", "Grams", 1.0),
    ("kg", "Kilograms", 1000.0),
    ("oz", "Ounces", 28.349523125),
    ("lb", "Pounds", 453.59237),
    ("stick", "Sticks", 113.3980925),
];

// Volume (canonical: liters)
const VOLUME_UNITS: &[(&str, &str, f64)] = &[
    ("ml", "Milliliters", 0.001),
    ("L", "Liters", 1.0),
    ("tsp", "Teaspoons", 0.00492892159375),
    ("tbsp", "Tablespoons", 0.0147867647813),
    ("fl-oz", "Fluid Ounces", 0.0295735295625),
    ("cup", "Cups", 0.2365882365),
    ("pint", "Pints", 0.473176473),
    ("quart", "Quarts", 0.946352946),
    ("gal", "Gallons", 3.785411784),
];

// Time (canonical: seconds)
const TIME_UNITS: &[(&str, &str, f64)] = &[
    ("ms", "Milliseconds", 0.001),
    ("s", "Seconds", 1.0),
    ("min", "Minutes", 60.0),
    ("h", "Hours", 3600.0),
    ("day", "Days", 86_400.0),
    ("week", "Weeks", 604_800.0),
    ("yr", "Years", 31_557_600.0),
];

/// `unit -> canonical factor` map for a single quantity kind
#[derive(Debug, Clone)]
pub struct ConversionTable {
    kind: QuantityKind,
    canonical: String,
    units: Vec<UnitDefinition>,
    index: HashMap<String, usize>,
}

impl ConversionTable {
    /// Starts a table whose canonical unit has factor 1
    pub fn new(kind: QuantityKind, canonical: &str, name: &str) -> Self {
        let mut table = Self {
            kind,
            canonical: canonical.to_string(),
            units: Vec::new(),
            index: HashMap::new(),
        };
        table.insert(canonical, name, 1.0);
        table
    }

    /// Adds a unit, rejecting non-positive or non-finite factors
    pub fn with_unit(mut self, symbol: &str, name: &str, factor: f64) -> EngineResult<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(EngineError::InvalidFactor(format!("{} = {}", symbol, factor)));
        }
        if symbol == self.canonical && factor != 1.0 {
            return Err(EngineError::InvalidFactor(format!(
                "canonical unit {} must have factor 1, got {}",
                symbol, factor
            )));
        }
        self.insert(symbol, name, factor);
        Ok(self)
    }

    fn insert(&mut self, symbol: &str, name: &str, factor: f64) {
        let definition = UnitDefinition {
            symbol: symbol.to_string(),
            name: name.to_string(),
            factor,
        };
        match self.index.get(symbol) {
            Some(&slot) => self.units[slot] = definition,
            None => {
                self.index.insert(symbol.to_string(), self.units.len());
                self.units.push(definition);
            }
        }
    }

    fn from_constants(kind: QuantityKind, canonical: &str, units: &[(&str, &str, f64)]) -> Self {
        let name = units
            .iter()
            .find(|(symbol, _, _)| *symbol == canonical)
            .map(|(_, name, _)| *name)
            .unwrap_or(canonical);
        let mut table = Self::new(kind, canonical, name);
        for (symbol, name, factor) in units {
            table.insert(symbol, name, *factor);
        }
        table
    }

    pub fn kind(&self) -> QuantityKind {
        self.kind
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn factor(&self, unit: &str) -> EngineResult<f64> {
        self.index
            .get(unit)
            .map(|&slot| self.units[slot].factor)
            .ok_or_else(|| EngineError::UnknownUnit(format!("{} ({})", unit, self.kind)))
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.index.contains_key(unit)
    }

    pub fn units(&self) -> &[UnitDefinition] {
        &self.units
    }
}

/// Thread-safe default registry initialized once on first use
static DEFAULT_REGISTRY: Lazy<Arc<ConversionRegistry>> = Lazy::new(|| {
    let mut registry = ConversionRegistry::empty();
    registry.register(ConversionTable::from_constants(QuantityKind::Length, "m", LENGTH_UNITS));
    registry.register(ConversionTable::from_constants(QuantityKind::Area, "m2", AREA_UNITS));
    registry.register(ConversionTable::from_constants(QuantityKind::Mass, "g", MASS_UNITS));
    registry.register(ConversionTable::from_constants(QuantityKind::Volume, "L", VOLUME_UNITS));
    registry.register(ConversionTable::from_constants(QuantityKind::Time, "s", TIME_UNITS));
    Arc::new(registry)
});

/// Per-kind conversion tables. Pure lookups, no side effects.
#[derive(Debug, Clone, Default)]
pub struct ConversionRegistry {
    tables: HashMap<QuantityKind, ConversionTable>,
}

impl ConversionRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in length, area, mass, volume and time tables
    pub fn shared() -> Arc<Self> {
        Arc::clone(&DEFAULT_REGISTRY)
    }

    /// Installs a table, replacing any previous table of the same kind
    pub fn register(&mut self, table: ConversionTable) {
        self.tables.insert(table.kind(), table);
    }

    pub fn table(&self, kind: QuantityKind) -> EngineResult<&ConversionTable> {
        self.tables
            .get(&kind)
            .ok_or_else(|| EngineError::UnknownUnit(format!("no units registered for {}", kind)))
    }

    pub fn contains(&self, kind: QuantityKind, unit: &str) -> bool {
        self.tables.get(&kind).is_some_and(|table| table.contains(unit))
    }

    pub fn to_canonical(&self, value: f64, unit: &str, kind: QuantityKind) -> EngineResult<f64> {
        Ok(value * self.table(kind)?.factor(unit)?)
    }

    pub fn from_canonical(&self, value: f64, unit: &str, kind: QuantityKind) -> EngineResult<f64> {
        Ok(value / self.table(kind)?.factor(unit)?)
    }

    /// Converts between two units of the same kind
    pub fn convert(&self, value: f64, from_unit: &str, to_unit: &str, kind: QuantityKind) -> EngineResult<f64> {
        let table = self.table(kind)?;
        let from_factor = table.factor(from_unit)?;
        let to_factor = table.factor(to_unit)?;
        // Same unit, no conversion needed
        if from_unit == to_unit {
            return Ok(value);
        }
        Ok(value * from_factor / to_factor)
    }

    /// Units of one kind for host dropdowns, smallest first
    pub fn units(&self, kind: QuantityKind) -> EngineResult<Vec<UnitDTO>> {
        let table = self.table(kind)?;
        let mut units: Vec<&UnitDefinition> = table.units().iter().collect();
        units.sort_by(|a, b| a.factor.total_cmp(&b.factor));

        Ok(units
            .into_iter()
            .map(|def| UnitDTO {
                id: def.symbol.clone(),
                label: def.name.clone(),
                category: kind.to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_yards_to_square_meters_to_acres() {
        let registry = ConversionRegistry::shared();
        let square_meters = registry.to_canonical(20.0, "yd2", QuantityKind::Area).unwrap();
        let acres = registry.from_canonical(square_meters, "ac", QuantityKind::Area).unwrap();
        assert!((acres - 0.004132).abs() < 1e-6, "got {}", acres);
    }

    #[test]
    fn test_stick_of_butter_in_grams() {
        let registry = ConversionRegistry::shared();
        let grams = registry.convert(1.0, "stick", "g", QuantityKind::Mass).unwrap();
        assert!((grams - 113.3981).abs() < 1e-4);
    }

    #[test]
    fn test_negative_values_convert() {
        let registry = ConversionRegistry::shared();
        let feet = registry.convert(-1.0, "yd", "ft", QuantityKind::Length).unwrap();
        assert!((feet + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_unit_for_kind() {
        let registry = ConversionRegistry::shared();
        let err = registry.to_canonical(1.0, "ac", QuantityKind::Length).unwrap_err();
        assert!(matches!(err, EngineError::UnknownUnit(_)));
        assert!(registry.convert(1.0, "m", "lb", QuantityKind::Length).is_err());
    }

    #[test]
    fn test_invalid_factors_rejected() {
        let table = ConversionTable::new(QuantityKind::Length, "m", "Meters");
        assert!(table.clone().with_unit("bad", "Bad", 0.0).is_err());
        assert!(table.clone().with_unit("nan", "NaN", f64::NAN).is_err());
        assert!(table.clone().with_unit("m", "Meters", 2.0).is_err());
        let table = table.with_unit("fathom", "Fathoms", 1.8288).unwrap();
        assert_eq!(table.factor("fathom").unwrap(), 1.8288);
    }

    #[test]
    fn test_every_canonical_unit_has_factor_one() {
        let registry = ConversionRegistry::shared();
        for kind in [
            QuantityKind::Length,
            QuantityKind::Area,
            QuantityKind::Mass,
            QuantityKind::Volume,
            QuantityKind::Time,
        ] {
            let table = registry.table(kind).unwrap();
            assert_eq!(table.factor(table.canonical()).unwrap(), 1.0);
            assert!(table.units().iter().all(|u| u.factor > 0.0));
        }
    }

    #[test]
    fn test_units_listing_sorted_by_size() {
        let units = ConversionRegistry::shared().units(QuantityKind::Length).unwrap();
        assert_eq!(units.first().map(|u| u.id.as_str()), Some("mm"));
        assert_eq!(units.last().map(|u| u.id.as_str()), Some("mi"));
        assert!(units.iter().all(|u| u.category == "length"));
    }

    #[test]
    fn test_unit_round_trip_sweep() {
        let registry = ConversionRegistry::shared();
        let mut rng = StdRng::seed_from_u64(7);
        let kind = QuantityKind::Volume;
        let symbols: Vec<String> = registry
            .table(kind)
            .unwrap()
            .units()
            .iter()
            .map(|u| u.symbol.clone())
            .collect();

        for _ in 0..500 {
            let value: f64 = rng.gen_range(-1e6..1e6);
            let from = &symbols[rng.gen_range(0..symbols.len())];
            let to = &symbols[rng.gen_range(0..symbols.len())];
            let canonical = registry.to_canonical(value, from, kind).unwrap();
            let there = registry.from_canonical(canonical, to, kind).unwrap();
            let back = registry.convert(there, to, from, kind).unwrap();
            assert!(close(back, value, 1e-9), "{} {} -> {} {} -> {}", value, from, there, to, back);
        }
    }
}
