//! Preset lookup tables consumed by selector fields and banded relations
//!
//! Exact tables map a closed set of keys (country, ingredient) to a value.
//! Threshold tables hold `(threshold, value)` bands in strictly descending
//! threshold order; a lookup returns the first band whose threshold does not
//! exceed the input.

use crate::shared::errors::{EngineError, EngineResult};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const LIFE_EXPECTANCY: &str = "life_expectancy";
pub const INGREDIENT_DENSITY: &str = "ingredient_density";
pub const SCALED_SCORE: &str = "scaled_score";

// Period life expectancy at birth, years
const LIFE_EXPECTANCY_YEARS: &[(&str, f64)] = &[
    ("Japan", 84.3),
    ("Switzerland", 83.4),
    ("South Korea", 83.3),
    ("Singapore", 83.2),
    ("Spain", 83.2),
    ("Australia", 83.0),
    ("Italy", 83.0),
    ("France", 82.5),
    ("Canada", 82.2),
    ("Germany", 81.7),
    ("United Kingdom", 81.4),
    ("United States", 78.5),
    ("China", 77.4),
    ("Brazil", 75.9),
    ("India", 70.8),
    ("Nigeria", 62.6),
];

// Grams per milliliter; water is the reference
const INGREDIENT_DENSITY_G_PER_ML: &[(&str, f64)] = &[
    ("water", 1.0),
    ("milk", 1.03),
    ("butter", 0.911),
    ("vegetable oil", 0.92),
    ("honey", 1.42),
    ("granulated sugar", 0.85),
    ("brown sugar", 0.93),
    ("all-purpose flour", 0.53),
    ("rice", 0.77),
    ("rolled oats", 0.36),
    ("cocoa powder", 0.44),
    ("salt", 1.2),
];

// Raw score (out of 58) to scaled score, descending; 0 is the floor band
const SCALED_SCORE_BANDS: &[(f64, f64)] = &[
    (58.0, 800.0),
    (55.0, 760.0),
    (50.0, 700.0),
    (45.0, 650.0),
    (40.0, 600.0),
    (35.0, 560.0),
    (30.0, 520.0),
    (25.0, 480.0),
    (20.0, 440.0),
    (15.0, 400.0),
    (10.0, 340.0),
    (5.0, 270.0),
    (0.0, 200.0),
];

/// Closed key -> value table
#[derive(Debug, Clone, PartialEq)]
pub struct ExactTable {
    name: String,
    entries: Vec<(String, f64)>,
}

impl ExactTable {
    pub fn new(name: &str, entries: Vec<(String, f64)>) -> Self {
        Self { name: name.to_string(), entries }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, key: &str) -> EngineResult<f64> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| *value)
            .ok_or_else(|| EngineError::UnknownKey(format!("{} in {}", key, self.name)))
    }

    /// Keys in declaration order, for selector options
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }
}

/// Descending `(threshold, value)` bands
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    name: String,
    bands: Vec<(f64, f64)>,
}

impl ThresholdTable {
    pub fn new(name: &str, bands: Vec<(f64, f64)>) -> EngineResult<Self> {
        if bands.iter().any(|(threshold, value)| !threshold.is_finite() || !value.is_finite()) {
            return Err(EngineError::UnsortedThresholds(format!("{} has non-finite entries", name)));
        }
        if bands.windows(2).any(|pair| pair[0].0 <= pair[1].0) {
            return Err(EngineError::UnsortedThresholds(name.to_string()));
        }
        Ok(Self { name: name.to_string(), bands })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, input: f64) -> EngineResult<f64> {
        self.bands
            .iter()
            .find(|(threshold, _)| *threshold <= input)
            .map(|(_, value)| *value)
            .ok_or_else(|| EngineError::BelowAllThresholds(format!("{} in {}", input, self.name)))
    }
}

/// On-disk / injected representation of a registry
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PresetDocument {
    exact: HashMap<String, Vec<(String, f64)>>,
    threshold: HashMap<String, Vec<(f64, f64)>>,
}

static DEFAULT_PRESETS: Lazy<Arc<PresetRegistry>> = Lazy::new(|| Arc::new(PresetRegistry::builtin()));

/// Named preset tables, loaded once and shared read-only
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    exact: HashMap<String, ExactTable>,
    threshold: HashMap<String, Arc<ThresholdTable>>,
}

impl PresetRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Life expectancy, ingredient density and scaled score tables
    pub fn shared() -> Arc<Self> {
        Arc::clone(&DEFAULT_PRESETS)
    }

    fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register_exact(ExactTable::new(LIFE_EXPECTANCY, owned(LIFE_EXPECTANCY_YEARS)));
        registry.register_exact(ExactTable::new(INGREDIENT_DENSITY, owned(INGREDIENT_DENSITY_G_PER_ML)));
        registry.threshold.insert(
            SCALED_SCORE.to_string(),
            Arc::new(ThresholdTable {
                name: SCALED_SCORE.to_string(),
                bands: SCALED_SCORE_BANDS.to_vec(),
            }),
        );
        registry
    }

    /// Loads tables from a JSON document:
    /// `{"exact": {"name": [["key", 1.0]]}, "threshold": {"name": [[10, 1.0]]}}`
    pub fn from_json(content: &str) -> EngineResult<Self> {
        let document: PresetDocument = serde_json::from_str(content)?;
        let mut registry = Self::empty();
        for (name, entries) in document.exact {
            registry.register_exact(ExactTable::new(&name, entries));
        }
        for (name, bands) in document.threshold {
            registry.register_threshold(ThresholdTable::new(&name, bands)?);
        }
        debug!(
            exact = registry.exact.len(),
            threshold = registry.threshold.len(),
            "loaded preset tables"
        );
        Ok(registry)
    }

    pub fn register_exact(&mut self, table: ExactTable) {
        self.exact.insert(table.name().to_string(), table);
    }

    pub fn register_threshold(&mut self, table: ThresholdTable) {
        self.threshold.insert(table.name().to_string(), Arc::new(table));
    }

    pub fn exact(&self, table: &str) -> EngineResult<&ExactTable> {
        self.exact
            .get(table)
            .ok_or_else(|| EngineError::UnknownTable(table.to_string()))
    }

    pub fn threshold(&self, table: &str) -> EngineResult<Arc<ThresholdTable>> {
        self.threshold
            .get(table)
            .cloned()
            .ok_or_else(|| EngineError::UnknownTable(table.to_string()))
    }

    pub fn lookup_exact(&self, table: &str, key: &str) -> EngineResult<f64> {
        self.exact(table)?.lookup(key)
    }

    pub fn lookup_threshold(&self, table: &str, input: f64) -> EngineResult<f64> {
        self.threshold(table)?.lookup(input)
    }

    pub fn keys(&self, table: &str) -> EngineResult<Vec<&str>> {
        Ok(self.exact(table)?.keys())
    }
}

fn owned(entries: &[(&str, f64)]) -> Vec<(String, f64)> {
    entries.iter().map(|(key, value)| (key.to_string(), *value)).collect()
}
