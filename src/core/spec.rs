//! Declarative calculator definitions
//!
//! A `CalculatorSpec` lists a calculator's fields, the relations linking
//! them, its modes and preset selectors, and the clear policy applied when a
//! field is emptied or the mode changes. Specs are built once, validated
//! against the registries, and never mutated afterwards.

use crate::core::conversion::{ConversionRegistry, QuantityKind};
use crate::core::format::FormatPolicy;
use crate::core::presets::PresetRegistry;
use crate::core::relation::{Relation, RelationKind, RelationSolver};
use crate::shared::errors::{EngineError, EngineResult};
use crate::shared::types::FieldRole;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What resets when a field is cleared or the mode changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearPolicy {
    /// Every field blanks
    #[default]
    Full,
    /// The cleared field and everything that could only be derived through it
    Cascade,
    /// Only the cleared field
    None,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub id: String,
    pub label: String,
    pub role: FieldRole,
    pub kind: Option<QuantityKind>,
    /// Unit selected when the calculator mounts
    pub unit: Option<String>,
    pub format: Option<FormatPolicy>,
}

impl FieldDef {
    fn with_role(id: &str, label: &str, role: FieldRole) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            role,
            kind: None,
            unit: None,
            format: None,
        }
    }

    pub fn input(id: &str, label: &str) -> Self {
        Self::with_role(id, label, FieldRole::Input)
    }

    pub fn derived(id: &str, label: &str) -> Self {
        Self::with_role(id, label, FieldRole::Derived)
    }

    pub fn hybrid(id: &str, label: &str) -> Self {
        Self::with_role(id, label, FieldRole::Hybrid)
    }

    pub fn with_unit(mut self, kind: QuantityKind, unit: &str) -> Self {
        self.kind = Some(kind);
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_format(mut self, policy: FormatPolicy) -> Self {
        self.format = Some(policy);
        self
    }
}

/// One formula variant of a calculator
#[derive(Debug, Clone)]
pub struct Mode {
    pub id: String,
    pub label: String,
    /// Appended to the calculator's always-active relations
    pub relations: Vec<Relation>,
    /// Fields shown in this mode; empty means all
    pub fields: Vec<String>,
    /// Per-field display overrides
    pub formats: Vec<(String, FormatPolicy)>,
}

impl Mode {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            relations: Vec::new(),
            fields: Vec::new(),
            formats: Vec::new(),
        }
    }

    pub fn relation(mut self, name: &str, kind: impl Into<RelationKind>) -> Self {
        self.relations.push(Relation::new(name, kind));
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn format(mut self, field: &str, policy: FormatPolicy) -> Self {
        self.formats.push((field.to_string(), policy));
        self
    }

    pub fn includes(&self, field: &str) -> bool {
        self.fields.is_empty() || self.fields.iter().any(|f| f == field)
    }

    pub fn format_for(&self, field: &str) -> Option<&FormatPolicy> {
        self.formats.iter().find(|(id, _)| id == field).map(|(_, policy)| policy)
    }
}

/// Dropdown whose choice feeds an exact preset value into a field
#[derive(Debug, Clone)]
pub struct Selector {
    pub id: String,
    pub table: String,
    pub target: String,
}

#[derive(Debug, Clone)]
pub struct CalculatorSpec {
    pub id: String,
    pub title: String,
    pub fields: Vec<FieldDef>,
    /// Always active, in tie-break order
    pub relations: Vec<Relation>,
    /// First mode is active on mount
    pub modes: Vec<Mode>,
    pub selectors: Vec<Selector>,
    pub clear_policy: ClearPolicy,
    /// Per-calculator precision; falls back to the engine settings
    pub default_format: Option<FormatPolicy>,
}

impl CalculatorSpec {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            fields: Vec::new(),
            relations: Vec::new(),
            modes: Vec::new(),
            selectors: Vec::new(),
            clear_policy: ClearPolicy::default(),
            default_format: None,
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn relation(mut self, name: &str, kind: impl Into<RelationKind>) -> Self {
        self.relations.push(Relation::new(name, kind));
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.modes.push(mode);
        self
    }

    pub fn selector(mut self, id: &str, table: &str, target: &str) -> Self {
        self.selectors.push(Selector {
            id: id.to_string(),
            table: table.to_string(),
            target: target.to_string(),
        });
        self
    }

    pub fn clear_policy(mut self, policy: ClearPolicy) -> Self {
        self.clear_policy = policy;
        self
    }

    pub fn default_format(mut self, policy: FormatPolicy) -> Self {
        self.default_format = Some(policy);
        self
    }

    pub fn field_def(&self, id: &str) -> EngineResult<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| EngineError::UnknownField(id.to_string()))
    }

    /// Position of a mode in declaration order
    pub fn mode_index(&self, id: &str) -> EngineResult<usize> {
        self.modes
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| EngineError::UnknownMode(id.to_string()))
    }

    pub fn selector_def(&self, id: &str) -> EngineResult<&Selector> {
        self.selectors
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| EngineError::UnknownSelector(id.to_string()))
    }

    /// Spec relations followed by the mode's own, in tie-break order
    pub fn active_relations<'a>(&'a self, mode: Option<&'a Mode>) -> Vec<&'a Relation> {
        self.relations
            .iter()
            .chain(mode.into_iter().flat_map(|m| m.relations.iter()))
            .collect()
    }

    /// Checks every reference in the spec against itself and the registries
    pub fn validate(&self, conversions: &ConversionRegistry, presets: &PresetRegistry) -> EngineResult<()> {
        let mut ids = HashSet::new();
        for field in &self.fields {
            if !ids.insert(field.id.as_str()) {
                return Err(invalid(format!("{}: duplicate field {}", self.id, field.id)));
            }
            match (field.kind, field.unit.as_deref()) {
                (Some(kind), Some(unit)) => {
                    if !conversions.contains(kind, unit) {
                        return Err(EngineError::UnknownUnit(format!("{} ({})", unit, kind)));
                    }
                }
                (None, None) => {}
                _ => return Err(invalid(format!("{}: field {} needs both kind and unit", self.id, field.id))),
            }
        }

        let mut mode_ids = HashSet::new();
        for mode in &self.modes {
            if !mode_ids.insert(mode.id.as_str()) {
                return Err(invalid(format!("{}: duplicate mode {}", self.id, mode.id)));
            }
            for field in mode.fields.iter().chain(mode.formats.iter().map(|(id, _)| id)) {
                self.field_def(field)?;
            }
        }

        let mode_relations = self.modes.iter().flat_map(|m| m.relations.iter());
        for relation in self.relations.iter().chain(mode_relations) {
            self.validate_relation(relation)?;
        }

        for selector in &self.selectors {
            presets.exact(&selector.table)?;
            self.field_def(&selector.target)?;
        }

        Ok(())
    }

    fn validate_relation(&self, relation: &Relation) -> EngineResult<()> {
        let members = relation.kind.members();
        for member in &members {
            self.field_def(member)?;
        }

        if relation.kind.is_invertible() {
            if members.len() <= relation.kind.required_knowns() {
                return Err(invalid(format!(
                    "{}: relation {} has nothing left to solve",
                    self.id, relation.name
                )));
            }
        } else {
            for output in relation.kind.outputs() {
                if self.field_def(output)?.role == FieldRole::Input {
                    return Err(invalid(format!(
                        "{}: relation {} writes input field {}",
                        self.id, relation.name, output
                    )));
                }
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> EngineError {
    EngineError::InvalidSpec(message)
}
