//! One mounted calculator
//!
//! A `Calculator` owns its spec, the active mode and the current field
//! values, and turns host events into solver steps. Every event runs to
//! completion on `&mut self` and answers with fresh snapshots.

use crate::core::conversion::ConversionRegistry;
use crate::core::format::{format_computed, FormatPolicy};
use crate::core::presets::PresetRegistry;
use crate::core::solver::{self, FieldSet, FieldSource, FieldState, SolveContext};
use crate::core::spec::{CalculatorSpec, ClearPolicy, FieldDef, Mode};
use crate::shared::errors::{EngineError, EngineResult};
use crate::shared::settings::EngineSettings;
use crate::shared::types::{FieldRole, FieldSnapshot};
use std::sync::Arc;
use tracing::debug;

pub struct Calculator {
    spec: CalculatorSpec,
    mode: Option<usize>,
    fields: FieldSet,
    /// Selector id -> chosen key
    selections: Vec<(String, String)>,
    conversions: Arc<ConversionRegistry>,
    presets: Arc<PresetRegistry>,
    settings: Arc<EngineSettings>,
}

fn context<'a>(spec: &'a CalculatorSpec, mode: Option<usize>, conversions: &'a ConversionRegistry) -> SolveContext<'a> {
    SolveContext::new(spec, mode.and_then(|index| spec.modes.get(index)), conversions)
}

impl Calculator {
    /// Mounts `spec` against the built-in registries and default settings
    pub fn new(spec: CalculatorSpec) -> EngineResult<Self> {
        Self::with_registries(
            spec,
            ConversionRegistry::shared(),
            PresetRegistry::shared(),
            Arc::new(EngineSettings::default()),
        )
    }

    pub fn with_registries(
        spec: CalculatorSpec,
        conversions: Arc<ConversionRegistry>,
        presets: Arc<PresetRegistry>,
        settings: Arc<EngineSettings>,
    ) -> EngineResult<Self> {
        spec.validate(&conversions, &presets)?;
        debug!(calculator = %spec.id, fields = spec.fields.len(), modes = spec.modes.len(), "mounted calculator");

        let mode = if spec.modes.is_empty() { None } else { Some(0) };
        let fields = FieldSet::from_spec(&spec);
        Ok(Self {
            spec,
            mode,
            fields,
            selections: Vec::new(),
            conversions,
            presets,
            settings,
        })
    }

    pub fn spec(&self) -> &CalculatorSpec {
        &self.spec
    }

    pub fn mode(&self) -> Option<&str> {
        self.active_mode().map(|m| m.id.as_str())
    }

    fn active_mode(&self) -> Option<&Mode> {
        self.mode.and_then(|index| self.spec.modes.get(index))
    }

    pub fn field(&self, id: &str) -> Option<&FieldState> {
        self.fields.get(id)
    }

    /// Current numeric value in the field's selected unit
    pub fn value(&self, id: &str) -> Option<f64> {
        self.fields.value(id)
    }

    pub fn selection(&self, selector_id: &str) -> Option<&str> {
        self.selections
            .iter()
            .find(|(id, _)| id == selector_id)
            .map(|(_, key)| key.as_str())
    }

    pub fn on_edit(&mut self, field_id: &str, raw_text: &str) -> EngineResult<Vec<FieldSnapshot>> {
        debug!(calculator = %self.spec.id, field = field_id, raw = raw_text, "edit");
        let ctx = context(&self.spec, self.mode, &self.conversions);
        self.fields = solver::solve(&ctx, &self.fields, field_id, raw_text)?;
        Ok(self.snapshots())
    }

    pub fn on_mode_change(&mut self, mode_id: &str) -> EngineResult<Vec<FieldSnapshot>> {
        let index = self.spec.mode_index(mode_id)?;
        if self.mode == Some(index) {
            return Ok(self.snapshots());
        }

        debug!(calculator = %self.spec.id, mode = mode_id, policy = ?self.spec.clear_policy, "mode change");
        self.mode = Some(index);
        if self.spec.clear_policy == ClearPolicy::Full {
            self.fields.blank_all();
            self.selections.clear();
        }

        let ctx = context(&self.spec, self.mode, &self.conversions);
        solver::resolve(&ctx, &mut self.fields, None)?;
        Ok(self.snapshots())
    }

    /// Switches a field's display unit.
    ///
    /// Typed numbers keep their digits and now mean the new unit; preset
    /// values keep their quantity. Authority is unchanged and everything
    /// else is re-derived.
    pub fn on_unit_change(&mut self, field_id: &str, unit: &str) -> EngineResult<Vec<FieldSnapshot>> {
        let def = self.spec.field_def(field_id)?;
        let kind = def
            .kind
            .ok_or_else(|| EngineError::UnknownUnit(format!("{} has no unit", field_id)))?;
        if !self.conversions.contains(kind, unit) {
            return Err(EngineError::UnknownUnit(format!("{} ({})", unit, kind)));
        }

        debug!(calculator = %self.spec.id, field = field_id, unit, "unit change");
        if let Some(state) = self.fields.get(field_id) {
            if let (FieldSource::Preset, Some(value), Some(from)) = (state.source, state.value.value(), state.unit.as_deref()) {
                let converted = self.conversions.convert(value, from, unit, kind)?;
                self.fields.set_value(field_id, converted)?;
            }
        }
        self.fields.set_unit(field_id, unit)?;

        let ctx = context(&self.spec, self.mode, &self.conversions);
        solver::resolve(&ctx, &mut self.fields, None)?;
        Ok(self.snapshots())
    }

    /// Feeds the selected preset into the selector's target field
    pub fn on_select(&mut self, selector_id: &str, key: &str) -> EngineResult<Vec<FieldSnapshot>> {
        let selector = self.spec.selector_def(selector_id)?;
        let target = selector.target.clone();
        let preset = self.presets.lookup_exact(&selector.table, key)?;

        let ctx = context(&self.spec, self.mode, &self.conversions);
        if !ctx.is_active(&target) {
            return Err(EngineError::InactiveField(target));
        }

        // Presets are stored in the target's canonical unit
        let def = self.spec.field_def(&target)?;
        let value = match (def.kind, self.fields.get(&target).and_then(|s| s.unit.as_deref())) {
            (Some(kind), Some(unit)) => self.conversions.from_canonical(preset, unit, kind)?,
            _ => preset,
        };

        debug!(calculator = %self.spec.id, selector = selector_id, key, field = %target, value, "preset selected");
        self.fields
            .set_authoritative(&target, String::new(), value, FieldSource::Preset)?;
        solver::resolve(&ctx, &mut self.fields, Some(&target))?;

        self.selections.retain(|(id, _)| id != selector_id);
        self.selections.push((selector_id.to_string(), key.to_string()));
        Ok(self.snapshots())
    }

    /// Blanks every field and restores default units; the mode is kept
    pub fn reset(&mut self) -> Vec<FieldSnapshot> {
        debug!(calculator = %self.spec.id, "reset");
        self.fields = FieldSet::from_spec(&self.spec);
        self.selections.clear();
        self.snapshots()
    }

    /// Display state of every field active in the current mode
    pub fn snapshots(&self) -> Vec<FieldSnapshot> {
        let mode = self.active_mode();
        self.spec
            .fields
            .iter()
            .filter(|def| mode.map_or(true, |m| m.includes(&def.id)))
            .filter_map(|def| self.fields.get(&def.id).map(|state| self.snapshot(def, state, mode)))
            .collect()
    }

    fn snapshot(&self, def: &FieldDef, state: &FieldState, mode: Option<&Mode>) -> FieldSnapshot {
        let display_value = if state.source == FieldSource::User || (state.source == FieldSource::Empty && !state.raw_text.is_empty()) {
            state.raw_text.clone()
        } else {
            format_computed(state.value, self.format_for(def, mode), &self.settings.undefined_marker)
        };

        let role = match (def.role, state.source) {
            (FieldRole::Hybrid, FieldSource::User | FieldSource::Preset) => FieldRole::Input,
            (FieldRole::Hybrid, FieldSource::Derived) => FieldRole::Derived,
            (role, _) => role,
        };

        FieldSnapshot {
            id: def.id.clone(),
            display_value,
            unit: state.unit.clone(),
            role,
        }
    }

    fn format_for<'a>(&'a self, def: &'a FieldDef, mode: Option<&'a Mode>) -> &'a FormatPolicy {
        mode.and_then(|m| m.format_for(&def.id))
            .or(def.format.as_ref())
            .or(self.spec.default_format.as_ref())
            .unwrap_or(&self.settings.default_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversion::QuantityKind;
    use crate::core::presets::ExactTable;
    use crate::core::relation::{Computed, Equivalence, Formula, Logarithm, Product};

    fn display(snapshots: &[FieldSnapshot], id: &str) -> String {
        snapshots
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.display_value.clone())
            .unwrap_or_else(|| panic!("no snapshot for {}", id))
    }

    fn rectangle(policy: ClearPolicy) -> CalculatorSpec {
        CalculatorSpec::new("rectangle", "Rectangle")
            .field(FieldDef::hybrid("width", "Width").with_unit(QuantityKind::Length, "m"))
            .field(FieldDef::hybrid("length", "Length").with_unit(QuantityKind::Length, "m"))
            .field(FieldDef::hybrid("area", "Area").with_unit(QuantityKind::Area, "m2"))
            .relation("area", Product::new("area", "width", "length"))
            .clear_policy(policy)
            .default_format(FormatPolicy::Fixed(2))
    }

    #[test]
    fn test_user_text_is_shown_verbatim() {
        let mut calc = Calculator::new(rectangle(ClearPolicy::Cascade)).unwrap();
        calc.on_edit("width", "4.").unwrap();
        let snapshots = calc.on_edit("length", "5").unwrap();
        assert_eq!(display(&snapshots, "width"), "4.");
        assert_eq!(display(&snapshots, "area"), "20.00");

        let area = snapshots.iter().find(|s| s.id == "area").unwrap();
        assert_eq!(area.role, FieldRole::Derived);
        let width = snapshots.iter().find(|s| s.id == "width").unwrap();
        assert_eq!(width.role, FieldRole::Input);
    }

    #[test]
    fn test_unit_change_reinterprets_typed_value() {
        let mut calc = Calculator::new(rectangle(ClearPolicy::Cascade)).unwrap();
        calc.on_edit("width", "4").unwrap();
        calc.on_edit("length", "5").unwrap();

        // 4 cm x 5 m = 0.2 m2
        let snapshots = calc.on_unit_change("width", "cm").unwrap();
        assert_eq!(display(&snapshots, "width"), "4");
        assert_eq!(display(&snapshots, "area"), "0.20");

        // Derived field re-expressed in its new unit
        let snapshots = calc.on_unit_change("area", "cm2").unwrap();
        assert_eq!(display(&snapshots, "area"), "2000.00");
        assert_eq!(calc.field("width").unwrap().source, FieldSource::User);
    }

    #[test]
    fn test_unit_change_rejects_foreign_unit() {
        let mut calc = Calculator::new(rectangle(ClearPolicy::Cascade)).unwrap();
        let err = calc.on_unit_change("width", "kg").unwrap_err();
        assert!(matches!(err, EngineError::UnknownUnit(_)));
    }

    #[test]
    fn test_reset_blanks_everything() {
        let mut calc = Calculator::new(rectangle(ClearPolicy::None)).unwrap();
        calc.on_edit("width", "4").unwrap();
        calc.on_edit("length", "5").unwrap();
        calc.on_unit_change("area", "ft2").unwrap();

        let snapshots = calc.reset();
        assert!(snapshots.iter().all(|s| s.display_value.is_empty()));
        assert_eq!(calc.field("area").unwrap().unit.as_deref(), Some("m2"));
    }

    #[test]
    fn test_undefined_marker_from_settings() {
        let spec = CalculatorSpec::new("log", "Logarithm")
            .field(FieldDef::hybrid("base", "Base"))
            .field(FieldDef::hybrid("argument", "Argument"))
            .field(FieldDef::hybrid("result", "Result"))
            .relation("log", Logarithm::new("base", "argument", "result"));
        let settings = EngineSettings {
            undefined_marker: "n/a".to_string(),
            ..EngineSettings::default()
        };
        let mut calc = Calculator::with_registries(
            spec,
            ConversionRegistry::shared(),
            PresetRegistry::shared(),
            Arc::new(settings),
        )
        .unwrap();

        calc.on_edit("base", "10").unwrap();
        let snapshots = calc.on_edit("argument", "-5").unwrap();
        assert_eq!(display(&snapshots, "result"), "n/a");

        let snapshots = calc.on_edit("argument", "1000").unwrap();
        assert_eq!(display(&snapshots, "result"), "3");
    }

    #[test]
    fn test_mode_switch_keeps_inputs_under_cascade() {
        let spec = CalculatorSpec::new("scale", "Scale")
            .field(FieldDef::input("x", "X"))
            .field(FieldDef::derived("double", "Double"))
            .field(FieldDef::derived("triple", "Triple"))
            .mode(
                Mode::new("double", "Double")
                    .fields(&["x", "double"])
                    .relation("double", Formula::new("double", &["x"], |v| Computed::from_f64(v[0] * 2.0))),
            )
            .mode(
                Mode::new("triple", "Triple")
                    .fields(&["x", "triple"])
                    .relation("triple", Formula::new("triple", &["x"], |v| Computed::from_f64(v[0] * 3.0))),
            )
            .clear_policy(ClearPolicy::Cascade);
        let mut calc = Calculator::new(spec).unwrap();

        let snapshots = calc.on_edit("x", "2").unwrap();
        assert_eq!(display(&snapshots, "double"), "4");
        assert_eq!(snapshots.len(), 2);

        let snapshots = calc.on_mode_change("triple").unwrap();
        assert_eq!(calc.mode(), Some("triple"));
        assert_eq!(display(&snapshots, "x"), "2");
        assert_eq!(display(&snapshots, "triple"), "6");
        assert_eq!(calc.value("double"), None);

        let err = calc.on_mode_change("quadruple").unwrap_err();
        assert_eq!(err, EngineError::UnknownMode("quadruple".to_string()));
    }

    #[test]
    fn test_mode_switch_without_clear_policy() {
        let spec = CalculatorSpec::new("shapes", "Shapes")
            .field(FieldDef::input("side", "Side"))
            .field(FieldDef::input("height", "Height"))
            .field(FieldDef::derived("area", "Area"))
            .mode(
                Mode::new("square", "Square")
                    .fields(&["side", "area"])
                    .relation("square", Formula::new("area", &["side"], |v| Computed::from_f64(v[0] * v[0]))),
            )
            .mode(
                Mode::new("rectangle", "Rectangle")
                    .fields(&["side", "height", "area"])
                    .relation("rectangle", Formula::new("area", &["side", "height"], |v| Computed::from_f64(v[0] * v[1]))),
            )
            .clear_policy(ClearPolicy::None);
        let mut calc = Calculator::new(spec).unwrap();

        calc.on_mode_change("rectangle").unwrap();
        calc.on_edit("side", "3").unwrap();
        let snapshots = calc.on_edit("height", "4").unwrap();
        assert_eq!(display(&snapshots, "area"), "12");

        // Typed side survives, height leaves the mode and blanks
        let snapshots = calc.on_mode_change("square").unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(display(&snapshots, "side"), "3");
        assert_eq!(display(&snapshots, "area"), "9");
        assert_eq!(calc.value("height"), None);
        assert_eq!(calc.field("height").unwrap().source, FieldSource::Empty);

        let snapshots = calc.on_mode_change("rectangle").unwrap();
        assert_eq!(display(&snapshots, "side"), "3");
        assert_eq!(display(&snapshots, "height"), "");
        assert_eq!(display(&snapshots, "area"), "");
    }

    #[test]
    fn test_select_feeds_preset_in_field_unit() {
        let mut presets = PresetRegistry::empty();
        presets.register_exact(ExactTable::new(
            "stock",
            vec![("long".to_string(), 1000.0), ("short".to_string(), 250.0)],
        ));

        let spec = CalculatorSpec::new("stock", "Stock length")
            .field(FieldDef::hybrid("meters", "Meters").with_unit(QuantityKind::Length, "m"))
            .field(FieldDef::hybrid("kilometers", "Kilometers").with_unit(QuantityKind::Length, "km"))
            .relation("same", Equivalence::new(&["meters", "kilometers"]))
            .selector("stock", "stock", "kilometers");
        let mut calc = Calculator::with_registries(
            spec,
            ConversionRegistry::shared(),
            Arc::new(presets),
            Arc::new(EngineSettings::default()),
        )
        .unwrap();

        let snapshots = calc.on_select("stock", "long").unwrap();
        assert_eq!(display(&snapshots, "kilometers"), "1");
        assert_eq!(display(&snapshots, "meters"), "1000");
        assert_eq!(calc.selection("stock"), Some("long"));

        let err = calc.on_select("stock", "medium").unwrap_err();
        assert!(matches!(err, EngineError::UnknownKey(_)));
        assert!(calc.on_select("nope", "long").is_err());

        // Preset keeps its length when the unit changes
        let snapshots = calc.on_unit_change("kilometers", "m").unwrap();
        assert_eq!(display(&snapshots, "kilometers"), "1000");
        assert_eq!(calc.field("kilometers").unwrap().source, FieldSource::Preset);
    }
}
