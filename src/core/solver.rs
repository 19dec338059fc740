//! Resolution engine
//!
//! `solve` applies one edit to a calculator's field values and returns the
//! new, consistent value set. Values entered by the user (or fed from a
//! preset) are authoritative; everything else is re-derived from them on
//! every step, so no derived value outlives the inputs it came from.
//!
//! Relations are tried in declaration order and re-scanned until nothing
//! changes. The first relation able to fill a field claims it; later
//! relations never overwrite a claimed field. When an invertible relation ends
//! up with more independent knowns than it needs, directly or through values
//! another relation derived, the weakest authoritative field behind them is
//! demoted and the pass runs again. The edited field and preset values win,
//! then the most recent edits.

use crate::core::conversion::ConversionRegistry;
use crate::core::format::parse_number;
use crate::core::relation::{Computed, Knowns, Relation, RelationSolver};
use crate::core::spec::{CalculatorSpec, ClearPolicy, Mode};
use crate::shared::errors::{EngineError, EngineResult};
use crate::shared::types::FieldRole;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Where a field's current value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Empty,
    User,
    Preset,
    Derived,
}

impl FieldSource {
    pub fn is_authoritative(self) -> bool {
        matches!(self, FieldSource::User | FieldSource::Preset)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub id: String,
    /// Literal text as typed; empty for derived fields
    pub raw_text: String,
    /// Value in the field's selected unit
    pub value: Computed,
    pub unit: Option<String>,
    pub source: FieldSource,
    /// Edit order for authoritative fields, higher is more recent
    stamp: u64,
}

impl FieldState {
    fn blank(&mut self) {
        self.raw_text.clear();
        self.value = Computed::Blank;
        self.source = FieldSource::Empty;
        self.stamp = 0;
    }
}

/// Current values of every field of one calculator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    states: Vec<FieldState>,
    clock: u64,
}

impl FieldSet {
    /// Every field blank, units at their defaults
    pub fn from_spec(spec: &CalculatorSpec) -> Self {
        let states = spec
            .fields
            .iter()
            .map(|def| FieldState {
                id: def.id.clone(),
                raw_text: String::new(),
                value: Computed::Blank,
                unit: def.unit.clone(),
                source: FieldSource::Empty,
                stamp: 0,
            })
            .collect();
        Self { states, clock: 0 }
    }

    pub fn get(&self, id: &str) -> Option<&FieldState> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldState> {
        self.states.iter()
    }

    pub fn value(&self, id: &str) -> Option<f64> {
        self.get(id).and_then(|s| s.value.value())
    }

    fn position(&self, id: &str) -> EngineResult<usize> {
        self.states
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| EngineError::UnknownField(id.to_string()))
    }

    fn state_mut(&mut self, id: &str) -> EngineResult<&mut FieldState> {
        let slot = self.position(id)?;
        Ok(&mut self.states[slot])
    }

    pub fn blank_all(&mut self) {
        self.states.iter_mut().for_each(FieldState::blank);
    }

    /// Records an authoritative value as the most recent edit
    pub fn set_authoritative(&mut self, id: &str, raw_text: String, value: f64, source: FieldSource) -> EngineResult<()> {
        self.clock += 1;
        let stamp = self.clock;
        let state = self.state_mut(id)?;
        state.raw_text = raw_text;
        state.value = Computed::Value(value);
        state.source = source;
        state.stamp = stamp;
        Ok(())
    }

    /// Replaces the value without touching source or edit order
    pub fn set_value(&mut self, id: &str, value: f64) -> EngineResult<()> {
        self.state_mut(id)?.value = Computed::from_f64(value);
        Ok(())
    }

    pub fn set_unit(&mut self, id: &str, unit: &str) -> EngineResult<()> {
        self.state_mut(id)?.unit = Some(unit.to_string());
        Ok(())
    }
}

/// Spec, active mode and unit tables for one solve step
pub struct SolveContext<'a> {
    spec: &'a CalculatorSpec,
    relations: Vec<&'a Relation>,
    active: HashSet<&'a str>,
    conversions: &'a ConversionRegistry,
}

impl<'a> SolveContext<'a> {
    pub fn new(spec: &'a CalculatorSpec, mode: Option<&'a Mode>, conversions: &'a ConversionRegistry) -> Self {
        let active = spec
            .fields
            .iter()
            .filter(|def| mode.map_or(true, |m| m.includes(&def.id)))
            .map(|def| def.id.as_str())
            .collect();
        Self {
            spec,
            relations: spec.active_relations(mode),
            active,
            conversions,
        }
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    fn to_canonical(&self, state: &FieldState, value: f64) -> EngineResult<f64> {
        match (self.spec.field_def(&state.id)?.kind, state.unit.as_deref()) {
            (Some(kind), Some(unit)) => self.conversions.to_canonical(value, unit, kind),
            _ => Ok(value),
        }
    }

    fn from_canonical(&self, state: &FieldState, value: f64) -> EngineResult<f64> {
        match (self.spec.field_def(&state.id)?.kind, state.unit.as_deref()) {
            (Some(kind), Some(unit)) => self.conversions.from_canonical(value, unit, kind),
            _ => Ok(value),
        }
    }
}

/// Applies one edit of `edited` to `current`.
///
/// Non-numeric text only updates the edited field's raw text; empty text
/// applies the calculator's clear policy; a number becomes the field's
/// authoritative value and every other field is re-derived.
pub fn solve(ctx: &SolveContext<'_>, current: &FieldSet, edited: &str, raw_text: &str) -> EngineResult<FieldSet> {
    let def = ctx.spec.field_def(edited)?;
    if def.role == FieldRole::Derived {
        return Err(EngineError::ReadOnlyField(edited.to_string()));
    }
    if !ctx.is_active(edited) {
        return Err(EngineError::InactiveField(edited.to_string()));
    }

    let mut fields = current.clone();

    if raw_text.trim().is_empty() {
        clear(ctx, &mut fields, edited)?;
        return Ok(fields);
    }

    match parse_number(raw_text) {
        Some(value) => {
            fields.set_authoritative(edited, raw_text.to_string(), value, FieldSource::User)?;
            resolve(ctx, &mut fields, Some(edited))?;
        }
        None => {
            // Let the user keep typing ("-", ".", "2e")
            debug!(field = edited, raw = raw_text, "not a number yet, keeping raw text");
            fields.state_mut(edited)?.raw_text = raw_text.to_string();
        }
    }

    Ok(fields)
}

fn clear(ctx: &SolveContext<'_>, fields: &mut FieldSet, edited: &str) -> EngineResult<()> {
    debug!(field = edited, policy = ?ctx.spec.clear_policy, "clearing field");
    match ctx.spec.clear_policy {
        ClearPolicy::Full => fields.blank_all(),
        ClearPolicy::Cascade => {
            fields.state_mut(edited)?.blank();
            // The cleared field stays blank for this step even if it could be re-derived
            resolve_holding(ctx, fields, None, Some(edited))?;
        }
        ClearPolicy::None => fields.state_mut(edited)?.blank(),
    }
    Ok(())
}

/// Re-derives every non-authoritative field from the authoritative ones.
///
/// `edited` ranks first when an invertible relation picks its inputs and is
/// never demoted.
pub fn resolve(ctx: &SolveContext<'_>, fields: &mut FieldSet, edited: Option<&str>) -> EngineResult<()> {
    resolve_holding(ctx, fields, edited, None)
}

fn resolve_holding(
    ctx: &SolveContext<'_>,
    fields: &mut FieldSet,
    edited: Option<&str>,
    held: Option<&str>,
) -> EngineResult<()> {
    // Each round demotes one authoritative field
    loop {
        reset_unsolved(ctx, fields);
        let origins = propagate(ctx, fields, edited, held)?;
        match overdetermined_input(ctx, fields, &origins, edited) {
            Some(slot) => {
                debug!(field = %fields.states[slot].id, "demoting oldest input");
                fields.states[slot].blank();
            }
            None => return Ok(()),
        }
    }
}

fn reset_unsolved(ctx: &SolveContext<'_>, fields: &mut FieldSet) {
    for state in fields.states.iter_mut() {
        if !ctx.is_active(&state.id) {
            state.blank();
        } else if !state.source.is_authoritative() {
            // Half-typed text in an unsolved field survives
            state.value = Computed::Blank;
            state.source = FieldSource::Empty;
            state.stamp = 0;
        }
    }
}

/// How a known value was reached during one propagation pass
#[derive(Debug, Clone)]
struct Origin {
    /// Relation that derived it, `None` for authoritative values
    relation: Option<usize>,
    /// Authoritative fields it was computed from
    roots: BTreeSet<String>,
}

/// Finds an invertible relation fed by more independent knowns than it needs.
///
/// Members derived by the relation itself don't count; every other known
/// member does, including values another relation derived. Returns the
/// weakest authoritative field behind those members, ranked by `authority`.
/// `edited` is never picked.
fn overdetermined_input(
    ctx: &SolveContext<'_>,
    fields: &FieldSet,
    origins: &HashMap<String, Origin>,
    edited: Option<&str>,
) -> Option<usize> {
    for (index, relation) in ctx.relations.iter().enumerate() {
        if !relation.kind.is_invertible() {
            continue;
        }

        let independent: Vec<&Origin> = relation
            .kind
            .members()
            .into_iter()
            .filter_map(|member| origins.get(member))
            .filter(|origin| origin.relation != Some(index))
            .collect();
        if independent.len() <= relation.kind.required_knowns() {
            continue;
        }

        let weakest = independent
            .iter()
            .flat_map(|origin| origin.roots.iter())
            .filter(|root| Some(root.as_str()) != edited)
            .filter_map(|root| fields.position(root).ok())
            .min_by_key(|&slot| authority(&fields.states[slot], edited));
        if weakest.is_some() {
            debug!(relation = %relation.name, "over-determined");
            return weakest;
        }
    }
    None
}

/// Ordering key among known values: edited field, then presets, then edit recency
fn authority(state: &FieldState, edited: Option<&str>) -> (bool, bool, u64) {
    (
        Some(state.id.as_str()) == edited,
        state.source == FieldSource::Preset,
        state.stamp,
    )
}

fn propagate(
    ctx: &SolveContext<'_>,
    fields: &mut FieldSet,
    edited: Option<&str>,
    held: Option<&str>,
) -> EngineResult<HashMap<String, Origin>> {
    let mut known: HashMap<String, f64> = HashMap::new();
    let mut rank: HashMap<String, (bool, bool, u64)> = HashMap::new();
    let mut origins: HashMap<String, Origin> = HashMap::new();
    for state in fields.states.iter() {
        if let Computed::Value(value) = state.value {
            known.insert(state.id.clone(), ctx.to_canonical(state, value)?);
            rank.insert(state.id.clone(), authority(state, edited));
            origins.insert(
                state.id.clone(),
                Origin {
                    relation: None,
                    roots: BTreeSet::from([state.id.clone()]),
                },
            );
        }
    }

    let mut fired = vec![false; ctx.relations.len()];
    loop {
        let mut progressed = false;

        for (index, relation) in ctx.relations.iter().enumerate() {
            if fired[index] {
                continue;
            }

            let pending: Vec<&str> = relation
                .kind
                .outputs()
                .into_iter()
                .filter(|id| Some(*id) != held)
                .filter(|id| ctx.is_active(id) && fields.get(id).is_some_and(|s| s.source == FieldSource::Empty))
                .collect();
            if pending.is_empty() {
                continue;
            }

            let Some(inputs) = select_inputs(relation, &known, &rank) else {
                continue;
            };
            let knowns: Knowns<'_> = inputs.iter().map(|id| (*id, known[*id])).collect();
            let roots: BTreeSet<String> = inputs
                .iter()
                .filter_map(|id| origins.get(*id))
                .flat_map(|origin| origin.roots.iter().cloned())
                .collect();

            for (id, outcome) in relation.kind.solve(&knowns) {
                if !pending.contains(&id.as_str()) {
                    continue;
                }
                let state = fields.state_mut(&id)?;
                state.value = match outcome {
                    Computed::Value(canonical) => {
                        known.insert(id.clone(), canonical);
                        rank.insert(id.clone(), Default::default());
                        origins.insert(
                            id.clone(),
                            Origin {
                                relation: Some(index),
                                roots: roots.clone(),
                            },
                        );
                        Computed::from_f64(ctx.from_canonical(state, canonical)?)
                    }
                    other => other,
                };
                state.raw_text.clear();
                state.source = FieldSource::Derived;
                debug!(relation = %relation.name, field = %id, value = ?state.value, "derived");
            }

            fired[index] = true;
            progressed = true;
        }

        if !progressed {
            break;
        }
    }

    Ok(origins)
}

/// Picks the members a relation solves from, or `None` if underdetermined
fn select_inputs<'r>(
    relation: &'r Relation,
    known: &HashMap<String, f64>,
    rank: &HashMap<String, (bool, bool, u64)>,
) -> Option<Vec<&'r str>> {
    if relation.kind.is_invertible() {
        let mut candidates: Vec<&str> = relation
            .kind
            .members()
            .into_iter()
            .filter(|member| known.contains_key(*member))
            .collect();
        let required = relation.kind.required_knowns();
        if candidates.len() < required {
            return None;
        }
        // Stable sort: equal ranks keep declaration order
        candidates.sort_by_key(|member| Reverse(rank.get(*member).copied().unwrap_or_default()));
        candidates.truncate(required);
        Some(candidates)
    } else {
        let inputs = relation.inputs();
        if inputs.iter().all(|input| known.contains_key(*input)) {
            Some(inputs)
        } else {
            None
        }
    }
}
