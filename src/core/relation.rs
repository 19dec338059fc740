//! Relations linking a calculator's fields
//!
//! Uses enum_dispatch for static dispatch over the closed set of relation
//! kinds. Every relation works on canonical-unit values; the solver handles
//! unit scaling around it.
//!
//! Invertible relations resolve any member once `required_knowns` other
//! members are known, each known combination having its own closed-form
//! rearrangement. One-directional relations compute their outputs from a
//! fixed input list and never the reverse.

use crate::core::presets::ThresholdTable;
use enum_dispatch::enum_dispatch;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Outcome of evaluating one member of a relation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Computed {
    Value(f64),
    /// Undetermined, or a zero/undefined denominator
    Blank,
    /// Outside the relation's domain (e.g. logarithm of a non-positive number)
    Undefined,
}

impl Computed {
    /// Non-finite results collapse to blank
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Computed::Value(value)
        } else {
            Computed::Blank
        }
    }

    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Computed::Blank
        } else {
            Computed::from_f64(numerator / denominator)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Computed::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn and_then(self, f: impl FnOnce(f64) -> Computed) -> Computed {
        match self {
            Computed::Value(v) => f(v),
            other => other,
        }
    }
}

/// Known member values handed to a relation, canonical units
pub type Knowns<'a> = HashMap<&'a str, f64>;

#[enum_dispatch]
pub trait RelationSolver {
    /// Every field this relation links
    fn members(&self) -> Vec<&str>;

    /// Members this relation may write
    fn outputs(&self) -> Vec<&str> {
        self.members()
    }

    fn is_invertible(&self) -> bool {
        true
    }

    /// How many known members determine the rest
    fn required_knowns(&self) -> usize {
        2
    }

    /// Evaluates the members missing from `known`.
    ///
    /// `known` holds exactly `required_knowns` members for invertible
    /// relations and every input for one-directional ones.
    fn solve(&self, known: &Knowns<'_>) -> Vec<(String, Computed)>;
}

/// `product = scale · left · right`
#[derive(Debug, Clone)]
pub struct Product {
    pub product: String,
    pub left: String,
    pub right: String,
    pub scale: f64,
}

impl Product {
    pub fn new(product: &str, left: &str, right: &str) -> Self {
        Self {
            product: product.to_string(),
            left: left.to_string(),
            right: right.to_string(),
            scale: 1.0,
        }
    }

    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

impl RelationSolver for Product {
    fn members(&self) -> Vec<&str> {
        vec![self.product.as_str(), self.left.as_str(), self.right.as_str()]
    }

    fn solve(&self, known: &Knowns<'_>) -> Vec<(String, Computed)> {
        let p = known.get(self.product.as_str()).copied();
        let l = known.get(self.left.as_str()).copied();
        let r = known.get(self.right.as_str()).copied();

        match (p, l, r) {
            (None, Some(l), Some(r)) => vec![(self.product.clone(), Computed::from_f64(self.scale * l * r))],
            (Some(p), Some(l), None) => vec![(self.right.clone(), Computed::ratio(p, self.scale * l))],
            (Some(p), None, Some(r)) => vec![(self.left.clone(), Computed::ratio(p, self.scale * r))],
            _ => Vec::new(),
        }
    }
}

/// `total = left + right`
#[derive(Debug, Clone)]
pub struct Sum {
    pub total: String,
    pub left: String,
    pub right: String,
}

impl Sum {
    pub fn new(total: &str, left: &str, right: &str) -> Self {
        Self {
            total: total.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

impl RelationSolver for Sum {
    fn members(&self) -> Vec<&str> {
        vec![self.total.as_str(), self.left.as_str(), self.right.as_str()]
    }

    fn solve(&self, known: &Knowns<'_>) -> Vec<(String, Computed)> {
        let t = known.get(self.total.as_str()).copied();
        let l = known.get(self.left.as_str()).copied();
        let r = known.get(self.right.as_str()).copied();

        match (t, l, r) {
            (None, Some(l), Some(r)) => vec![(self.total.clone(), Computed::from_f64(l + r))],
            (Some(t), Some(l), None) => vec![(self.right.clone(), Computed::from_f64(t - l))],
            (Some(t), None, Some(r)) => vec![(self.left.clone(), Computed::from_f64(t - r))],
            _ => Vec::new(),
        }
    }
}

/// All members hold the same quantity, shown in different units.
///
/// Member `i` reads `weights[i] · q` in canonical units, which links
/// quantities of different kinds through a fixed factor (mass and volume of
/// one ingredient).
#[derive(Debug, Clone)]
pub struct Equivalence {
    pub fields: Vec<String>,
    pub weights: Vec<f64>,
}

impl Equivalence {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            weights: vec![1.0; fields.len()],
        }
    }

    pub fn weighted(members: &[(&str, f64)]) -> Self {
        Self {
            fields: members.iter().map(|(f, _)| f.to_string()).collect(),
            weights: members.iter().map(|(_, w)| *w).collect(),
        }
    }
}

impl RelationSolver for Equivalence {
    fn members(&self) -> Vec<&str> {
        self.fields.iter().map(String::as_str).collect()
    }

    fn required_knowns(&self) -> usize {
        1
    }

    fn solve(&self, known: &Knowns<'_>) -> Vec<(String, Computed)> {
        let members = || self.fields.iter().zip(self.weights.iter().copied());
        let Some(quantity) = members().find_map(|(f, w)| known.get(f.as_str()).map(|v| Computed::ratio(*v, w))) else {
            return Vec::new();
        };
        members()
            .filter(|(f, _)| !known.contains_key(f.as_str()))
            .map(|(f, w)| (f.clone(), quantity.and_then(|q| Computed::from_f64(q * w))))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Increase => 1.0,
            Direction::Decrease => -1.0,
        }
    }
}

/// `result = initial · (1 ± percent / 100)`
#[derive(Debug, Clone)]
pub struct PercentChange {
    pub initial: String,
    pub percent: String,
    pub result: String,
    pub direction: Direction,
}

impl PercentChange {
    pub fn new(initial: &str, percent: &str, result: &str, direction: Direction) -> Self {
        Self {
            initial: initial.to_string(),
            percent: percent.to_string(),
            result: result.to_string(),
            direction,
        }
    }
}

impl RelationSolver for PercentChange {
    fn members(&self) -> Vec<&str> {
        vec![self.initial.as_str(), self.percent.as_str(), self.result.as_str()]
    }

    fn solve(&self, known: &Knowns<'_>) -> Vec<(String, Computed)> {
        let sign = self.direction.sign();
        let i = known.get(self.initial.as_str()).copied();
        let p = known.get(self.percent.as_str()).copied();
        let r = known.get(self.result.as_str()).copied();

        match (i, p, r) {
            (Some(i), Some(p), None) => {
                vec![(self.result.clone(), Computed::from_f64(i * (1.0 + sign * p / 100.0)))]
            }
            (Some(i), None, Some(r)) => {
                let percent = Computed::ratio(r, i).and_then(|ratio| Computed::from_f64(sign * (ratio - 1.0) * 100.0));
                vec![(self.percent.clone(), percent)]
            }
            (None, Some(p), Some(r)) => {
                vec![(self.initial.clone(), Computed::ratio(r, 1.0 + sign * p / 100.0))]
            }
            _ => Vec::new(),
        }
    }
}

/// `{first, second, point_diff = second - first, percent_diff = point_diff / first · 100}`
#[derive(Debug, Clone)]
pub struct PercentagePoint {
    pub first: String,
    pub second: String,
    pub point_diff: String,
    pub percent_diff: String,
}

impl PercentagePoint {
    pub fn new(first: &str, second: &str, point_diff: &str, percent_diff: &str) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
            point_diff: point_diff.to_string(),
            percent_diff: percent_diff.to_string(),
        }
    }

    fn relative(point_diff: f64, first: f64) -> Computed {
        Computed::ratio(point_diff * 100.0, first)
    }
}

impl RelationSolver for PercentagePoint {
    fn members(&self) -> Vec<&str> {
        vec![self.first.as_str(), self.second.as_str(), self.point_diff.as_str(), self.percent_diff.as_str()]
    }

    fn solve(&self, known: &Knowns<'_>) -> Vec<(String, Computed)> {
        let p1 = known.get(self.first.as_str()).copied();
        let p2 = known.get(self.second.as_str()).copied();
        let pp = known.get(self.point_diff.as_str()).copied();
        let pct = known.get(self.percent_diff.as_str()).copied();

        let (first, second, point_diff, percent_diff) = match (p1, p2, pp, pct) {
            (Some(p1), Some(p2), None, None) => {
                let pp = p2 - p1;
                (None, None, Some(Computed::from_f64(pp)), Some(Self::relative(pp, p1)))
            }
            (Some(p1), None, Some(pp), None) => {
                (None, Some(Computed::from_f64(p1 + pp)), None, Some(Self::relative(pp, p1)))
            }
            (Some(p1), None, None, Some(pct)) => {
                let pp = p1 * pct / 100.0;
                (None, Some(Computed::from_f64(p1 + pp)), Some(Computed::from_f64(pp)), None)
            }
            (None, Some(p2), Some(pp), None) => {
                let p1 = p2 - pp;
                (Some(Computed::from_f64(p1)), None, None, Some(Self::relative(pp, p1)))
            }
            (None, Some(p2), None, Some(pct)) => {
                let p1 = Computed::ratio(p2, 1.0 + pct / 100.0);
                let pp = p1.and_then(|p1| Computed::from_f64(p2 - p1));
                (Some(p1), None, Some(pp), None)
            }
            (None, None, Some(pp), Some(pct)) => {
                let p1 = Computed::ratio(pp * 100.0, pct);
                let p2 = p1.and_then(|p1| Computed::from_f64(p1 + pp));
                (Some(p1), Some(p2), None, None)
            }
            _ => return Vec::new(),
        };

        [
            (&self.first, first),
            (&self.second, second),
            (&self.point_diff, point_diff),
            (&self.percent_diff, percent_diff),
        ]
        .into_iter()
        .filter_map(|(id, value)| value.map(|v| (id.clone(), v)))
        .collect()
    }
}

/// `result = log_base(argument)`
#[derive(Debug, Clone)]
pub struct Logarithm {
    pub base: String,
    pub argument: String,
    pub result: String,
}

impl Logarithm {
    pub fn new(base: &str, argument: &str, result: &str) -> Self {
        Self {
            base: base.to_string(),
            argument: argument.to_string(),
            result: result.to_string(),
        }
    }
}

impl RelationSolver for Logarithm {
    fn members(&self) -> Vec<&str> {
        vec![self.base.as_str(), self.argument.as_str(), self.result.as_str()]
    }

    fn solve(&self, known: &Knowns<'_>) -> Vec<(String, Computed)> {
        let b = known.get(self.base.as_str()).copied();
        let x = known.get(self.argument.as_str()).copied();
        let y = known.get(self.result.as_str()).copied();

        match (b, x, y) {
            (Some(b), Some(x), None) => {
                let result = if b <= 0.0 || x <= 0.0 {
                    Computed::Undefined
                } else {
                    // Base 1 has a zero denominator
                    Computed::ratio(x.ln(), b.ln())
                };
                vec![(self.result.clone(), result)]
            }
            (Some(b), None, Some(y)) => {
                let argument = if b <= 0.0 { Computed::Undefined } else { Computed::from_f64(b.powf(y)) };
                vec![(self.argument.clone(), argument)]
            }
            (None, Some(x), Some(y)) => {
                let base = if x <= 0.0 {
                    Computed::Undefined
                } else {
                    Computed::ratio(1.0, y).and_then(|exponent| Computed::from_f64(x.powf(exponent)))
                };
                vec![(self.base.clone(), base)]
            }
            _ => Vec::new(),
        }
    }
}

/// Formula body: input values in declaration order
pub type FormulaFn = fn(&[f64]) -> Computed;

/// One-directional `output = f(inputs)`
#[derive(Clone)]
pub struct Formula {
    pub output: String,
    pub inputs: Vec<String>,
    pub eval: FormulaFn,
}

impl Formula {
    pub fn new(output: &str, inputs: &[&str], eval: FormulaFn) -> Self {
        Self {
            output: output.to_string(),
            inputs: inputs.iter().map(|i| i.to_string()).collect(),
            eval,
        }
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula")
            .field("output", &self.output)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

impl RelationSolver for Formula {
    fn members(&self) -> Vec<&str> {
        let mut members: Vec<&str> = self.inputs.iter().map(String::as_str).collect();
        members.push(self.output.as_str());
        members
    }

    fn outputs(&self) -> Vec<&str> {
        vec![self.output.as_str()]
    }

    fn is_invertible(&self) -> bool {
        false
    }

    fn required_knowns(&self) -> usize {
        self.inputs.len()
    }

    fn solve(&self, known: &Knowns<'_>) -> Vec<(String, Computed)> {
        let values: Option<Vec<f64>> = self
            .inputs
            .iter()
            .map(|input| known.get(input.as_str()).copied())
            .collect();
        match values {
            Some(values) => vec![(self.output.clone(), (self.eval)(&values))],
            None => Vec::new(),
        }
    }
}

/// One-directional threshold-band lookup, `output = bands(input)`
#[derive(Debug, Clone)]
pub struct Lookup {
    pub input: String,
    pub output: String,
    pub table: Arc<ThresholdTable>,
}

impl Lookup {
    pub fn new(input: &str, output: &str, table: Arc<ThresholdTable>) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            table,
        }
    }
}

impl RelationSolver for Lookup {
    fn members(&self) -> Vec<&str> {
        vec![self.input.as_str(), self.output.as_str()]
    }

    fn outputs(&self) -> Vec<&str> {
        vec![self.output.as_str()]
    }

    fn is_invertible(&self) -> bool {
        false
    }

    fn required_knowns(&self) -> usize {
        1
    }

    fn solve(&self, known: &Knowns<'_>) -> Vec<(String, Computed)> {
        let Some(input) = known.get(self.input.as_str()).copied() else {
            return Vec::new();
        };
        // Input below the floor band has no scaled value
        let value = self.table.lookup(input).map(Computed::from_f64).unwrap_or(Computed::Blank);
        vec![(self.output.clone(), value)]
    }
}

#[enum_dispatch(RelationSolver)]
#[derive(Debug, Clone)]
pub enum RelationKind {
    Product(Product),
    Sum(Sum),
    Equivalence(Equivalence),
    PercentChange(PercentChange),
    PercentagePoint(PercentagePoint),
    Logarithm(Logarithm),
    Formula(Formula),
    Lookup(Lookup),
}

/// A named relation as declared by a calculator
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
}

impl Relation {
    pub fn new(name: &str, kind: impl Into<RelationKind>) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.into(),
        }
    }

    /// Members that are read but never written
    pub fn inputs(&self) -> Vec<&str> {
        let outputs = self.kind.outputs();
        self.kind
            .members()
            .into_iter()
            .filter(|member| !outputs.contains(member))
            .collect()
    }
}
