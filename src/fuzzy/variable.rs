//! Linguistic variables: a bounded universe plus an ordered set of labelled shapes

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::membership::{FuzzyValue, MembershipShape};

/// A named continuous domain with labelled membership shapes.
///
/// Labels keep their insertion order; that order is the label index used for
/// state discretization and tie-breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyVariable {
    /// Variable name (e.g., "temperature")
    pub name: String,
    /// Universe of discourse
    pub universe: (f64, f64),
    /// Labelled shapes in declaration order
    pub terms: IndexMap<String, MembershipShape>,
}

impl FuzzyVariable {
    pub fn new(name: impl Into<String>, universe: (f64, f64)) -> Self {
        let (lo, hi) = universe;
        Self {
            name: name.into(),
            universe: (lo.min(hi), lo.max(hi)),
            terms: IndexMap::new(),
        }
    }

    /// Builder form of [`add_term`](Self::add_term)
    pub fn with_term(mut self, label: impl Into<String>, shape: MembershipShape) -> Self {
        self.add_term(label, shape);
        self
    }

    /// Add a term. Re-adding an existing label replaces its shape in place.
    pub fn add_term(&mut self, label: impl Into<String>, shape: MembershipShape) {
        self.terms.insert(label.into(), shape);
    }

    pub fn min(&self) -> f64 {
        self.universe.0
    }

    pub fn max(&self) -> f64 {
        self.universe.1
    }

    /// Clamp an input to the declared domain. NaN maps to the lower bound.
    pub fn clamp(&self, x: f64) -> f64 {
        if x.is_nan() {
            return self.universe.0;
        }
        x.clamp(self.universe.0, self.universe.1)
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.universe.0 && x <= self.universe.1
    }

    pub fn shape(&self, label: &str) -> Option<&MembershipShape> {
        self.terms.get(label)
    }

    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.terms.get_index_of(label)
    }

    pub fn label_at(&self, index: usize) -> Option<&str> {
        self.terms.get_index(index).map(|(label, _)| label.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Degree of `label` at `x` (clamped to the domain first)
    pub fn degree(&self, label: &str, x: f64) -> Option<FuzzyValue> {
        let x = self.clamp(x);
        self.terms.get(label).map(|shape| shape.evaluate(x))
    }

    /// Fuzzify a crisp value - membership for all labels, in label order
    pub fn membership_vector(&self, x: f64) -> IndexMap<String, FuzzyValue> {
        let x = self.clamp(x);
        self.terms
            .iter()
            .map(|(label, shape)| (label.clone(), shape.evaluate(x)))
            .collect()
    }

    /// Index of the label with the highest membership; ties go to the lowest index.
    pub fn dominant_index(&self, x: f64) -> usize {
        let x = self.clamp(x);
        let mut best = 0;
        let mut best_degree = f64::NEG_INFINITY;
        for (idx, shape) in self.terms.values().enumerate() {
            let degree = shape.evaluate(x).value();
            if degree > best_degree {
                best = idx;
                best_degree = degree;
            }
        }
        best
    }

    /// Get the label with highest membership for a value
    pub fn dominant_term(&self, x: f64) -> Option<(&str, FuzzyValue)> {
        if self.terms.is_empty() {
            return None;
        }
        let idx = self.dominant_index(x);
        self.terms
            .get_index(idx)
            .map(|(label, shape)| (label.as_str(), shape.evaluate(self.clamp(x))))
    }

    /// Discretized universe `min, min + step, ..., max` (max always included).
    pub fn universe_grid(&self, step: f64) -> Vec<f64> {
        let (lo, hi) = self.universe;
        if !(step > 0.0) || hi <= lo {
            return vec![lo];
        }
        let count = ((hi - lo) / step + 1e-9).floor() as usize;
        let mut grid: Vec<f64> = (0..=count).map(|i| lo + i as f64 * step).collect();
        if let Some(last) = grid.last() {
            if (hi - *last).abs() > 1e-9 {
                grid.push(hi);
            }
        }
        grid
    }
}
