//! Fuzzy rules and rule bases

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::membership::FuzzyValue;
use super::variable::FuzzyVariable;
use crate::error::{GreenhouseError, GreenhouseResult};

/// A rule antecedent term: `variable IS label`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Antecedent {
    pub variable: String,
    pub label: String,
}

impl Antecedent {
    pub fn new(variable: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            label: label.into(),
        }
    }
}

/// Rule consequent for one output variable.
///
/// Mamdani engines read `Label`, weighted-average engines read `Constant`;
/// the two kinds are never converted into each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consequent {
    /// Fuzzy output label
    Label(String),
    /// Crisp output value
    Constant(f64),
}

impl fmt::Display for Consequent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Consequent::Label(label) => write!(f, "{}", label),
            Consequent::Constant(value) => write!(f, "{}", value),
        }
    }
}

/// A fuzzy rule: conjunctive antecedent, one consequent per output variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Antecedents (ANDed together)
    pub antecedents: Vec<Antecedent>,
    /// Output variable -> consequent
    pub consequents: IndexMap<String, Consequent>,
}

impl Rule {
    pub fn new(antecedents: Vec<Antecedent>, consequents: IndexMap<String, Consequent>) -> Self {
        Self {
            antecedents,
            consequents,
        }
    }

    /// Start a rule with a single antecedent term
    pub fn when(variable: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            antecedents: vec![Antecedent::new(variable, label)],
            consequents: IndexMap::new(),
        }
    }

    /// Add another antecedent term (AND)
    pub fn and(mut self, variable: impl Into<String>, label: impl Into<String>) -> Self {
        self.antecedents.push(Antecedent::new(variable, label));
        self
    }

    /// Assign a fuzzy output label
    pub fn then_label(mut self, output: impl Into<String>, label: impl Into<String>) -> Self {
        self.consequents
            .insert(output.into(), Consequent::Label(label.into()));
        self
    }

    /// Assign a crisp output value
    pub fn then_constant(mut self, output: impl Into<String>, value: f64) -> Self {
        self.consequents
            .insert(output.into(), Consequent::Constant(value));
        self
    }

    pub fn consequent(&self, output: &str) -> Option<&Consequent> {
        self.consequents.get(output)
    }

    /// Minimum membership across the antecedent terms.
    ///
    /// Each input is clamped to its variable's domain before evaluation.
    /// Repeated terms on the same variable are ANDed like any other term.
    pub fn firing_strength(&self, inputs: &[(&FuzzyVariable, f64)]) -> GreenhouseResult<FuzzyValue> {
        if self.antecedents.is_empty() {
            return Err(GreenhouseError::empty_antecedent());
        }

        let mut strength = FuzzyValue::ONE;
        for term in &self.antecedents {
            let (variable, value) = inputs
                .iter()
                .find(|(var, _)| var.name == term.variable)
                .ok_or_else(|| GreenhouseError::unknown_variable(&term.variable))?;
            let degree = variable
                .degree(&term.label, *value)
                .ok_or_else(|| GreenhouseError::unknown_label(&term.variable, &term.label))?;
            strength = strength.and(&degree);
        }
        Ok(strength)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IF ")?;
        for (i, term) in self.antecedents.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{} IS {}", term.variable, term.label)?;
        }
        write!(f, " THEN ")?;
        for (i, (output, consequent)) in self.consequents.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} IS {}", output, consequent)?;
        }
        Ok(())
    }
}

/// An immutable, ordered collection of rules.
///
/// Rule bases are replaced wholesale; cloning shares the underlying rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBase {
    rules: Arc<[Rule]>,
}

impl Default for RuleBase {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RuleBase {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules that assign a consequent to `output`
    pub fn for_output<'a>(&'a self, output: &'a str) -> impl Iterator<Item = (&'a Rule, &'a Consequent)> + 'a {
        self.rules
            .iter()
            .filter_map(move |rule| rule.consequent(output).map(|c| (rule, c)))
    }
}

impl From<Vec<Rule>> for RuleBase {
    fn from(rules: Vec<Rule>) -> Self {
        Self::new(rules)
    }
}

impl<'a> IntoIterator for &'a RuleBase {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for RuleBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rule) in self.rules.iter().enumerate() {
            writeln!(f, "{:>3}. {}", i + 1, rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::fuzzy::membership::MembershipShape;

    fn humidity() -> FuzzyVariable {
        FuzzyVariable::new("humidity", (0.0, 100.0))
            .with_term("dry", MembershipShape::triangular(10.0, 30.0, 50.0))
            .with_term("normal", MembershipShape::triangular(40.0, 55.0, 70.0))
    }

    fn temperature() -> FuzzyVariable {
        FuzzyVariable::new("temperature", (0.0, 50.0))
            .with_term("warm", MembershipShape::triangular(30.0, 35.0, 40.0))
            .with_term("hot", MembershipShape::trapezoidal(35.0, 40.0, 50.0, 50.0))
    }

    #[test]
    fn test_firing_strength_is_min() {
        let (t, h) = (temperature(), humidity());
        let rule = Rule::when("temperature", "hot")
            .and("humidity", "normal")
            .then_constant("fan", 80.0);

        let strength = rule.firing_strength(&[(&t, 40.0), (&h, 50.0)]).unwrap();
        assert!((strength.value() - 10.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_variable_terms_use_min() {
        let t = temperature();
        let rule = Rule::when("temperature", "warm")
            .and("temperature", "hot")
            .then_constant("fan", 50.0);
        let strength = rule.firing_strength(&[(&t, 38.0)]).unwrap();
        // warm(38) = 0.4, hot(38) = 0.6
        assert!((strength.value() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_empty_antecedent_rejected() {
        let rule = Rule::new(Vec::new(), IndexMap::new());
        let err = rule.firing_strength(&[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyAntecedent);
    }

    #[test]
    fn test_unknown_references() {
        let t = temperature();
        let err = Rule::when("pressure", "high").firing_strength(&[(&t, 20.0)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownVariable);

        let err = Rule::when("temperature", "freezing").firing_strength(&[(&t, 20.0)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownLabel);
    }

    #[test]
    fn test_rule_display() {
        let rule = Rule::when("temperature", "hot")
            .and("humidity", "normal")
            .then_constant("fan", 80.0)
            .then_constant("mist", 20.0);
        assert_eq!(
            rule.to_string(),
            "IF temperature IS hot AND humidity IS normal THEN fan IS 80, mist IS 20"
        );
    }

    #[test]
    fn test_rule_base_for_output() {
        let base = RuleBase::new(vec![
            Rule::when("temperature", "hot").then_label("fan", "high"),
            Rule::when("humidity", "dry").then_label("mist", "medium"),
        ]);
        assert_eq!(base.len(), 2);
        assert_eq!(base.for_output("fan").count(), 1);
        assert_eq!(base.for_output("mist").count(), 1);
        assert_eq!(base.for_output("heater").count(), 0);
        assert!(RuleBase::empty().is_empty());
    }
}
