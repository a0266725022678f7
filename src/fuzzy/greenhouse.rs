//! The greenhouse universe: sensor and actuator variables, output levels,
//! and the hand-authored default rule sets for both engine modes.

use super::membership::MembershipShape;
use super::rule::{Rule, RuleBase};
use super::variable::FuzzyVariable;

pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";
pub const FAN: &str = "fan";
pub const MIST: &str = "mist";

/// Temperature labels in state-index order
pub const TEMPERATURE_LABELS: [&str; 5] = ["very_cold", "cold", "normal", "warm", "hot"];
/// Humidity labels in state-index order
pub const HUMIDITY_LABELS: [&str; 5] = ["very_dry", "dry", "normal", "humid", "very_humid"];
/// Output labels in action-index order
pub const LEVEL_LABELS: [&str; 3] = ["low", "medium", "high"];

/// Actuator level for a discrete action index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputLevel {
    Low,
    Medium,
    High,
}

impl OutputLevel {
    pub const ALL: [OutputLevel; 3] = [OutputLevel::Low, OutputLevel::Medium, OutputLevel::High];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        LEVEL_LABELS[self.index()]
    }

    /// Crisp actuator value (weighted-average consequent and environment drive)
    pub fn value(&self) -> f64 {
        match self {
            OutputLevel::Low => 20.0,
            OutputLevel::Medium => 50.0,
            OutputLevel::High => 80.0,
        }
    }
}

pub fn temperature() -> FuzzyVariable {
    FuzzyVariable::new(TEMPERATURE, (0.0, 50.0))
        .with_term("very_cold", MembershipShape::trapezoidal(0.0, 0.0, 5.0, 10.0))
        .with_term("cold", MembershipShape::triangular(5.0, 10.0, 20.0))
        .with_term("normal", MembershipShape::triangular(15.0, 25.0, 35.0))
        .with_term("warm", MembershipShape::triangular(30.0, 35.0, 40.0))
        .with_term("hot", MembershipShape::trapezoidal(35.0, 40.0, 50.0, 50.0))
}

pub fn humidity() -> FuzzyVariable {
    FuzzyVariable::new(HUMIDITY, (0.0, 100.0))
        .with_term("very_dry", MembershipShape::trapezoidal(0.0, 0.0, 10.0, 20.0))
        .with_term("dry", MembershipShape::triangular(10.0, 30.0, 50.0))
        .with_term("normal", MembershipShape::triangular(40.0, 55.0, 70.0))
        .with_term("humid", MembershipShape::triangular(60.0, 75.0, 90.0))
        .with_term("very_humid", MembershipShape::trapezoidal(80.0, 90.0, 100.0, 100.0))
}

/// Actuator variable with the Mamdani output shapes
fn actuator(name: &str) -> FuzzyVariable {
    FuzzyVariable::new(name, (0.0, 100.0))
        .with_term("low", MembershipShape::triangular(0.0, 0.0, 40.0))
        .with_term("medium", MembershipShape::triangular(30.0, 50.0, 70.0))
        .with_term("high", MembershipShape::triangular(60.0, 100.0, 100.0))
}

pub fn fan() -> FuzzyVariable {
    actuator(FAN)
}

pub fn mist() -> FuzzyVariable {
    actuator(MIST)
}

/// Default Mamdani rules: temperature drives the fan, humidity drives the mist.
pub fn default_mamdani_rules() -> RuleBase {
    RuleBase::new(vec![
        Rule::when(TEMPERATURE, "hot").then_label(FAN, "high"),
        Rule::when(TEMPERATURE, "warm").then_label(FAN, "medium"),
        Rule::when(TEMPERATURE, "normal").then_label(FAN, "low"),
        Rule::when(TEMPERATURE, "cold").then_label(FAN, "low"),
        Rule::when(TEMPERATURE, "very_cold").then_label(FAN, "low"),
        Rule::when(HUMIDITY, "very_dry").then_label(MIST, "high"),
        Rule::when(HUMIDITY, "dry").then_label(MIST, "medium"),
        Rule::when(HUMIDITY, "normal").then_label(MIST, "low"),
        Rule::when(HUMIDITY, "humid").then_label(MIST, "low"),
        Rule::when(HUMIDITY, "very_humid").then_label(MIST, "low"),
    ])
}

/// Default weighted-average rules. Very cold temperatures assign no fan value.
pub fn default_sugeno_rules() -> RuleBase {
    use OutputLevel::*;
    RuleBase::new(vec![
        Rule::when(TEMPERATURE, "hot").then_constant(FAN, High.value()),
        Rule::when(TEMPERATURE, "warm").then_constant(FAN, Medium.value()),
        Rule::when(TEMPERATURE, "normal").then_constant(FAN, Low.value()),
        Rule::when(TEMPERATURE, "cold").then_constant(FAN, Low.value()),
        Rule::when(HUMIDITY, "very_dry").then_constant(MIST, High.value()),
        Rule::when(HUMIDITY, "dry").then_constant(MIST, Medium.value()),
        Rule::when(HUMIDITY, "normal").then_constant(MIST, Low.value()),
        Rule::when(HUMIDITY, "humid").then_constant(MIST, Low.value()),
        Rule::when(HUMIDITY, "very_humid").then_constant(MIST, Low.value()),
    ])
}
