//! Rule synthesis from a learned action-value table

use crate::error::{ErrorCode, GreenhouseResult};
use crate::fuzzy::greenhouse::{self, OutputLevel, FAN, HUMIDITY, MIST, TEMPERATURE};
use crate::fuzzy::rule::{Rule, RuleBase};
use crate::fuzzy::variable::FuzzyVariable;

use super::table::{ActionValueTable, DiscreteState, FAN_LEVELS, HUMIDITY_STATES, TEMPERATURE_STATES};

/// Turns the greedy policy of a table into a weighted-average rule base.
///
/// One rule per (temperature label, humidity label) pair:
/// `IF temperature IS t AND humidity IS h THEN fan IS c(fan), mist IS c(mist)`
/// where `c` maps the greedy level index to its crisp value.
#[derive(Debug, Clone)]
pub struct RuleEvolver {
    temperature: (String, Vec<String>),
    humidity: (String, Vec<String>),
    levels: [f64; FAN_LEVELS],
}

impl RuleEvolver {
    /// Evolver over arbitrary input variables. Their label counts must match
    /// the table's state dimensions.
    pub fn new(
        temperature: &FuzzyVariable,
        humidity: &FuzzyVariable,
        levels: [f64; FAN_LEVELS],
    ) -> GreenhouseResult<Self> {
        Ok(Self {
            temperature: Self::labels_of(temperature, TEMPERATURE_STATES)?,
            humidity: Self::labels_of(humidity, HUMIDITY_STATES)?,
            levels,
        })
    }

    /// Greenhouse variables and the low/medium/high constants
    pub fn greenhouse() -> Self {
        let labels = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            temperature: (TEMPERATURE.to_string(), labels(greenhouse::TEMPERATURE_LABELS.as_slice())),
            humidity: (HUMIDITY.to_string(), labels(greenhouse::HUMIDITY_LABELS.as_slice())),
            levels: OutputLevel::ALL.map(|level| level.value()),
        }
    }

    fn labels_of(variable: &FuzzyVariable, expected: usize) -> GreenhouseResult<(String, Vec<String>)> {
        crate::greenhouse_ensure!(
            variable.len() == expected,
            ErrorCode::InferenceError,
            "variable '{}' has {} labels, the table expects {}",
            variable.name,
            variable.len(),
            expected
        );
        Ok((
            variable.name.clone(),
            variable.labels().map(String::from).collect(),
        ))
    }

    /// Synthesize the full replacement rule base. Does not modify the table.
    pub fn evolve(&self, table: &ActionValueTable) -> RuleBase {
        let (t_name, t_labels) = &self.temperature;
        let (h_name, h_labels) = &self.humidity;

        let rules: Vec<Rule> = DiscreteState::all()
            .map(|state| {
                let action = table.best_action(state);
                Rule::when(t_name.as_str(), t_labels[state.temperature].as_str())
                    .and(h_name.as_str(), h_labels[state.humidity].as_str())
                    .then_constant(FAN, self.levels[action.fan])
                    .then_constant(MIST, self.levels[action.mist])
            })
            .collect();

        log::debug!("evolved {} rules from action-value table", rules.len());
        RuleBase::new(rules)
    }
}

impl Default for RuleEvolver {
    fn default() -> Self {
        Self::greenhouse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::engine::{InferenceEngine, SugenoEngine};
    use crate::fuzzy::rule::Consequent;
    use crate::learning::table::Action;
    use std::collections::HashSet;

    #[test]
    fn test_zero_table_gives_25_low_rules() {
        let base = RuleEvolver::greenhouse().evolve(&ActionValueTable::zeros());
        assert_eq!(base.len(), 25);
        for rule in &base {
            assert_eq!(rule.consequent(FAN), Some(&Consequent::Constant(20.0)));
            assert_eq!(rule.consequent(MIST), Some(&Consequent::Constant(20.0)));
            assert_eq!(rule.antecedents.len(), 2);
        }
    }

    #[test]
    fn test_covers_every_label_pair_once() {
        let base = RuleEvolver::greenhouse().evolve(&ActionValueTable::zeros());
        let pairs: HashSet<(String, String)> = base
            .iter()
            .map(|rule| (rule.antecedents[0].label.clone(), rule.antecedents[1].label.clone()))
            .collect();
        assert_eq!(pairs.len(), 25);
        for t in greenhouse::TEMPERATURE_LABELS {
            for h in greenhouse::HUMIDITY_LABELS {
                assert!(pairs.contains(&(t.to_string(), h.to_string())));
            }
        }
    }

    #[test]
    fn test_greedy_action_becomes_consequent() {
        let mut table = ActionValueTable::zeros();
        // hot (4) and dry (1)
        let state = DiscreteState::new(4, 1);
        table.set(state, Action::new(2, 1), 3.0);
        let before = table.clone();

        let base = RuleEvolver::greenhouse().evolve(&table);
        assert_eq!(table, before);

        let rule = &base.rules()[4 * 5 + 1];
        assert_eq!(
            rule.to_string(),
            "IF temperature IS hot AND humidity IS dry THEN fan IS 80, mist IS 50"
        );
    }

    #[test]
    fn test_evolved_rules_replace_defaults() {
        let mut table = ActionValueTable::zeros();
        table.set(DiscreteState::new(4, 2), Action::new(0, 2), 1.0);
        let engine = SugenoEngine::greenhouse();
        engine.set_rules(RuleEvolver::greenhouse().evolve(&table));

        assert_eq!(engine.rules().len(), 25);
        // hot + normal now maps to fan low, mist high
        let out = engine.compute(45.0, 55.0);
        assert_eq!(out.fan, 20.0);
        assert_eq!(out.mist, 80.0);
    }

    #[test]
    fn test_label_count_mismatch_rejected() {
        let short = FuzzyVariable::new("temperature", (0.0, 50.0));
        let err = RuleEvolver::new(&short, &greenhouse::humidity(), [20.0, 50.0, 80.0]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InferenceError);
        assert!(RuleEvolver::new(&greenhouse::temperature(), &greenhouse::humidity(), [1.0, 2.0, 3.0]).is_ok());
    }
}
