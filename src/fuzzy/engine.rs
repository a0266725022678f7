//! Fuzzy inference engines
//!
//! Two engines share the [`InferenceEngine`] contract:
//!
//! - [`MamdaniEngine`]: min implication, max aggregation, centroid defuzzification
//!   over a fixed grid of the output universe
//! - [`SugenoEngine`]: constant consequents combined by firing-strength weighted average
//!
//! Both hold their current [`RuleBase`] as an immutable snapshot. `set_rules`
//! publishes a fully built base in one swap; an inference call clones the
//! snapshot once and evaluates against it, so it never sees a mix of old and
//! new rules.
//!
//! ```text
//!   (temperature, humidity)
//!            │ clamp to domain
//!            ▼
//!   firing strength per rule (AND = min)
//!            │
//!     ┌──────┴───────┐
//!     ▼              ▼
//!  Mamdani        Sugeno
//!  clip/max/      Σ w·c / Σ w
//!  centroid
//!     └──────┬───────┘
//!            ▼
//!   ControlOutput { fan, mist }   (0.0 on NoRuleFired / EmptyRuleBase)
//! ```

use std::fmt;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::greenhouse;
use super::membership::FuzzyValue;
use super::rule::{Consequent, RuleBase};
use super::variable::FuzzyVariable;
use crate::error::{ErrorCode, GreenhouseError, GreenhouseResult};

/// Inference semantics selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    Mamdani,
    #[default]
    Sugeno,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::Mamdani => "mamdani",
            EngineMode::Sugeno => "sugeno",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mamdani" | "m" => Some(EngineMode::Mamdani),
            "sugeno" | "weighted-average" | "weighted_average" | "s" => Some(EngineMode::Sugeno),
            _ => None,
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crisp actuator command
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlOutput {
    pub fan: f64,
    pub mist: f64,
}

/// Per-channel inference results before the fallback is applied
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelResults {
    pub fan: GreenhouseResult<f64>,
    pub mist: GreenhouseResult<f64>,
}

impl ChannelResults {
    fn both_failed(err: GreenhouseError) -> Self {
        Self {
            fan: Err(err.clone()),
            mist: Err(err),
        }
    }
}

/// Input and output variables an engine evaluates rules against
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerModel {
    pub temperature: FuzzyVariable,
    pub humidity: FuzzyVariable,
    pub fan: FuzzyVariable,
    pub mist: FuzzyVariable,
}

impl ControllerModel {
    /// The greenhouse sensor/actuator variables
    pub fn greenhouse() -> Self {
        Self {
            temperature: greenhouse::temperature(),
            humidity: greenhouse::humidity(),
            fan: greenhouse::fan(),
            mist: greenhouse::mist(),
        }
    }
}

impl Default for ControllerModel {
    fn default() -> Self {
        Self::greenhouse()
    }
}

/// Common contract of the inference engines.
///
/// Implementors provide the per-output algorithm; snapshotting, the empty
/// rule base check and the per-channel fallback are shared.
pub trait InferenceEngine: Send + Sync {
    fn mode(&self) -> EngineMode;

    fn model(&self) -> &ControllerModel;

    /// Snapshot of the current rule base
    fn rules(&self) -> RuleBase;

    /// Replace the rule base wholesale
    fn set_rules(&self, rules: RuleBase);

    /// Crisp value for one output variable against a rule base snapshot
    fn infer_output(
        &self,
        rules: &RuleBase,
        inputs: &[(&FuzzyVariable, f64)],
        output: &FuzzyVariable,
    ) -> GreenhouseResult<f64>;

    /// Run inference and report each channel's outcome
    fn infer(&self, temperature: f64, humidity: f64) -> ChannelResults {
        let rules = self.rules();
        if rules.is_empty() {
            return ChannelResults::both_failed(GreenhouseError::empty_rule_base());
        }

        let model = self.model();
        let inputs = [
            (&model.temperature, temperature),
            (&model.humidity, humidity),
        ];
        for (variable, value) in inputs {
            if !variable.contains(value) {
                let err = GreenhouseError::domain_out_of_range(
                    &variable.name,
                    value,
                    variable.min(),
                    variable.max(),
                );
                log::trace!("{}, clamping", err.message);
            }
        }
        ChannelResults {
            fan: self.infer_output(&rules, &inputs, &model.fan),
            mist: self.infer_output(&rules, &inputs, &model.mist),
        }
    }

    /// Actuator command for the given sensor readings. Never fails: a channel
    /// whose inference fails reports 0.0.
    fn compute(&self, temperature: f64, humidity: f64) -> ControlOutput {
        let results = self.infer(temperature, humidity);
        ControlOutput {
            fan: channel_or_fallback(self.model().fan.name.as_str(), results.fan),
            mist: channel_or_fallback(self.model().mist.name.as_str(), results.mist),
        }
    }
}

fn channel_or_fallback(channel: &str, result: GreenhouseResult<f64>) -> f64 {
    match result {
        Ok(value) => value,
        Err(err) if err.is_recoverable() => {
            log::debug!("{}: {}, falling back to 0.0", channel, err.message);
            0.0
        }
        Err(err) => {
            log::warn!("{}: inference failed ({}), falling back to 0.0", channel, err);
            0.0
        }
    }
}

/// Firing strength of each rule assigning `output`, paired with its consequent.
/// Rules without antecedent terms are skipped.
fn fired<'r>(
    rules: &'r RuleBase,
    inputs: &[(&FuzzyVariable, f64)],
    output: &'r str,
) -> GreenhouseResult<Vec<(FuzzyValue, &'r Consequent)>> {
    let mut fired = Vec::new();
    for (rule, consequent) in rules.for_output(output) {
        match rule.firing_strength(inputs) {
            Ok(strength) => fired.push((strength, consequent)),
            Err(err) if err.code == ErrorCode::EmptyAntecedent => {
                log::warn!("skipping rule without antecedent: {}", rule);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(fired)
}

// ============================================================================
// Mamdani
// ============================================================================

/// Mamdani inference with centroid defuzzification
pub struct MamdaniEngine {
    model: ControllerModel,
    rules: RwLock<RuleBase>,
    /// Grid spacing of the output universe used by the centroid
    resolution: f64,
}

impl MamdaniEngine {
    pub fn new(model: ControllerModel, rules: RuleBase) -> Self {
        Self {
            model,
            rules: RwLock::new(rules),
            resolution: 1.0,
        }
    }

    /// Greenhouse variables with the default Mamdani rules
    pub fn greenhouse() -> Self {
        Self::new(ControllerModel::greenhouse(), greenhouse::default_mamdani_rules())
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        if resolution > 0.0 {
            self.resolution = resolution;
        }
        self
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Clip level of every output label: max firing strength over the rules
    /// assigning it. Unassigned labels stay at zero.
    fn label_activations(
        fired: &[(FuzzyValue, &Consequent)],
        output: &FuzzyVariable,
    ) -> GreenhouseResult<IndexMap<String, FuzzyValue>> {
        let mut activations: IndexMap<String, FuzzyValue> = output
            .labels()
            .map(|label| (label.to_string(), FuzzyValue::ZERO))
            .collect();

        for (strength, consequent) in fired {
            if let Consequent::Label(label) = consequent {
                let slot = activations
                    .get_mut(label)
                    .ok_or_else(|| GreenhouseError::unknown_label(&output.name, label))?;
                *slot = slot.or(strength);
            }
        }
        Ok(activations)
    }
}

impl InferenceEngine for MamdaniEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::Mamdani
    }

    fn model(&self) -> &ControllerModel {
        &self.model
    }

    fn rules(&self) -> RuleBase {
        self.rules.read().clone()
    }

    fn set_rules(&self, rules: RuleBase) {
        let count = rules.len();
        *self.rules.write() = rules;
        log::info!("mamdani rule base replaced ({} rules)", count);
    }

    fn infer_output(
        &self,
        rules: &RuleBase,
        inputs: &[(&FuzzyVariable, f64)],
        output: &FuzzyVariable,
    ) -> GreenhouseResult<f64> {
        let fired = fired(rules, inputs, &output.name)?;
        let activations = Self::label_activations(&fired, output)?;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for x in output.universe_grid(self.resolution) {
            let mut mu = FuzzyValue::ZERO;
            for (label, clip) in &activations {
                if clip.is_zero() {
                    continue;
                }
                if let Some(shape) = output.shape(label) {
                    mu = mu.or(&clip.implies_mamdani(&shape.evaluate(x)));
                }
            }
            numerator += x * mu.value();
            denominator += mu.value();
        }

        if denominator > 0.0 {
            Ok(output.clamp(numerator / denominator))
        } else {
            Err(GreenhouseError::no_rule_fired(&output.name))
        }
    }
}

// ============================================================================
// Sugeno (weighted average)
// ============================================================================

/// Zero-order weighted-average inference over constant consequents
pub struct SugenoEngine {
    model: ControllerModel,
    rules: RwLock<RuleBase>,
}

impl SugenoEngine {
    pub fn new(model: ControllerModel, rules: RuleBase) -> Self {
        Self {
            model,
            rules: RwLock::new(rules),
        }
    }

    /// Greenhouse variables with the default weighted-average rules
    pub fn greenhouse() -> Self {
        Self::new(ControllerModel::greenhouse(), greenhouse::default_sugeno_rules())
    }
}

impl InferenceEngine for SugenoEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::Sugeno
    }

    fn model(&self) -> &ControllerModel {
        &self.model
    }

    fn rules(&self) -> RuleBase {
        self.rules.read().clone()
    }

    fn set_rules(&self, rules: RuleBase) {
        let count = rules.len();
        *self.rules.write() = rules;
        log::info!("sugeno rule base replaced ({} rules)", count);
    }

    fn infer_output(
        &self,
        rules: &RuleBase,
        inputs: &[(&FuzzyVariable, f64)],
        output: &FuzzyVariable,
    ) -> GreenhouseResult<f64> {
        let contributions: Vec<(f64, f64)> = fired(rules, inputs, &output.name)?
            .into_iter()
            .filter_map(|(strength, consequent)| match consequent {
                Consequent::Constant(value) if !strength.is_zero() => {
                    Some((strength.value(), *value))
                }
                _ => None,
            })
            .collect();

        let Some(&(_, first)) = contributions.first() else {
            return Err(GreenhouseError::no_rule_fired(&output.name));
        };

        // A single distinct constant is returned as-is, independent of weight.
        if contributions.iter().all(|&(_, value)| value == first) {
            return Ok(output.clamp(first));
        }

        let (weighted, total) = contributions
            .iter()
            .fold((0.0, 0.0), |(num, den), &(w, c)| (num + w * c, den + w));
        Ok(output.clamp(weighted / total))
    }
}

/// Build an engine for `mode` over the greenhouse variables and its default rules
pub fn build_engine(mode: EngineMode) -> Box<dyn InferenceEngine> {
    match mode {
        EngineMode::Mamdani => Box::new(MamdaniEngine::greenhouse()),
        EngineMode::Sugeno => Box::new(SugenoEngine::greenhouse()),
    }
}

/// Evaluate `compute` over a temperature × humidity grid (row per temperature).
pub fn sample_surface(
    engine: &dyn InferenceEngine,
    temperatures: &[f64],
    humidities: &[f64],
) -> Vec<Vec<ControlOutput>> {
    temperatures
        .iter()
        .map(|&t| humidities.iter().map(|&h| engine.compute(t, h)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::greenhouse::{FAN, HUMIDITY, MIST, TEMPERATURE};
    use crate::fuzzy::rule::Rule;
    use std::sync::Arc;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sugeno_default_hot_and_normal() {
        let engine = SugenoEngine::greenhouse();
        let out = engine.compute(40.0, 50.0);
        assert_eq!(out.fan, 80.0);
        assert_eq!(out.mist, 20.0);
    }

    #[test]
    fn test_sugeno_single_rule_returns_constant_exactly() {
        let engine = SugenoEngine::new(
            ControllerModel::greenhouse(),
            RuleBase::new(vec![Rule::when(HUMIDITY, "normal").then_constant(MIST, 37.3)]),
        );
        for h in [41.0, 47.3, 55.0, 69.9] {
            let results = engine.infer(20.0, h);
            assert_eq!(results.mist, Ok(37.3));
        }
    }

    #[test]
    fn test_sugeno_weighted_average() {
        let engine = SugenoEngine::greenhouse();
        // 37.5: warm 0.5 -> 50, hot 0.5 -> 80
        let out = engine.compute(37.5, 55.0);
        assert!(close(out.fan, 65.0));
        assert_eq!(out.mist, 20.0);
    }

    #[test]
    fn test_sugeno_no_rule_fired_falls_back_per_channel() {
        let engine = SugenoEngine::greenhouse();
        // very_cold has no fan rule in the default weighted-average set
        let results = engine.infer(2.0, 55.0);
        assert_eq!(results.fan.unwrap_err().code, ErrorCode::NoRuleFired);
        let out = engine.compute(2.0, 55.0);
        assert_eq!(out.fan, 0.0);
        assert_eq!(out.mist, 20.0);
    }

    #[test]
    fn test_sugeno_ignores_label_consequents() {
        let engine = SugenoEngine::new(
            ControllerModel::greenhouse(),
            RuleBase::new(vec![Rule::when(TEMPERATURE, "hot").then_label(FAN, "high")]),
        );
        assert_eq!(engine.compute(45.0, 50.0), ControlOutput { fan: 0.0, mist: 0.0 });
    }

    #[test]
    fn test_mamdani_centroid_of_low() {
        let engine = MamdaniEngine::greenhouse();
        // only normal fires for both inputs -> low tri(0,0,40), centroid 13 on a unit grid
        let out = engine.compute(25.0, 55.0);
        assert!(close(out.fan, 13.0));
        assert!(close(out.mist, 13.0));
    }

    #[test]
    fn test_mamdani_centroid_of_high() {
        let engine = MamdaniEngine::greenhouse();
        let out = engine.compute(45.0, 55.0);
        assert!(close(out.fan, 87.0));
    }

    #[test]
    fn test_mamdani_partial_firing_stays_between_levels() {
        let engine = MamdaniEngine::greenhouse();
        // warm 0.5 (medium) and hot 0.5 (high)
        let out = engine.compute(37.5, 55.0);
        assert!(out.fan > 50.0 && out.fan < 87.0, "fan = {}", out.fan);
    }

    #[test]
    fn test_mamdani_unassigned_label_contributes_nothing() {
        let engine = MamdaniEngine::new(
            ControllerModel::greenhouse(),
            RuleBase::new(vec![Rule::when(TEMPERATURE, "hot").then_label(FAN, "high")]),
        );
        let results = engine.infer(45.0, 50.0);
        assert!(close(results.fan.unwrap(), 87.0));
        assert_eq!(results.mist.unwrap_err().code, ErrorCode::NoRuleFired);
    }

    #[test]
    fn test_mamdani_no_rule_fired() {
        let engine = MamdaniEngine::new(
            ControllerModel::greenhouse(),
            RuleBase::new(vec![Rule::when(TEMPERATURE, "hot").then_label(FAN, "high")]),
        );
        assert_eq!(engine.compute(10.0, 50.0), ControlOutput { fan: 0.0, mist: 0.0 });
    }

    #[test]
    fn test_mamdani_unknown_output_label_falls_back() {
        let engine = MamdaniEngine::new(
            ControllerModel::greenhouse(),
            RuleBase::new(vec![Rule::when(TEMPERATURE, "hot").then_label(FAN, "maximum")]),
        );
        let results = engine.infer(45.0, 50.0);
        assert_eq!(results.fan.unwrap_err().code, ErrorCode::UnknownLabel);
        assert_eq!(engine.compute(45.0, 50.0).fan, 0.0);
    }

    #[test]
    fn test_empty_rule_base_falls_back() {
        for mode in [EngineMode::Mamdani, EngineMode::Sugeno] {
            let engine = build_engine(mode);
            engine.set_rules(RuleBase::empty());
            let results = engine.infer(30.0, 50.0);
            assert_eq!(results.fan.unwrap_err().code, ErrorCode::EmptyRuleBase);
            for (t, h) in [(0.0, 0.0), (25.0, 60.0), (50.0, 100.0), (-20.0, 400.0)] {
                assert_eq!(engine.compute(t, h), ControlOutput::default());
            }
        }
    }

    #[test]
    fn test_empty_antecedent_rule_is_skipped() {
        let bad = Rule::new(Vec::new(), IndexMap::new()).then_constant(FAN, 100.0);
        let engine = SugenoEngine::new(
            ControllerModel::greenhouse(),
            RuleBase::new(vec![bad, Rule::when(TEMPERATURE, "hot").then_constant(FAN, 80.0)]),
        );
        assert_eq!(engine.compute(45.0, 50.0).fan, 80.0);
    }

    #[test]
    fn test_domain_boundaries_match_clamped_inputs() {
        for mode in [EngineMode::Mamdani, EngineMode::Sugeno] {
            let engine = build_engine(mode);
            assert_eq!(engine.compute(0.0, 0.0), engine.compute(-0.001, -5.0));
            assert_eq!(engine.compute(50.0, 100.0), engine.compute(50.001, 120.0));
        }
    }

    #[test]
    fn test_compute_is_deterministic_across_set_rules() {
        let engine = build_engine(EngineMode::Mamdani);
        let first = engine.compute(33.3, 47.1);
        engine.set_rules(greenhouse::default_mamdani_rules());
        let second = engine.compute(33.3, 47.1);
        assert_eq!(first.fan.to_bits(), second.fan.to_bits());
        assert_eq!(first.mist.to_bits(), second.mist.to_bits());
    }

    #[test]
    fn test_set_rules_replaces_wholesale() {
        let engine = SugenoEngine::greenhouse();
        engine.set_rules(RuleBase::new(vec![
            Rule::when(TEMPERATURE, "hot").and(HUMIDITY, "normal").then_constant(FAN, 10.0).then_constant(MIST, 90.0),
        ]));
        assert_eq!(engine.rules().len(), 1);
        let out = engine.compute(40.0, 50.0);
        assert_eq!(out, ControlOutput { fan: 10.0, mist: 90.0 });
        // previous defaults no longer contribute
        assert_eq!(engine.compute(25.0, 50.0), ControlOutput::default());
    }

    #[test]
    fn test_concurrent_readers_see_whole_rule_bases() {
        let engine: Arc<dyn InferenceEngine> = Arc::new(SugenoEngine::new(
            ControllerModel::greenhouse(),
            RuleBase::new(vec![Rule::when(TEMPERATURE, "hot").then_constant(FAN, 80.0).then_constant(MIST, 80.0)]),
        ));
        let a = RuleBase::new(vec![Rule::when(TEMPERATURE, "hot").then_constant(FAN, 80.0).then_constant(MIST, 80.0)]);
        let b = RuleBase::new(vec![Rule::when(TEMPERATURE, "hot").then_constant(FAN, 20.0).then_constant(MIST, 20.0)]);

        let reader = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for _ in 0..2000 {
                    let out = engine.compute(45.0, 50.0);
                    assert_eq!(out.fan, out.mist, "torn rule base observed");
                }
            })
        };
        for i in 0..500 {
            engine.set_rules(if i % 2 == 0 { b.clone() } else { a.clone() });
        }
        reader.join().unwrap();
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(EngineMode::from_str("Mamdani"), Some(EngineMode::Mamdani));
        assert_eq!(EngineMode::from_str("weighted-average"), Some(EngineMode::Sugeno));
        assert_eq!(EngineMode::from_str("tsk"), None);
        assert_eq!(build_engine(EngineMode::Mamdani).mode(), EngineMode::Mamdani);
    }

    #[test]
    fn test_sample_surface_shape() {
        let engine = build_engine(EngineMode::Sugeno);
        let surface = sample_surface(engine.as_ref(), &[10.0, 25.0, 40.0], &[20.0, 80.0]);
        assert_eq!(surface.len(), 3);
        assert!(surface.iter().all(|row| row.len() == 2));
        assert_eq!(surface[2][0].fan, 80.0);
    }
}
