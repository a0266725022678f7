//! Tabular Q-learning over the fuzzy-discretized greenhouse
//!
//! ## Q-Learning Update
//!
//! ```text
//! Q(s, a) ← Q(s, a) + α * [r + γ * max_a' Q(s', a') - Q(s, a)]
//! ```
//!
//! where `s` is the (temperature label, humidity label) pair with the highest
//! membership for each reading and `a` is a (fan level, mist level) pair.
//! Actions are chosen epsilon-greedy; epsilon decays geometrically once per
//! episode and never falls below its floor.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::GreenhouseResult;
use crate::fuzzy::greenhouse::{self, OutputLevel};
use crate::fuzzy::rule::RuleBase;
use crate::fuzzy::variable::FuzzyVariable;
use crate::store::TableStore;

use super::evolver::RuleEvolver;
use super::table::{Action, ActionValueTable, DiscreteState, ACTIONS};

/// Hyperparameters of the learning agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Learning rate (alpha)
    pub alpha: f64,

    /// Discount factor (gamma)
    pub gamma: f64,

    /// Initial exploration rate
    pub epsilon: f64,

    /// Epsilon decay rate per episode
    pub epsilon_decay: f64,

    /// Minimum epsilon value
    pub epsilon_min: f64,

    /// Environment steps per episode
    pub steps_per_episode: usize,

    /// Episodes between progress log lines
    pub progress_interval: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.01,
            steps_per_episode: 50,
            progress_interval: 100,
        }
    }
}

impl AgentConfig {
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }
}

/// Builder for AgentConfig.
#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    pub fn gamma(mut self, gamma: f64) -> Self {
        self.config.gamma = gamma;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    pub fn epsilon_decay(mut self, decay: f64) -> Self {
        self.config.epsilon_decay = decay;
        self
    }

    pub fn epsilon_min(mut self, epsilon_min: f64) -> Self {
        self.config.epsilon_min = epsilon_min;
        self
    }

    pub fn steps_per_episode(mut self, steps: usize) -> Self {
        self.config.steps_per_episode = steps;
        self
    }

    pub fn progress_interval(mut self, episodes: usize) -> Self {
        self.config.progress_interval = episodes;
        self
    }

    pub fn build(self) -> AgentConfig {
        self.config
    }
}

/// Summary of a `train` call
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrainingStats {
    pub episodes: usize,
    pub total_steps: usize,
    /// Mean per-step reward of the final episode
    pub last_episode_mean_reward: f64,
    pub final_epsilon: f64,
}

/// Epsilon-greedy tabular Q-learning agent
pub struct QLearningAgent<R: Rng = StdRng> {
    config: AgentConfig,
    temperature: FuzzyVariable,
    humidity: FuzzyVariable,
    table: ActionValueTable,
    epsilon: f64,
    rng: R,
    evolver: RuleEvolver,
    episodes_trained: usize,
}

impl<R: Rng> QLearningAgent<R> {
    /// Agent discretizing through the given input variables. Each needs five
    /// labels, one per table state.
    pub fn new(
        config: AgentConfig,
        temperature: FuzzyVariable,
        humidity: FuzzyVariable,
        rng: R,
    ) -> GreenhouseResult<Self> {
        let levels = OutputLevel::ALL.map(|level| level.value());
        let evolver = RuleEvolver::new(&temperature, &humidity, levels)?;
        Ok(Self::assemble(config, temperature, humidity, rng, evolver))
    }

    /// Agent over the greenhouse input variables
    pub fn greenhouse(config: AgentConfig, rng: R) -> Self {
        Self::assemble(
            config,
            greenhouse::temperature(),
            greenhouse::humidity(),
            rng,
            RuleEvolver::greenhouse(),
        )
    }

    fn assemble(
        config: AgentConfig,
        temperature: FuzzyVariable,
        humidity: FuzzyVariable,
        rng: R,
        evolver: RuleEvolver,
    ) -> Self {
        let epsilon = config.epsilon;
        Self {
            config,
            temperature,
            humidity,
            table: ActionValueTable::zeros(),
            epsilon,
            rng,
            evolver,
            episodes_trained: 0,
        }
    }

    /// Start from an existing table instead of zeros
    pub fn with_table(mut self, table: ActionValueTable) -> Self {
        self.table = table;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn table(&self) -> &ActionValueTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut ActionValueTable {
        &mut self.table
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    pub fn episodes_trained(&self) -> usize {
        self.episodes_trained
    }

    /// Dominant label index of each reading (lowest index on ties)
    pub fn discretize(&self, temperature: f64, humidity: f64) -> DiscreteState {
        DiscreteState::new(
            self.temperature.dominant_index(temperature),
            self.humidity.dominant_index(humidity),
        )
    }

    /// Epsilon-greedy action selection
    pub fn choose_action(&mut self, state: DiscreteState) -> Action {
        if self.rng.gen::<f64>() < self.epsilon {
            Action::from_flat(self.rng.gen_range(0..ACTIONS))
        } else {
            self.table.best_action(state)
        }
    }

    /// One-step Q-learning update for the action actually taken
    pub fn update(&mut self, state: DiscreteState, action: Action, reward: f64, next_state: DiscreteState) {
        let current = self.table.get(state, action);
        let target = reward + self.config.gamma * self.table.max_value(next_state);
        self.table
            .set(state, action, current + self.config.alpha * (target - current));
    }

    /// Epsilon decays exponentially: ε ← max(ε_min, ε * decay_rate)
    pub fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
    }

    /// Run `episodes` full episodes against `env`. There is no convergence
    /// check; every episode runs `steps_per_episode` steps.
    pub fn train<E: Environment>(&mut self, env: &mut E, episodes: usize) -> TrainingStats {
        let steps = self.config.steps_per_episode;
        let interval = self.config.progress_interval.max(1);
        let mut stats = TrainingStats::default();

        for episode in 0..episodes {
            let start = env.reset();
            let mut state = self.discretize(start.temperature, start.humidity);
            let mut episode_reward = 0.0;

            for _ in 0..steps {
                let action = self.choose_action(state);
                let (fan_power, mist_power) = actuator_powers(action);
                let outcome = env.step(fan_power, mist_power);
                let next_state = self.discretize(outcome.state.temperature, outcome.state.humidity);
                self.update(state, action, outcome.reward, next_state);
                state = next_state;
                episode_reward += outcome.reward;
            }

            self.decay_epsilon();
            self.episodes_trained += 1;
            stats.episodes += 1;
            stats.total_steps += steps;
            stats.last_episode_mean_reward = if steps > 0 {
                episode_reward / steps as f64
            } else {
                0.0
            };

            if episode % interval == 0 {
                log::info!(
                    "episode {}/{}: epsilon {:.4}, mean reward {:.3}",
                    episode,
                    episodes,
                    self.epsilon,
                    stats.last_episode_mean_reward
                );
            }
        }

        stats.final_epsilon = self.epsilon;
        log::info!(
            "training finished: {} episodes, {} steps, epsilon {:.4}",
            stats.episodes,
            stats.total_steps,
            stats.final_epsilon
        );
        stats
    }

    /// Weighted-average rule base from the current greedy policy
    pub fn evolve_rules(&self) -> RuleBase {
        self.evolver.evolve(&self.table)
    }

    /// Replace the table with the persisted one (zeros when nothing is stored)
    pub fn load_from(&mut self, store: &dyn TableStore) -> GreenhouseResult<()> {
        self.table = store.load_table()?;
        Ok(())
    }

    pub fn save_to(&self, store: &dyn TableStore) -> GreenhouseResult<()> {
        store.save_table(&self.table)
    }
}

impl QLearningAgent<StdRng> {
    /// Greenhouse agent with a reproducible random source
    pub fn seeded(config: AgentConfig, seed: u64) -> Self {
        Self::greenhouse(config, StdRng::seed_from_u64(seed))
    }
}

/// Actuator powers an action drives the environment with
pub fn actuator_powers(action: Action) -> (f64, f64) {
    let level = |index: usize| {
        OutputLevel::from_index(index)
            .unwrap_or(OutputLevel::High)
            .value()
    };
    (level(action.fan), level(action.mist))
}
