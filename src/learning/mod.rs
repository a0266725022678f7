//! Rule evolution through reinforcement learning
//!
//! The agent discretizes the greenhouse through the fuzzy input variables,
//! learns an action-value table against the simulated environment, and the
//! evolver turns the learned greedy policy into a replacement rule base for
//! the weighted-average engine.

pub mod agent;
pub mod evolver;
pub mod table;

pub use agent::{actuator_powers, AgentConfig, AgentConfigBuilder, QLearningAgent, TrainingStats};
pub use evolver::RuleEvolver;
pub use table::{Action, ActionValueTable, DiscreteState};
