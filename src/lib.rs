//! Fuzzy Greenhouse - adaptive fuzzy climate control
//!
//! Computes fan and misting commands for a greenhouse from temperature and
//! humidity readings with fuzzy inference, and rewrites its own rules from a
//! policy learned by tabular Q-learning against a simulated greenhouse.
//!
//! # Architecture
//!
//! - [`fuzzy::InferenceEngine`] - Common contract of the Mamdani and weighted-average engines
//! - [`environment::Environment`] - Training oracle the agent steps through
//! - [`store::TableStore`] - Load/store of the learned action-value table
//!
//! # Features
//!
//! - Triangular and trapezoidal membership shapes with shoulder support
//! - Mamdani inference (min implication, max aggregation, centroid)
//! - Weighted-average inference over constant consequents
//! - Atomic rule base replacement, safe under concurrent `compute` calls
//! - Fuzzy-state discretization with 5×5 states and 3×3 actions
//! - Rule evolution: one synthesized rule per state from the greedy policy
//! - File, SQLite and in-memory table persistence
//!
//! # Example
//!
//! ```rust,ignore
//! use fuzzy_greenhouse::{build_engine, EngineMode, GreenhouseEnv, PhysicsParams, QLearningAgent, AgentConfig};
//!
//! let engine = build_engine(EngineMode::Sugeno);
//! let out = engine.compute(40.0, 50.0);
//! assert_eq!((out.fan, out.mist), (80.0, 20.0));
//!
//! let mut agent = QLearningAgent::seeded(AgentConfig::default(), 42);
//! let mut env = GreenhouseEnv::seeded(PhysicsParams::default(), 42);
//! agent.train(&mut env, 500);
//! engine.set_rules(agent.evolve_rules());
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod fuzzy;
pub mod learning;
pub mod store;

// Re-export fuzzy control types
pub use fuzzy::{
    build_engine, sample_surface, Antecedent, ChannelResults, Consequent, ControlOutput,
    ControllerModel, EngineMode, FuzzyValue, FuzzyVariable, InferenceEngine, MamdaniEngine,
    MembershipShape, OutputLevel, Rule, RuleBase, SugenoEngine,
};

// Re-export environment types
pub use environment::{EnvState, Environment, GreenhouseEnv, PhysicsParams, StepOutcome};

// Re-export learning types
pub use learning::{
    Action, ActionValueTable, AgentConfig, AgentConfigBuilder, DiscreteState, QLearningAgent,
    RuleEvolver, TrainingStats,
};

// Re-export store types
pub use store::{open_store, FileTableStore, MemoryTableStore, SqliteTableStore, StoreBackend, TableStore};

// Re-export configuration types
pub use config::{
    ConfigError, ControllerConfig, EnvironmentConfig, GeneralConfig, GreenhouseConfig, LogLevel,
    StoreConfig, TrainingConfig,
};

// Re-export error types
pub use error::{ErrorCode, ErrorContext, GreenhouseError, GreenhouseResult};
