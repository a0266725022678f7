//! Fuzzy control core
//!
//! Membership shapes, linguistic variables, rules and the two inference
//! engines, plus the greenhouse universe they are configured with.

pub mod engine;
pub mod greenhouse;
pub mod membership;
pub mod rule;
pub mod variable;

pub use engine::{
    build_engine, sample_surface, ChannelResults, ControlOutput, ControllerModel, EngineMode,
    InferenceEngine, MamdaniEngine, SugenoEngine,
};
pub use greenhouse::OutputLevel;
pub use membership::{FuzzyValue, MembershipShape};
pub use rule::{Antecedent, Consequent, Rule, RuleBase};
pub use variable::FuzzyVariable;
