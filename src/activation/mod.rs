//! Graph-aware re-ranking.
//!
//! Relevance flows from directly matched Neuronas along weighted outgoing
//! connections, so structurally related notes surface next to lexical and
//! semantic matches.

pub mod config;
pub mod engine;

pub use config::ActivationConfig;
pub use engine::{Activated, ActivationEngine, ActivationSource};
