//! ML TextLoc - text localization with deep Q-learning
//!
//! This library provides:
//! - Text localization environment (env module)
//! - DQN agent, replay and persistence on Burn (rl module)
//! - Training loop with periodic evaluation (training module)
//! - Evaluation metrics, sinks and log replay (metrics module)
//! - Run configuration and logging setup
//! - Command-line modes: train, evaluate, replay-log (modes module)

pub mod config;
pub mod env;
pub mod logging;
pub mod metrics;
pub mod modes;
pub mod rl;
pub mod training;

#[cfg(test)]
pub(crate) mod testing;
