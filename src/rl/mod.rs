//! Reinforcement learning agent
//!
//! Provides:
//! - The `Agent` interface used by the training and evaluation loops
//! - A DQN agent with an MLP Q-network (Burn)
//! - Linear-decay epsilon-greedy exploration
//! - Episodic experience replay
//! - Agent persistence

pub mod agent;
pub mod backend;
pub mod buffer;
pub mod config;
pub mod dqn;
pub mod explorer;
pub mod network;
pub mod persistence;

pub use agent::{Agent, ParameterNorms};
pub use backend::{default_device, device_for, TrainingBackend};
pub use buffer::{EpisodicReplayBuffer, Transition};
pub use config::DQNConfig;
pub use dqn::DQNAgent;
pub use explorer::LinearDecayEpsilonGreedy;
pub use network::{QNetwork, QNetworkConfig};
pub use persistence::{load_agent, save_agent, AgentMetadata};
