//! Agent persistence
//!
//! An agent is saved as a directory holding the online network weights
//! (Burn's named MessagePack record) and a JSON metadata file with everything
//! needed to rebuild the agent.

use super::{Agent, DQNAgent, DQNConfig, QNetworkConfig};
use crate::env::ActionSpace;
use anyhow::{Context, Result};
use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File stem of the network weights inside an agent directory
const MODEL_FILE: &str = "model";

/// Metadata file inside an agent directory
const META_FILE: &str = "agent.meta.json";

/// Metadata saved with the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetadata {
    /// DQN configuration used during training
    pub dqn_config: DQNConfig,

    /// Length of the observation vector
    pub obs_dim: usize,

    /// Number of discrete actions
    pub num_actions: usize,

    /// Training steps completed
    pub training_steps: u64,

    /// Version identifier for compatibility checking
    pub version: String,
}

impl AgentMetadata {
    pub fn new(dqn_config: DQNConfig, obs_dim: usize, num_actions: usize, training_steps: u64) -> Self {
        Self {
            dqn_config,
            obs_dim,
            num_actions,
            training_steps,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Save a DQN agent into `dir`
///
/// Creates the directory if needed and writes:
/// - `<dir>/model.mpk` - online network weights
/// - `<dir>/agent.meta.json` - metadata as JSON
pub fn save_agent<B: AutodiffBackend>(agent: &DQNAgent<B>, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {:?}", dir))?;

    let record = agent.network().clone().into_record();
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(record, dir.join(MODEL_FILE))
        .context("Failed to save network weights")?;

    let metadata = AgentMetadata::new(
        agent.config().clone(),
        agent.obs_dim(),
        agent.action_space().n,
        agent.t(),
    );
    let meta_path = dir.join(META_FILE);
    let meta_json =
        serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;
    std::fs::write(&meta_path, meta_json)
        .with_context(|| format!("Failed to write metadata to {:?}", meta_path))?;

    Ok(())
}

/// Load a DQN agent saved by [`save_agent`]
///
/// The replay buffer and optimizer state are not persisted; the loaded agent
/// is meant for evaluation or as a warm start.
pub fn load_agent<B: AutodiffBackend>(dir: &Path, device: B::Device) -> Result<DQNAgent<B>> {
    let meta_path = dir.join(META_FILE);
    let meta_json = std::fs::read_to_string(&meta_path)
        .with_context(|| format!("Failed to read metadata from {:?}", meta_path))?;
    let metadata: AgentMetadata =
        serde_json::from_str(&meta_json).context("Failed to deserialize metadata")?;

    let network = QNetworkConfig::new(metadata.obs_dim, metadata.num_actions)
        .with_hidden_dim(metadata.dqn_config.hidden_dim)
        .init::<B>(&device);

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(dir.join(MODEL_FILE), &device)
        .with_context(|| format!("Failed to load network weights from {:?}", dir))?;
    let network = network.load_record(record);

    let mut agent = DQNAgent::with_network(
        network,
        metadata.obs_dim,
        ActionSpace::new(metadata.num_actions),
        metadata.dqn_config,
        None,
        device,
    )?;
    agent.set_t(metadata.training_steps);
    Ok(agent)
}
