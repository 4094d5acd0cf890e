//! Evaluation mode
//!
//! Loads a saved agent and runs evaluation episodes with it, without any
//! learning.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::config::TrainingConfig;
use crate::env::{Dataset, TextLocEnvironment};
use crate::metrics::{EpisodeRecord, MetricsAggregator, TracingSink};
use crate::rl::{device_for, load_agent, Agent, TrainingBackend};
use crate::training::{EvaluationRunner, EvaluationScores};

/// Result of an evaluation run
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub records: Vec<EpisodeRecord>,
    pub scores: EvaluationScores,
}

/// Evaluates a saved agent on the configured dataset
pub struct EvaluateMode {
    config: TrainingConfig,
    agent_dir: PathBuf,
    n_episodes: usize,
}

impl EvaluateMode {
    /// `episodes` overrides `eval_n_episodes` from the config
    pub fn new(config: TrainingConfig, agent_dir: PathBuf, episodes: Option<usize>) -> Self {
        let n_episodes = episodes.unwrap_or(config.eval_n_episodes);
        Self {
            config,
            agent_dir,
            n_episodes,
        }
    }

    pub fn run(&self) -> Result<EvaluationReport> {
        let config = &self.config;
        let mut agent = load_agent::<TrainingBackend>(&self.agent_dir, device_for(config.gpu_id))
            .with_context(|| format!("Failed to load agent from {:?}", self.agent_dir))?;
        info!(
            "Loaded {} trained for {} steps from {}",
            agent.kind(),
            agent.t(),
            self.agent_dir.display()
        );

        let dataset = Dataset::load(&config.imagefile_path, &config.boxfile_path)
            .context("Failed to load evaluation data")?;
        let mut env = TextLocEnvironment::new(dataset, config.env.clone(), config.seed);
        if env.observation_size() != agent.obs_dim() {
            bail!(
                "agent expects observations of length {}, environment produces {}",
                agent.obs_dim(),
                env.observation_size()
            );
        }

        let step = agent.t();
        let mut aggregator = MetricsAggregator::new(self.n_episodes);
        let mut sink = TracingSink;
        let runner = EvaluationRunner::new(self.n_episodes, config.eval_max_episode_len());
        let records = runner.run(&mut env, &mut agent, &mut |event| {
            aggregator.handle(event, step, &mut sink).map(|_| ())
        })?;

        let scores = EvaluationScores::from_records(&records);
        info!(
            "{} episodes: mean {} median {} stdev {} max {} min {}",
            records.len(),
            scores.mean,
            scores.median,
            scores.stdev,
            scores.max,
            scores.min
        );

        Ok(EvaluationReport { records, scores })
    }
}
