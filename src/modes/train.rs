//! Training mode
//!
//! Builds the dataset, environment, DQN agent, metric sinks and evaluator
//! from a [`TrainingConfig`], then hands them to the
//! [`TrainingOrchestrator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ml_textloc::config::{TrainOverrides, TrainingConfig};
//! use ml_textloc::modes::TrainMode;
//! use std::path::Path;
//!
//! let config = TrainingConfig::load(Some(Path::new("train.toml")), &TrainOverrides::default())?;
//! let outcome = TrainMode::new(config).run()?;
//! println!("agent saved to {:?}", outcome.agent_dir);
//! ```

use anyhow::{Context, Result};
use tracing::info;

use crate::config::TrainingConfig;
use crate::env::{Dataset, Environment, TextLocEnvironment};
use crate::metrics::{FanoutSink, JsonlScalarWriter, TracingSink};
use crate::rl::{device_for, Agent, DQNAgent, TrainingBackend};
use crate::training::{
    EvaluationRunner, Evaluator, RunName, TrainingOrchestrator, TrainingOutcome, TrainingSchedule,
};

/// Training mode for the DQN agent
pub struct TrainMode {
    config: TrainingConfig,
    run_name: RunName,
}

impl TrainMode {
    /// Create a training mode; the run timestamp is fixed here
    pub fn new(config: TrainingConfig) -> Self {
        Self::with_run_name(config, RunName::now())
    }

    pub fn with_run_name(config: TrainingConfig, run_name: RunName) -> Self {
        Self { config, run_name }
    }

    pub fn run_name(&self) -> &RunName {
        &self.run_name
    }

    /// Train, evaluate periodically and save the final agent
    pub fn run(&self) -> Result<TrainingOutcome> {
        let config = &self.config;
        config.log();
        let device = device_for(config.gpu_id);

        let resultdir = &config.resultdir_path;
        let config_path = config.write_to(resultdir)?;
        info!("Configuration written to {}", config_path.display());

        let dataset = Dataset::load(&config.imagefile_path, &config.boxfile_path)
            .context("Failed to load training data")?;
        info!("Loaded {} images", dataset.len());

        let mut env = TextLocEnvironment::new(dataset, config.env.clone(), config.seed);
        let mut agent = DQNAgent::<TrainingBackend>::new(
            env.observation_size(),
            env.action_space(),
            config.dqn.clone(),
            config.seed,
            device,
        )?;

        let mut sink = FanoutSink::new().with(TracingSink);
        if config.use_tensorboard {
            let run_dir = config
                .tensorboard_dir
                .join(self.run_name.metrics_dir_name(agent.kind()));
            let writer = JsonlScalarWriter::in_dir(&run_dir)?;
            info!("Writing scalars to {}", writer.path().display());
            sink = sink.with(writer);
        }

        let evaluator = Evaluator::new(
            EvaluationRunner::new(config.eval_n_episodes, config.eval_max_episode_len()),
            resultdir,
        )?;
        let schedule = TrainingSchedule {
            steps: config.steps,
            eval_interval: config.eval_interval,
            max_episode_len: config.train_max_episode_len,
            log_interval: config.log_interval,
        };

        let mut orchestrator =
            TrainingOrchestrator::new(schedule, self.run_name.clone(), resultdir, evaluator);
        let outcome = orchestrator.run(&mut env, &mut agent, &mut sink)?;

        info!("Training complete!");
        info!(
            "{} steps, {} episodes, {} evaluations, best score {}",
            outcome.steps, outcome.episodes, outcome.evaluations, outcome.best_score
        );
        info!("{}", orchestrator.stats().format_summary());

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{read_scalars, SCALARS_FILE};
    use crate::testing::{small_training_config, write_text_dataset};
    use crate::training::{read_scores, BEST_AGENT_DIR};
    use tempfile::TempDir;

    #[test]
    fn test_short_training_run_writes_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        write_text_dataset(temp_dir.path());
        let config = small_training_config(temp_dir.path());

        let mode = TrainMode::with_run_name(config, RunName::from_timestamp("20261018-090000"));
        let outcome = mode.run().unwrap();

        assert_eq!(outcome.steps, 40);
        assert_eq!(outcome.evaluations, 2);

        let resultdir = temp_dir.path().join("result");
        assert_eq!(
            outcome.agent_dir,
            resultdir.join("agent_20261018-090000_DQNAgent")
        );
        assert!(outcome.agent_dir.join("agent.meta.json").exists());
        assert!(resultdir.join(BEST_AGENT_DIR).join("agent.meta.json").exists());
        assert!(resultdir.join("config.toml").exists());
        assert_eq!(read_scores(&resultdir).unwrap().len(), 2);

        let scalars = read_scalars(
            temp_dir
                .path()
                .join("tensorboard")
                .join("tensorBoard_exp_20261018-090000_DQNAgent")
                .join(SCALARS_FILE),
        )
        .unwrap();
        let reward_steps: Vec<u64> = scalars
            .iter()
            .filter(|e| e.name == "evaluation_reward_mean")
            .map(|e| e.step)
            .collect();
        assert_eq!(reward_steps, vec![20, 40]);
        assert_eq!(
            scalars.iter().filter(|e| e.name == "average_q").count(),
            40
        );
    }

    #[test]
    fn test_missing_dataset_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = small_training_config(temp_dir.path());
        assert!(TrainMode::new(config).run().is_err());
    }
}
