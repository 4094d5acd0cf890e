//! Run configuration
//!
//! A run is configured from a TOML file, then command-line overrides are
//! applied on top, then the result is validated:
//!
//! ```toml
//! imagefile_path = "data/images.txt"
//! boxfile_path = "data/boxes.json"
//! resultdir_path = "result"
//! steps = 100000
//! eval_interval = 5000
//!
//! [dqn]
//! gamma = 0.95
//!
//! [env]
//! alpha = 0.2
//! ```

use crate::env::EnvConfig;
use crate::rl::DQNConfig;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the configuration copy written to the result directory
pub const CONFIG_FILE: &str = "config.toml";

/// Complete configuration of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// GPU index, -1 for CPU
    pub gpu_id: i32,

    /// Text file listing image paths relative to its own directory
    pub imagefile_path: PathBuf,

    /// JSON file with the ground-truth boxes of every listed image
    pub boxfile_path: PathBuf,

    /// Directory receiving agents, scores and logs
    pub resultdir_path: PathBuf,

    /// Total training steps
    pub steps: u64,

    /// Episodes per evaluation round
    pub eval_n_episodes: usize,

    /// Training steps between evaluation rounds
    pub eval_interval: u64,

    /// Step cap of a training episode
    pub train_max_episode_len: usize,

    /// Step cap of an evaluation episode, defaults to `train_max_episode_len`
    pub eval_max_episode_len: Option<usize>,

    /// Write step-indexed scalars under `tensorboard_dir`
    pub use_tensorboard: bool,

    pub tensorboard_dir: PathBuf,

    /// Training episodes between progress summaries
    pub log_interval: usize,

    /// Seed for the environment and agent, entropy when absent
    pub seed: Option<u64>,

    pub dqn: DQNConfig,

    pub env: EnvConfig,

    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            gpu_id: -1,
            imagefile_path: PathBuf::new(),
            boxfile_path: PathBuf::new(),
            resultdir_path: PathBuf::from("result"),
            steps: 500_000,
            eval_n_episodes: 10,
            eval_interval: 10_000,
            train_max_episode_len: 50,
            eval_max_episode_len: None,
            use_tensorboard: true,
            tensorboard_dir: PathBuf::from("tensorboard"),
            log_interval: 100,
            seed: None,
            dqn: DQNConfig::default(),
            env: EnvConfig::default(),
            source: None,
        }
    }
}

impl TrainingConfig {
    /// Read a configuration file without validating it
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let mut config: Self =
            toml::from_str(&contents).with_context(|| format!("Invalid config {:?}", path))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Defaults < TOML file (if any) < command-line overrides, then validate
    pub fn load(path: Option<&Path>, overrides: &TrainOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        overrides.apply(&mut config);
        config
            .validate()
            .map_err(|e| anyhow!("Invalid training config: {}", e))?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.imagefile_path.as_os_str().is_empty() {
            return Err("imagefile_path is required".to_string());
        }

        if self.boxfile_path.as_os_str().is_empty() {
            return Err("boxfile_path is required".to_string());
        }

        if self.gpu_id < -1 {
            return Err(format!("gpu_id must be -1 or a device index, got {}", self.gpu_id));
        }

        if self.eval_n_episodes == 0 {
            return Err("eval_n_episodes must be at least 1".to_string());
        }

        if self.eval_interval == 0 {
            return Err("eval_interval must be at least 1".to_string());
        }

        if self.train_max_episode_len == 0 {
            return Err("train_max_episode_len must be at least 1".to_string());
        }

        if self.eval_max_episode_len == Some(0) {
            return Err("eval_max_episode_len must be at least 1".to_string());
        }

        self.dqn.validate().map_err(|e| format!("dqn: {}", e))?;
        self.env.validate().map_err(|e| format!("env: {}", e))?;

        Ok(())
    }

    pub fn eval_max_episode_len(&self) -> usize {
        self.eval_max_episode_len
            .unwrap_or(self.train_max_episode_len)
    }

    /// Log every setting, one per line
    pub fn log(&self) {
        info!("{}", "=".repeat(70));
        info!("Text localization DQN training");
        info!("{}", "=".repeat(70));
        match &self.source {
            Some(path) => info!(path = %path.display(), "Loaded training config"),
            None => info!("Using default training config"),
        }
        match toml::to_string(self) {
            Ok(text) => text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .for_each(|line| info!("  {}", line)),
            Err(e) => info!("  (config not printable: {})", e),
        }
        info!("{}", "=".repeat(70));
    }

    /// Write the configuration to `<dir>/config.toml`
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        let path = dir.join(CONFIG_FILE);
        let text = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, text).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }
}

/// Command-line overrides for [`TrainingConfig`]
#[derive(Debug, Default, Clone, Args)]
pub struct TrainOverrides {
    /// GPU index, -1 for CPU
    #[arg(long, allow_negative_numbers = true)]
    pub gpu_id: Option<i32>,

    #[arg(long)]
    pub imagefile_path: Option<PathBuf>,

    #[arg(long)]
    pub boxfile_path: Option<PathBuf>,

    #[arg(long)]
    pub resultdir_path: Option<PathBuf>,

    #[arg(long)]
    pub steps: Option<u64>,

    #[arg(long)]
    pub eval_n_episodes: Option<usize>,

    #[arg(long)]
    pub eval_interval: Option<u64>,

    #[arg(long)]
    pub train_max_episode_len: Option<usize>,

    #[arg(long)]
    pub eval_max_episode_len: Option<usize>,

    #[arg(long)]
    pub use_tensorboard: Option<bool>,

    #[arg(long)]
    pub tensorboard_dir: Option<PathBuf>,

    #[arg(long)]
    pub log_interval: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub start_epsilon: Option<f64>,

    #[arg(long)]
    pub end_epsilon: Option<f64>,

    #[arg(long)]
    pub decay_steps: Option<u64>,

    #[arg(long)]
    pub replay_buffer_capacity: Option<usize>,

    #[arg(long)]
    pub gamma: Option<f32>,

    #[arg(long)]
    pub replay_start_size: Option<usize>,

    #[arg(long)]
    pub update_interval: Option<u64>,

    #[arg(long)]
    pub target_update_interval: Option<u64>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Adam epsilon
    #[arg(long)]
    pub epsilon: Option<f32>,

    #[arg(long)]
    pub minibatch_size: Option<usize>,

    #[arg(long)]
    pub gradients_weights_log_interval: Option<u64>,
}

impl TrainOverrides {
    pub fn apply(&self, config: &mut TrainingConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut config.gpu_id, &self.gpu_id);
        set(&mut config.imagefile_path, &self.imagefile_path);
        set(&mut config.boxfile_path, &self.boxfile_path);
        set(&mut config.resultdir_path, &self.resultdir_path);
        set(&mut config.steps, &self.steps);
        set(&mut config.eval_n_episodes, &self.eval_n_episodes);
        set(&mut config.eval_interval, &self.eval_interval);
        set(&mut config.train_max_episode_len, &self.train_max_episode_len);
        set(&mut config.use_tensorboard, &self.use_tensorboard);
        set(&mut config.tensorboard_dir, &self.tensorboard_dir);
        set(&mut config.log_interval, &self.log_interval);
        if self.eval_max_episode_len.is_some() {
            config.eval_max_episode_len = self.eval_max_episode_len;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        let dqn = &mut config.dqn;
        set(&mut dqn.start_epsilon, &self.start_epsilon);
        set(&mut dqn.end_epsilon, &self.end_epsilon);
        set(&mut dqn.decay_steps, &self.decay_steps);
        set(&mut dqn.replay_buffer_capacity, &self.replay_buffer_capacity);
        set(&mut dqn.gamma, &self.gamma);
        set(&mut dqn.replay_start_size, &self.replay_start_size);
        set(&mut dqn.update_interval, &self.update_interval);
        set(&mut dqn.target_update_interval, &self.target_update_interval);
        set(&mut dqn.learning_rate, &self.learning_rate);
        set(&mut dqn.epsilon, &self.epsilon);
        set(&mut dqn.minibatch_size, &self.minibatch_size);
        set(
            &mut dqn.gradients_weights_log_interval,
            &self.gradients_weights_log_interval,
        );
    }
}
