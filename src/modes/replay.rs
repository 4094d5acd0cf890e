//! Log replay mode
//!
//! Rebuilds the evaluation scalars of a finished run from its `train.log`.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::metrics::{FanoutSink, JsonlScalarWriter, LogReplay, ReplaySummary, TracingSink};

/// Settings of a replay
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub log_path: PathBuf,
    pub eval_n_episodes: usize,
    pub eval_interval: u64,
    /// Scalar file to write, scalars are only logged when absent
    pub output: Option<PathBuf>,
}

pub struct ReplayMode {
    config: ReplayConfig,
}

impl ReplayMode {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<ReplaySummary> {
        let config = &self.config;
        anyhow::ensure!(config.eval_n_episodes > 0, "eval_n_episodes must be at least 1");
        anyhow::ensure!(config.eval_interval > 0, "eval_interval must be at least 1");

        let mut sink = FanoutSink::new().with(TracingSink);
        if let Some(output) = &config.output {
            sink = sink.with(JsonlScalarWriter::create(output)?);
        }

        let mut replay = LogReplay::new(config.eval_n_episodes, config.eval_interval);
        let summary = replay.replay_file(&config.log_path, &mut sink)?;
        info!(
            "Replayed {} lines: {} evaluation episodes, {} rounds, {} new best scores",
            summary.lines, summary.episodes, summary.rounds, summary.new_bests
        );
        Ok(summary)
    }
}
