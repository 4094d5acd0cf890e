//! Training loop
//!
//! ```text
//! reset
//! loop:
//!   act_and_train(obs, r) -> action -> env.step
//!   step observer (average_q, average_loss at t)
//!   episode over (terminal, length cap, eval point, last step):
//!     stop_episode_and_train, log, evaluate if t % eval_interval == 0
//!     reset
//! save agent_<timestamp>_<kind>
//! ```

use super::evaluation::Evaluator;
use crate::env::Environment;
use crate::metrics::{MetricsAggregator, MetricsSink, TrainingStats, TrainingStepObserver};
use crate::rl::Agent;
use anyhow::{ensure, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

/// Longest agent kind kept in artifact names
const KIND_NAME_LEN: usize = 10;

/// Rolling window of the training progress line
const STATS_WINDOW: usize = 100;

/// Timestamp shared by every artifact of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunName {
    timestamp: String,
}

impl RunName {
    /// Capture the current local time
    pub fn now() -> Self {
        Self::from_timestamp(Local::now().format("%Y%m%d-%H%M%S").to_string())
    }

    pub fn from_timestamp(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// `agent_<timestamp>_<kind>`, kind truncated to 10 chars
    pub fn agent_dir_name(&self, kind: &str) -> String {
        format!("agent_{}_{}", self.timestamp, short_kind(kind))
    }

    /// `tensorBoard_exp_<timestamp>_<kind>`, kind truncated to 10 chars
    pub fn metrics_dir_name(&self, kind: &str) -> String {
        format!("tensorBoard_exp_{}_{}", self.timestamp, short_kind(kind))
    }
}

fn short_kind(kind: &str) -> String {
    kind.chars().take(KIND_NAME_LEN).collect()
}

/// Loop limits of a training run
#[derive(Debug, Clone, Copy)]
pub struct TrainingSchedule {
    /// Total training steps
    pub steps: u64,
    /// Evaluate whenever `t % eval_interval == 0`
    pub eval_interval: u64,
    pub max_episode_len: usize,
    /// Training episodes between progress summaries
    pub log_interval: usize,
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub steps: u64,
    pub episodes: usize,
    pub evaluations: usize,
    pub best_score: f64,
    pub agent_dir: PathBuf,
}

/// Drives agent/environment interaction, evaluation and metric emission
pub struct TrainingOrchestrator {
    schedule: TrainingSchedule,
    run_name: RunName,
    resultdir: PathBuf,
    evaluator: Evaluator,
    aggregator: MetricsAggregator,
    observer: TrainingStepObserver,
    stats: TrainingStats,
}

impl TrainingOrchestrator {
    pub fn new(
        schedule: TrainingSchedule,
        run_name: RunName,
        resultdir: impl Into<PathBuf>,
        evaluator: Evaluator,
    ) -> Self {
        let n_episodes = evaluator.runner().n_episodes;
        Self {
            schedule,
            run_name,
            resultdir: resultdir.into(),
            evaluator,
            aggregator: MetricsAggregator::new(n_episodes),
            observer: TrainingStepObserver::new(),
            stats: TrainingStats::new(STATS_WINDOW),
        }
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    /// Train for `schedule.steps` steps and save the final agent
    ///
    /// Fails before touching the environment when `eval_interval` or
    /// `max_episode_len` is zero.
    pub fn run<E, A>(
        &mut self,
        env: &mut E,
        agent: &mut A,
        sink: &mut dyn MetricsSink,
    ) -> Result<TrainingOutcome>
    where
        E: Environment,
        A: Agent<Observation = E::Observation>,
    {
        let TrainingSchedule {
            steps,
            eval_interval,
            max_episode_len,
            log_interval,
        } = self.schedule;
        ensure!(eval_interval > 0, "eval_interval must be at least 1");
        ensure!(max_episode_len > 0, "max_episode_len must be at least 1");

        let mut t: u64 = 0;
        let mut episode_idx: usize = 0;
        let mut evaluations: usize = 0;

        if steps > 0 {
            let mut obs = env.reset()?;
            let mut r = 0.0;
            let mut episode_r = 0.0;
            let mut episode_len: usize = 0;

            loop {
                let action = agent.act_and_train(&obs, r)?;
                let step = env.step(action)?;
                obs = step.observation;
                r = step.reward;
                t += 1;
                episode_r += r;
                episode_len += 1;

                self.observer.observe(&mut *agent, t, sink)?;

                let eval_due = t % eval_interval == 0;
                let episode_over =
                    step.done || episode_len >= max_episode_len || eval_due || t == steps;
                if !episode_over {
                    continue;
                }

                agent.stop_episode_and_train(&obs, r, step.done)?;
                info!("step:{} episode:{} R:{}", t, episode_idx, episode_r);
                self.stats.record_episode(episode_r, episode_len, env.iou());
                self.stats.record_agent(agent.average_q(), agent.average_loss());
                episode_idx += 1;
                if log_interval > 0 && episode_idx % log_interval == 0 {
                    info!("{}", self.stats.format_summary());
                }

                if eval_due {
                    let aggregator = &mut self.aggregator;
                    let scores = self.evaluator.evaluate(
                        t,
                        episode_idx,
                        env,
                        agent,
                        &mut |event| aggregator.handle(event, t, &mut *sink).map(|_| ()),
                    )?;
                    evaluations += 1;
                    info!(
                        "evaluation at step {}: mean {:.3} median {:.3} max {:.3} min {:.3}",
                        t, scores.mean, scores.median, scores.max, scores.min
                    );
                }

                if t == steps {
                    break;
                }

                obs = env.reset()?;
                r = 0.0;
                episode_r = 0.0;
                episode_len = 0;
            }
        }

        let agent_dir = self.resultdir.join(self.run_name.agent_dir_name(agent.kind()));
        agent.save(&agent_dir)?;
        info!("Saved the agent to {}", agent_dir.display());
        sink.flush()?;

        Ok(TrainingOutcome {
            steps: t,
            episodes: episode_idx,
            evaluations,
            best_score: self.evaluator.max_score(),
            agent_dir,
        })
    }

    pub fn resultdir(&self) -> &Path {
        &self.resultdir
    }
}
