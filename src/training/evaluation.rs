//! Periodic evaluation of a frozen policy
//!
//! [`EvaluationRunner`] plays greedy episodes and reports each one as an
//! [`EvaluationEvent`]. [`Evaluator`] adds round statistics, the `scores.txt`
//! table and best-agent tracking on top of it.

use crate::env::Environment;
use crate::metrics::{stats, EpisodeRecord, EvaluationEvent, NewBestScore};
use crate::rl::Agent;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Score table written by [`Evaluator`]
pub const SCORES_FILE: &str = "scores.txt";

/// Directory holding the best agent so far
pub const BEST_AGENT_DIR: &str = "best";

const SCORES_HEADER: [&str; 8] = [
    "steps", "episodes", "elapsed", "mean", "median", "stdev", "max", "min",
];

/// Plays `n_episodes` greedy episodes per round
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRunner {
    pub n_episodes: usize,
    pub max_episode_len: usize,
}

impl EvaluationRunner {
    pub fn new(n_episodes: usize, max_episode_len: usize) -> Self {
        Self {
            n_episodes,
            max_episode_len,
        }
    }

    /// Run one evaluation round
    ///
    /// Each episode resets the environment and acts greedily until the
    /// environment signals `done` or `max_episode_len` steps were taken. The
    /// final IoU is only meaningful for terminated episodes; capped episodes
    /// report 0.0. Every finished episode is logged and handed to `on_event`
    /// before the next one starts.
    pub fn run<E, A>(
        &self,
        env: &mut E,
        agent: &mut A,
        on_event: &mut dyn FnMut(&EvaluationEvent) -> Result<()>,
    ) -> Result<Vec<EpisodeRecord>>
    where
        E: Environment,
        A: Agent<Observation = E::Observation> + ?Sized,
    {
        let mut records = Vec::with_capacity(self.n_episodes);

        for index in 0..self.n_episodes {
            let mut obs = env.reset()?;
            let mut reward = 0.0;
            let mut length = 0;
            let mut done = false;

            while !done && length < self.max_episode_len {
                let action = agent.act(&obs)?;
                let step = env.step(action)?;
                obs = step.observation;
                reward += step.reward;
                done = step.done;
                length += 1;
            }

            let record = EpisodeRecord {
                index,
                length,
                reward,
                iou: if done { env.iou() } else { 0.0 },
                max_iou: env.max_iou(),
            };
            agent.stop_episode();

            info!("{}", record);
            on_event(&EvaluationEvent::EpisodeResult(record))?;
            records.push(record);
        }

        Ok(records)
    }
}

/// Return statistics of one evaluation round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationScores {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation, 0.0 for a single episode
    pub stdev: f64,
    pub max: f64,
    pub min: f64,
}

impl EvaluationScores {
    pub fn from_records(records: &[EpisodeRecord]) -> Self {
        let rewards: Vec<f64> = records.iter().map(|r| r.reward).collect();
        Self {
            mean: stats::mean(&rewards),
            median: stats::median(&rewards),
            stdev: stats::sample_stdev(&rewards),
            max: stats::max(&rewards),
            min: stats::min(&rewards),
        }
    }
}

/// Evaluation driver used during training
///
/// Keeps the best mean return seen so far. Whenever a round beats it, the
/// new-best line is logged, [`EvaluationEvent::NewBest`] is emitted and the
/// agent is saved under `<outdir>/best`.
pub struct Evaluator {
    runner: EvaluationRunner,
    outdir: PathBuf,
    max_score: f64,
    started: Instant,
}

impl Evaluator {
    /// Create the evaluator and write the `scores.txt` header
    pub fn new(runner: EvaluationRunner, outdir: impl Into<PathBuf>) -> Result<Self> {
        let outdir = outdir.into();
        fs::create_dir_all(&outdir)
            .with_context(|| format!("Failed to create directory: {:?}", outdir))?;

        let scores_path = outdir.join(SCORES_FILE);
        fs::write(&scores_path, format!("{}\n", SCORES_HEADER.join("\t")))
            .with_context(|| format!("Failed to write {:?}", scores_path))?;

        Ok(Self {
            runner,
            outdir,
            max_score: f64::NEG_INFINITY,
            started: Instant::now(),
        })
    }

    pub fn runner(&self) -> &EvaluationRunner {
        &self.runner
    }

    /// Best mean return so far, `-inf` before the first round
    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    pub fn best_agent_dir(&self) -> PathBuf {
        self.outdir.join(BEST_AGENT_DIR)
    }

    /// Run a round at training step `t` after `episodes` training episodes
    pub fn evaluate<E, A>(
        &mut self,
        t: u64,
        episodes: usize,
        env: &mut E,
        agent: &mut A,
        on_event: &mut dyn FnMut(&EvaluationEvent) -> Result<()>,
    ) -> Result<EvaluationScores>
    where
        E: Environment,
        A: Agent<Observation = E::Observation> + ?Sized,
    {
        let records = self.runner.run(env, agent, on_event)?;
        let scores = EvaluationScores::from_records(&records);
        self.append_scores(t, episodes, &scores)?;

        if scores.mean > self.max_score {
            info!(
                "{}",
                NewBestScore {
                    previous: self.max_score,
                    score: scores.mean,
                }
            );
            self.max_score = scores.mean;
            on_event(&EvaluationEvent::NewBest(scores.mean))?;
            agent.save(&self.best_agent_dir())?;
        }

        Ok(scores)
    }

    fn append_scores(&self, t: u64, episodes: usize, scores: &EvaluationScores) -> Result<()> {
        let path = self.outdir.join(SCORES_FILE);
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {:?}", path))?;

        let row = [
            t.to_string(),
            episodes.to_string(),
            self.started.elapsed().as_secs_f64().to_string(),
            scores.mean.to_string(),
            scores.median.to_string(),
            scores.stdev.to_string(),
            scores.max.to_string(),
            scores.min.to_string(),
        ];
        writeln!(file, "{}", row.join("\t")).with_context(|| format!("Failed to write {:?}", path))
    }
}

/// Read `scores.txt` rows back as numbers, skipping the header
pub fn read_scores(outdir: &Path) -> Result<Vec<Vec<f64>>> {
    let path = outdir.join(SCORES_FILE);
    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
    content
        .lines()
        .skip(1)
        .map(|line| {
            line.split('\t')
                .map(|v| {
                    v.parse::<f64>()
                        .with_context(|| format!("Invalid value {:?} in {:?}", v, path))
                })
                .collect()
        })
        .collect()
}
