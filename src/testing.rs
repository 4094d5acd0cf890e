//! Stub environment and agent for loop tests

use crate::config::TrainingConfig;
use crate::env::{ActionSpace, Environment, Step, StepInfo};
use crate::rl::{Agent, ParameterNorms};
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// Marker file written by [`StubAgent::save`]
pub const STUB_SAVE_FILE: &str = "stub_agent.txt";

/// Environment with scripted rewards and episode lengths
///
/// Observations are the step index within the current episode.
#[derive(Debug, Clone)]
pub struct StubEnvironment {
    /// Steps until `done`; `None` never terminates
    episode_len: Option<usize>,
    reward: f64,
    iou: f64,
    max_iou: f64,
    position: usize,
    pub resets: usize,
    pub steps: usize,
}

impl StubEnvironment {
    /// Every episode ends after `episode_len` steps, each paying `reward`
    pub fn terminating_after(episode_len: usize, reward: f64) -> Self {
        Self {
            episode_len: Some(episode_len),
            reward,
            iou: 0.0,
            max_iou: 0.0,
            position: 0,
            resets: 0,
            steps: 0,
        }
    }

    /// Episodes never terminate on their own
    pub fn never_terminating(reward: f64) -> Self {
        Self {
            episode_len: None,
            ..Self::terminating_after(0, reward)
        }
    }

    pub fn with_iou(mut self, iou: f64, max_iou: f64) -> Self {
        self.iou = iou;
        self.max_iou = max_iou;
        self
    }
}

impl Environment for StubEnvironment {
    type Observation = usize;

    fn reset(&mut self) -> Result<usize> {
        self.resets += 1;
        self.position = 0;
        Ok(0)
    }

    fn step(&mut self, _action: usize) -> Result<Step<usize>> {
        self.steps += 1;
        self.position += 1;
        Ok(Step {
            observation: self.position,
            reward: self.reward,
            done: self.episode_len == Some(self.position),
            info: StepInfo { iou: self.iou },
        })
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::new(2)
    }

    fn iou(&self) -> f64 {
        self.iou
    }

    fn max_iou(&self) -> f64 {
        self.max_iou
    }
}

/// Agent that records every call it receives
#[derive(Debug, Default)]
pub struct StubAgent {
    action: usize,
    average_q: f64,
    average_loss: f64,
    t: u64,
    pub act_calls: usize,
    pub train_calls: usize,
    /// `(reward, done)` of every `stop_episode_and_train`
    pub train_episode_ends: Vec<(f64, bool)>,
    pub stop_episode_calls: usize,
    pub saved: RefCell<Vec<PathBuf>>,
    pending_norms: Vec<ParameterNorms>,
    /// Capture one norm entry whenever `t` is a multiple of this
    norms_every: Option<u64>,
}

impl StubAgent {
    /// Agent that always picks `action`
    pub fn new(action: usize) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    pub fn with_averages(mut self, average_q: f64, average_loss: f64) -> Self {
        self.average_q = average_q;
        self.average_loss = average_loss;
        self
    }

    pub fn with_pending_norms(mut self, norms: Vec<ParameterNorms>) -> Self {
        self.pending_norms = norms;
        self
    }

    pub fn with_norms_every(mut self, every: u64) -> Self {
        self.norms_every = Some(every);
        self
    }

    /// Calls that could update weights
    pub fn learning_calls(&self) -> usize {
        self.train_calls + self.train_episode_ends.len()
    }

    pub fn saved_paths(&self) -> Vec<PathBuf> {
        self.saved.borrow().clone()
    }
}

impl Agent for StubAgent {
    type Observation = usize;

    fn act(&mut self, _obs: &usize) -> Result<usize> {
        self.act_calls += 1;
        Ok(self.action)
    }

    fn act_and_train(&mut self, _obs: &usize, _reward: f64) -> Result<usize> {
        self.train_calls += 1;
        self.t += 1;
        if let Some(every) = self.norms_every {
            if self.t % every == 0 {
                self.pending_norms.push(ParameterNorms {
                    name: "stub.weight".to_string(),
                    param_norm: self.t as f64,
                    grad_norm: 1.0,
                });
            }
        }
        Ok(self.action)
    }

    fn stop_episode_and_train(&mut self, _obs: &usize, reward: f64, done: bool) -> Result<()> {
        self.train_episode_ends.push((reward, done));
        Ok(())
    }

    fn stop_episode(&mut self) {
        self.stop_episode_calls += 1;
    }

    fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        std::fs::write(dir.join(STUB_SAVE_FILE), self.t.to_string())
            .with_context(|| format!("Failed to save stub agent to {:?}", dir))?;
        self.saved.borrow_mut().push(dir.to_path_buf());
        Ok(())
    }

    fn t(&self) -> u64 {
        self.t
    }

    fn average_q(&self) -> f64 {
        self.average_q
    }

    fn average_loss(&self) -> f64 {
        self.average_loss
    }

    fn kind(&self) -> &str {
        "StubAgentForTests"
    }

    fn take_parameter_norms(&mut self) -> Vec<ParameterNorms> {
        std::mem::take(&mut self.pending_norms)
    }
}

/// Write `images.txt` and `boxes.json`: two 100x50 images with one text box each
pub fn write_text_dataset(dir: &Path) {
    std::fs::write(dir.join("images.txt"), "./img/a.png\n./img/b.png\n").unwrap();
    std::fs::write(
        dir.join("boxes.json"),
        r#"[
            {"width": 100, "height": 50, "boxes": [[10, 10, 60, 30]]},
            {"width": 100, "height": 50, "boxes": [[40, 5, 90, 45]]}
        ]"#,
    )
    .unwrap();
}

/// A 40-step run over [`write_text_dataset`] with a tiny network
pub fn small_training_config(dir: &Path) -> TrainingConfig {
    let mut config = TrainingConfig {
        imagefile_path: dir.join("images.txt"),
        boxfile_path: dir.join("boxes.json"),
        resultdir_path: dir.join("result"),
        tensorboard_dir: dir.join("tensorboard"),
        steps: 40,
        eval_interval: 20,
        eval_n_episodes: 2,
        train_max_episode_len: 8,
        log_interval: 1,
        seed: Some(0),
        ..Default::default()
    };
    config.dqn.replay_start_size = 8;
    config.dqn.minibatch_size = 4;
    config.dqn.hidden_dim = 16;
    config.dqn.decay_steps = 20;
    config
}
