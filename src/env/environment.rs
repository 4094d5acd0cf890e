use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use super::action::{BoxAction, NUM_ACTIONS};
use super::bbox::BoundingBox;
use super::config::EnvConfig;
use super::dataset::Dataset;
use super::observation::{create_observation, observation_size};

/// Discrete action space of an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpace {
    /// Number of actions
    pub n: usize,
}

impl ActionSpace {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Uniformly sample an action index
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.n)
    }
}

/// Extra information returned by a step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepInfo {
    /// IoU after the step
    pub iou: f64,
}

/// Result of an environment step
#[derive(Debug, Clone)]
pub struct Step<O> {
    pub observation: O,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// Environment interface used by the training loop
///
/// Besides the usual reset/step protocol the environment exposes the
/// episode-level localization accuracy: the IoU of the current box and the
/// best IoU reached since the last reset.
pub trait Environment {
    type Observation: Clone;

    /// Start a new episode and return its first observation
    fn reset(&mut self) -> Result<Self::Observation>;

    /// Apply an action
    fn step(&mut self, action: usize) -> Result<Step<Self::Observation>>;

    fn action_space(&self) -> ActionSpace;

    /// IoU of the current box against the ground truth
    fn iou(&self) -> f64;

    /// Best IoU seen in the current episode
    fn max_iou(&self) -> f64;
}

/// Text localization environment
///
/// Each episode picks a random image and starts with a box covering the whole
/// image. Actions move, scale or reshape the box; the trigger action ends the
/// episode. Rewards:
/// - move/scale: sign of the IoU change
/// - trigger: `+trigger_reward` if `iou >= iou_threshold`, `-trigger_reward` otherwise
pub struct TextLocEnvironment {
    dataset: Dataset,
    config: EnvConfig,
    rng: StdRng,
    current: usize,
    bbox: BoundingBox,
    history: VecDeque<usize>,
    iou: f64,
    max_iou: f64,
}

impl TextLocEnvironment {
    /// Create a new environment over a dataset
    pub fn new(dataset: Dataset, config: EnvConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (width, height) = dataset
            .get(0)
            .map(|s| (s.width, s.height))
            .unwrap_or((1, 1));

        Self {
            dataset,
            config,
            rng,
            current: 0,
            bbox: BoundingBox::full(width, height),
            history: VecDeque::new(),
            iou: 0.0,
            max_iou: 0.0,
        }
    }

    /// Length of the observation vector
    pub fn observation_size(&self) -> usize {
        observation_size(self.config.history_length)
    }

    /// Current bounding box
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn compute_iou(&self) -> Result<f64> {
        let sample = self.current_sample()?;
        Ok(sample
            .gt_boxes
            .iter()
            .map(|gt| self.bbox.iou(gt))
            .fold(0.0, f64::max))
    }

    fn current_sample(&self) -> Result<&super::dataset::Sample> {
        self.dataset
            .get(self.current)
            .ok_or_else(|| anyhow!("sample index {} out of range", self.current))
    }

    fn observation(&self) -> Result<Vec<f32>> {
        let sample = self.current_sample()?;
        Ok(create_observation(
            &self.bbox,
            sample.width,
            sample.height,
            &self.history,
            self.config.history_length,
        ))
    }
}

impl Environment for TextLocEnvironment {
    type Observation = Vec<f32>;

    fn reset(&mut self) -> Result<Vec<f32>> {
        self.current = self.rng.gen_range(0..self.dataset.len());
        let sample = self.current_sample()?;
        self.bbox = BoundingBox::full(sample.width, sample.height);
        self.history.clear();
        self.iou = self.compute_iou()?;
        self.max_iou = self.iou;
        self.observation()
    }

    fn step(&mut self, action_idx: usize) -> Result<Step<Vec<f32>>> {
        let action = BoxAction::from_index(action_idx)
            .ok_or_else(|| anyhow!("invalid action index {}", action_idx))?;

        self.history.push_front(action_idx);
        self.history.truncate(self.config.history_length);

        let (reward, done) = if action == BoxAction::Trigger {
            let reward = if self.iou >= self.config.iou_threshold {
                self.config.trigger_reward
            } else {
                -self.config.trigger_reward
            };
            (reward as f64, true)
        } else {
            let sample = self.current_sample()?;
            let (width, height) = (sample.width, sample.height);
            let old_iou = self.iou;
            self.bbox = self
                .bbox
                .transformed(action, self.config.alpha, width, height);
            self.iou = self.compute_iou()?;
            self.max_iou = self.max_iou.max(self.iou);
            (sign(self.iou - old_iou), false)
        };

        Ok(Step {
            observation: self.observation()?,
            reward,
            done,
            info: StepInfo { iou: self.iou },
        })
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::new(NUM_ACTIONS)
    }

    fn iou(&self) -> f64 {
        self.iou
    }

    fn max_iou(&self) -> f64 {
        self.max_iou
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}
