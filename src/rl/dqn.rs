//! DQN (Deep Q-Network) agent implementation
//!
//! Epsilon-greedy action selection, episodic experience replay, Huber-loss
//! TD updates and a periodically synced target network.

use anyhow::{anyhow, Result};
use burn::{
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion, Int, Tensor, TensorData},
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

use super::agent::{Agent, ParameterNorms};
use super::buffer::{EpisodicReplayBuffer, Transition};
use super::config::DQNConfig;
use super::explorer::LinearDecayEpsilonGreedy;
use super::network::{QNetwork, QNetworkConfig};
use super::persistence::save_agent;
use crate::env::ActionSpace;

/// Decay of the running average of Q-values
const AVERAGE_Q_DECAY: f64 = 0.999;

/// Decay of the running average of the loss
const AVERAGE_LOSS_DECAY: f64 = 0.99;

/// DQN agent
///
/// # Type Parameters
///
/// * `B` - Autodiff backend for gradient computation
///
/// # Example
///
/// ```rust,ignore
/// use ml_textloc::env::ActionSpace;
/// use ml_textloc::rl::{default_device, DQNAgent, DQNConfig, TrainingBackend};
///
/// let agent = DQNAgent::<TrainingBackend>::new(
///     94,
///     ActionSpace::new(9),
///     DQNConfig::default(),
///     Some(0),
///     default_device(),
/// )?;
/// ```
pub struct DQNAgent<B: AutodiffBackend> {
    /// Online Q-network
    network: QNetwork<B>,

    /// Target Q-network, synced every `target_update_interval` steps
    target_network: QNetwork<B::InnerBackend>,

    /// Adam optimizer for the online network
    optim: OptimizerAdaptor<Adam, QNetwork<B>, B>,

    config: DQNConfig,
    explorer: LinearDecayEpsilonGreedy,
    replay_buffer: EpisodicReplayBuffer,
    action_space: ActionSpace,
    obs_dim: usize,
    rng: StdRng,

    /// Training step counter
    t: u64,

    /// Observation and action waiting for their reward
    last_state: Option<Vec<f32>>,
    last_action: Option<usize>,

    average_q: f64,
    average_loss: f64,

    /// Gradient updates applied so far
    n_updates: u64,

    /// Norms captured every `gradients_weights_log_interval` updates
    parameter_norms: Vec<ParameterNorms>,

    device: B::Device,
}

impl<B: AutodiffBackend> DQNAgent<B> {
    /// Create a new DQN agent with a freshly initialized network
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Length of the observation vector
    /// * `action_space` - Discrete action space, used for random actions
    /// * `config` - DQN hyperparameters
    /// * `seed` - Optional seed for exploration and replay sampling
    /// * `device` - Device for computation
    pub fn new(
        obs_dim: usize,
        action_space: ActionSpace,
        config: DQNConfig,
        seed: Option<u64>,
        device: B::Device,
    ) -> Result<Self> {
        let network = QNetworkConfig::new(obs_dim, action_space.n)
            .with_hidden_dim(config.hidden_dim)
            .init::<B>(&device);
        Self::with_network(network, obs_dim, action_space, config, seed, device)
    }

    /// Create a DQN agent around an existing network
    pub fn with_network(
        network: QNetwork<B>,
        obs_dim: usize,
        action_space: ActionSpace,
        config: DQNConfig,
        seed: Option<u64>,
        device: B::Device,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("Invalid DQN configuration: {}", e))?;

        let optim = AdamConfig::new().with_epsilon(config.epsilon).init();
        let explorer = LinearDecayEpsilonGreedy::new(
            config.start_epsilon,
            config.end_epsilon,
            config.decay_steps,
        );
        let replay_buffer = EpisodicReplayBuffer::new(config.replay_buffer_capacity);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let target_network = network.valid();

        Ok(Self {
            network,
            target_network,
            optim,
            config,
            explorer,
            replay_buffer,
            action_space,
            obs_dim,
            rng,
            t: 0,
            last_state: None,
            last_action: None,
            average_q: 0.0,
            average_loss: 0.0,
            n_updates: 0,
            parameter_norms: Vec::new(),
            device,
        })
    }

    /// Q-values of a single observation, computed without gradients
    fn q_values(&self, obs: &[f32]) -> Result<Vec<f32>> {
        if obs.len() != self.obs_dim {
            return Err(anyhow!(
                "observation has {} values, expected {}",
                obs.len(),
                self.obs_dim
            ));
        }
        let network = self.network.valid();
        let input = Tensor::<B::InnerBackend, 2>::from_data(
            TensorData::new(obs.to_vec(), [1, self.obs_dim]),
            &self.device,
        );
        network
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("failed to read Q-values: {:?}", e))
    }

    /// Store the transition completed by `reward` and `obs`
    fn record_transition(&mut self, obs: &[f32], reward: f64, terminal: bool) {
        if let (Some(state), Some(action)) = (self.last_state.take(), self.last_action.take()) {
            self.replay_buffer.append(Transition {
                state,
                action,
                reward: reward as f32,
                next_state: obs.to_vec(),
                is_state_terminal: terminal,
            });
        }
    }

    /// Run a gradient update if the replay buffer is warm and one is due
    fn update_if_necessary(&mut self) -> Result<()> {
        if self.replay_buffer.len() < self.config.replay_start_size.max(1) {
            return Ok(());
        }
        if self.t % self.config.update_interval != 0 {
            return Ok(());
        }
        let loss = self.update()?;
        self.average_loss =
            AVERAGE_LOSS_DECAY * self.average_loss + (1.0 - AVERAGE_LOSS_DECAY) * loss;
        Ok(())
    }

    /// One minibatch TD update; returns the loss value
    fn update(&mut self) -> Result<f64> {
        let batch: Vec<Transition> = self
            .replay_buffer
            .sample(self.config.minibatch_size, &mut self.rng)
            .into_iter()
            .cloned()
            .collect();
        let n = batch.len();
        if n == 0 {
            return Ok(0.0);
        }

        let states: Vec<f32> = batch.iter().flat_map(|t| t.state.iter().copied()).collect();
        let next_states: Vec<f32> = batch
            .iter()
            .flat_map(|t| t.next_state.iter().copied())
            .collect();
        let actions: Vec<i64> = batch.iter().map(|t| t.action as i64).collect();

        // Targets: r + γ * max_a' Q_target(s', a') for non-terminal s'
        let next_input = Tensor::<B::InnerBackend, 2>::from_data(
            TensorData::new(next_states, [n, self.obs_dim]),
            &self.device,
        );
        let next_max: Vec<f32> = self
            .target_network
            .forward(next_input)
            .max_dim(1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("failed to read target values: {:?}", e))?;
        let targets: Vec<f32> = batch
            .iter()
            .zip(next_max)
            .map(|(t, next)| {
                let mask = if t.is_state_terminal { 0.0 } else { 1.0 };
                t.reward + self.config.gamma * next * mask
            })
            .collect();

        let input: Tensor<B, 2> =
            Tensor::from_data(TensorData::new(states, [n, self.obs_dim]), &self.device);
        let actions: Tensor<B, 1, Int> =
            Tensor::from_data(TensorData::new(actions, [n]), &self.device);
        let targets: Tensor<B, 1> =
            Tensor::from_data(TensorData::new(targets, [n]), &self.device);

        let q_taken = self
            .network
            .forward(input)
            .gather(1, actions.unsqueeze_dim(1))
            .squeeze::<1>(1);
        let loss = huber_loss(q_taken, targets);
        let loss_value = loss.clone().into_scalar().elem::<f32>() as f64;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.network);
        self.n_updates += 1;
        let interval = self.config.gradients_weights_log_interval;
        if interval > 0 && self.n_updates % interval == 0 {
            self.parameter_norms = self.network.parameter_norms(&grads);
        }
        self.network = self
            .optim
            .step(self.config.learning_rate, self.network.clone(), grads);

        Ok(loss_value)
    }

    fn sync_target_if_necessary(&mut self) {
        if self.t % self.config.target_update_interval == 0 {
            self.target_network = self.network.valid();
        }
    }

    /// Get a reference to the online network
    pub fn network(&self) -> &QNetwork<B> {
        &self.network
    }

    /// Get a reference to the DQN configuration
    pub fn config(&self) -> &DQNConfig {
        &self.config
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    pub fn action_space(&self) -> ActionSpace {
        self.action_space
    }

    /// Number of transitions available for replay
    pub fn replay_len(&self) -> usize {
        self.replay_buffer.len()
    }

    pub fn n_updates(&self) -> u64 {
        self.n_updates
    }

    /// Restore the step counter of a loaded agent
    pub fn set_t(&mut self, t: u64) {
        self.t = t;
    }
}

impl<B: AutodiffBackend> Agent for DQNAgent<B> {
    type Observation = Vec<f32>;

    fn act(&mut self, obs: &Vec<f32>) -> Result<usize> {
        let q = self.q_values(obs)?;
        Ok(argmax(&q))
    }

    fn act_and_train(&mut self, obs: &Vec<f32>, reward: f64) -> Result<usize> {
        let q = self.q_values(obs)?;
        let greedy = argmax(&q);
        let max_q = q.get(greedy).copied().unwrap_or(0.0) as f64;
        self.average_q = AVERAGE_Q_DECAY * self.average_q + (1.0 - AVERAGE_Q_DECAY) * max_q;

        let action_space = self.action_space;
        let action = self.explorer.select(
            self.t,
            &mut self.rng,
            |rng| action_space.sample(rng),
            || greedy,
        );

        self.t += 1;
        self.record_transition(obs, reward, false);
        self.update_if_necessary()?;
        self.sync_target_if_necessary();

        self.last_state = Some(obs.clone());
        self.last_action = Some(action);
        Ok(action)
    }

    fn stop_episode_and_train(&mut self, obs: &Vec<f32>, reward: f64, done: bool) -> Result<()> {
        self.record_transition(obs, reward, done);
        self.stop_episode();
        Ok(())
    }

    fn stop_episode(&mut self) {
        self.last_state = None;
        self.last_action = None;
        self.replay_buffer.stop_current_episode();
    }

    fn save(&self, dir: &Path) -> Result<()> {
        save_agent(self, dir)
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
        "DQNAgent"
    }

    fn take_parameter_norms(&mut self) -> Vec<ParameterNorms> {
        std::mem::take(&mut self.parameter_norms)
    }
}

/// Mean Huber loss with delta 1
///
/// `0.5 * min(|d|, 1)^2 + (|d| - min(|d|, 1))`
fn huber_loss<B: AutodiffBackend>(predictions: Tensor<B, 1>, targets: Tensor<B, 1>) -> Tensor<B, 1> {
    let abs = (predictions - targets).abs();
    let quadratic = abs.clone().clamp_max(1.0);
    let linear = abs - quadratic.clone();
    (quadratic.powf_scalar(2.0) * 0.5 + linear).mean()
}

/// Index of the largest value (first on ties)
fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_idx, best), (idx, &v)| {
            if v > best {
                (idx, v)
            } else {
                (best_idx, best)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::{default_device, TrainingBackend};
    use tempfile::TempDir;

    fn small_config() -> DQNConfig {
        DQNConfig {
            replay_start_size: 4,
            minibatch_size: 4,
            hidden_dim: 8,
            target_update_interval: 5,
            decay_steps: 10,
            ..Default::default()
        }
    }

    fn create_test_agent() -> DQNAgent<TrainingBackend> {
        DQNAgent::new(6, ActionSpace::new(3), small_config(), Some(1), default_device()).unwrap()
    }

    #[test]
    fn test_agent_creation() {
        let agent = create_test_agent();
        assert_eq!(agent.t(), 0);
        assert_eq!(agent.average_q(), 0.0);
        assert_eq!(agent.average_loss(), 0.0);
        assert_eq!(agent.kind(), "DQNAgent");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DQNConfig {
            gamma: 2.0,
            ..small_config()
        };
        let result = DQNAgent::<TrainingBackend>::new(6, ActionSpace::new(3), config, None, default_device());
        assert!(result.is_err());
    }

    #[test]
    fn test_act_is_greedy_and_does_not_train() {
        let mut agent = create_test_agent();
        let obs = vec![0.5; 6];

        let first = agent.act(&obs).unwrap();
        for _ in 0..10 {
            assert_eq!(agent.act(&obs).unwrap(), first);
        }
        assert!(first < 3);
        assert_eq!(agent.t(), 0);
        assert_eq!(agent.replay_len(), 0);
    }

    #[test]
    fn test_wrong_observation_size_is_error() {
        let mut agent = create_test_agent();
        assert!(agent.act(&vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_training_steps_fill_replay_and_update() {
        let mut agent = create_test_agent();

        for episode in 0..3 {
            let mut reward = 0.0;
            for step in 0..4 {
                let obs = vec![(episode * 4 + step) as f32 / 12.0; 6];
                let action = agent.act_and_train(&obs, reward).unwrap();
                assert!(action < 3);
                reward = 1.0;
            }
            agent
                .stop_episode_and_train(&vec![1.0; 6], reward, true)
                .unwrap();
        }

        assert_eq!(agent.t(), 12);
        // 4 transitions per episode: 3 from act_and_train + 1 final
        assert_eq!(agent.replay_len(), 12);
        assert!(agent.average_q() != 0.0);
        assert!(agent.average_loss() > 0.0);
        assert!(agent.average_loss().is_finite());
    }

    #[test]
    fn test_truncated_episode_is_stored() {
        let mut agent = create_test_agent();
        agent.act_and_train(&vec![0.0; 6], 0.0).unwrap();
        agent.act_and_train(&vec![0.1; 6], 1.0).unwrap();
        agent
            .stop_episode_and_train(&vec![0.2; 6], 1.0, false)
            .unwrap();

        assert_eq!(agent.replay_len(), 2);
    }

    #[test]
    fn test_stop_episode_discards_pending_action() {
        let mut agent = create_test_agent();
        agent.act_and_train(&vec![0.0; 6], 0.0).unwrap();
        agent.stop_episode();
        agent.act_and_train(&vec![0.1; 6], 5.0).unwrap();
        agent.stop_episode();

        assert_eq!(agent.replay_len(), 0);
    }

    #[test]
    fn test_save_creates_files() {
        let temp_dir = TempDir::new().unwrap();
        let agent = create_test_agent();
        let dir = temp_dir.path().join("agent");

        agent.save(&dir).unwrap();

        assert!(dir.join("agent.meta.json").exists());
        assert!(dir.join("model.mpk").exists());
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.3]), 1);
        assert_eq!(argmax(&[1.0, 1.0]), 0);
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), 1);
    }

    #[test]
    fn test_parameter_norms_follow_update_cadence() {
        let config = DQNConfig {
            gradients_weights_log_interval: 2,
            ..small_config()
        };
        let mut agent =
            DQNAgent::<TrainingBackend>::new(6, ActionSpace::new(3), config, Some(1), default_device())
                .unwrap();

        // first episode only fills the buffer, the next two update on every step
        let mut captured = Vec::new();
        for episode in 0..3 {
            for step in 0..4 {
                let obs = vec![(episode * 4 + step) as f32 / 12.0; 6];
                agent.act_and_train(&obs, 1.0).unwrap();
                let norms = agent.take_parameter_norms();
                if !norms.is_empty() {
                    captured.push((agent.n_updates(), norms));
                }
            }
            agent
                .stop_episode_and_train(&vec![1.0; 6], 1.0, true)
                .unwrap();
        }

        assert_eq!(agent.n_updates(), 8);
        let at: Vec<u64> = captured.iter().map(|(n, _)| *n).collect();
        assert_eq!(at, vec![2, 4, 6, 8]);
        for (_, norms) in &captured {
            assert_eq!(norms.len(), 6);
            assert!(norms.iter().all(|n| n.param_norm > 0.0 && n.grad_norm.is_finite()));
        }
        assert!(agent.take_parameter_norms().is_empty());
    }

    #[test]
    fn test_parameter_norms_disabled() {
        let config = DQNConfig {
            gradients_weights_log_interval: 0,
            ..small_config()
        };
        let mut agent =
            DQNAgent::<TrainingBackend>::new(6, ActionSpace::new(3), config, Some(1), default_device())
                .unwrap();

        for episode in 0..3 {
            for step in 0..4 {
                let obs = vec![(episode * 4 + step) as f32 / 12.0; 6];
                agent.act_and_train(&obs, 1.0).unwrap();
                assert!(agent.take_parameter_norms().is_empty());
            }
            agent
                .stop_episode_and_train(&vec![1.0; 6], 1.0, true)
                .unwrap();
        }
        assert_eq!(agent.n_updates(), 8);
    }
}
