//! DQN algorithm hyperparameter configuration

use serde::{Deserialize, Serialize};

/// Configuration for the DQN (Deep Q-Network) agent
///
/// Contains the exploration schedule, replay settings, update cadence and
/// optimizer settings.
///
/// # Example
///
/// ```rust
/// use ml_textloc::rl::DQNConfig;
///
/// let config = DQNConfig {
///     gamma: 0.9,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DQNConfig {
    /// Epsilon at the start of the linear decay
    ///
    /// Default: 1.0
    pub start_epsilon: f64,

    /// Epsilon after `decay_steps`
    ///
    /// Default: 0.1
    pub end_epsilon: f64,

    /// Number of steps over which epsilon decays linearly
    ///
    /// Default: 300000
    pub decay_steps: u64,

    /// Maximum number of transitions held by the replay buffer
    ///
    /// Whole episodes are evicted once this is exceeded.
    ///
    /// Default: 20000
    pub replay_buffer_capacity: usize,

    /// Discount factor for future rewards
    ///
    /// Default: 0.95
    pub gamma: f32,

    /// Minimum number of stored transitions before updates start
    ///
    /// Default: 500
    pub replay_start_size: usize,

    /// Steps between gradient updates
    ///
    /// Default: 1
    pub update_interval: u64,

    /// Steps between target network syncs
    ///
    /// Default: 100
    pub target_update_interval: u64,

    /// Learning rate for Adam
    ///
    /// Default: 1e-4
    pub learning_rate: f64,

    /// Adam epsilon (numerical stability term)
    ///
    /// Default: 1e-2
    pub epsilon: f32,

    /// Transitions per gradient update
    ///
    /// Default: 32
    pub minibatch_size: usize,

    /// Hidden layer width of the Q-network
    ///
    /// Default: 256
    pub hidden_dim: usize,

    /// Gradient updates between parameter/gradient norm snapshots, 0 disables
    ///
    /// Default: 100
    pub gradients_weights_log_interval: u64,
}

impl DQNConfig {
    /// Validate configuration parameters
    ///
    /// # Returns
    ///
    /// `Ok(())` if all parameters are valid, `Err(String)` with an error message otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.start_epsilon) {
            return Err(format!(
                "start_epsilon must be in [0, 1], got {}",
                self.start_epsilon
            ));
        }

        if !(0.0..=1.0).contains(&self.end_epsilon) {
            return Err(format!(
                "end_epsilon must be in [0, 1], got {}",
                self.end_epsilon
            ));
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(format!("gamma must be in [0, 1], got {}", self.gamma));
        }

        if self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }

        if self.epsilon <= 0.0 {
            return Err(format!("epsilon must be positive, got {}", self.epsilon));
        }

        if self.replay_buffer_capacity == 0 {
            return Err("replay_buffer_capacity must be at least 1".to_string());
        }

        if self.update_interval == 0 {
            return Err("update_interval must be at least 1".to_string());
        }

        if self.target_update_interval == 0 {
            return Err("target_update_interval must be at least 1".to_string());
        }

        if self.minibatch_size == 0 {
            return Err("minibatch_size must be at least 1".to_string());
        }

        if self.minibatch_size > self.replay_start_size.max(1) {
            return Err(format!(
                "minibatch_size ({}) cannot exceed replay_start_size ({})",
                self.minibatch_size, self.replay_start_size
            ));
        }

        if self.hidden_dim == 0 {
            return Err("hidden_dim must be at least 1".to_string());
        }

        Ok(())
    }
}

impl Default for DQNConfig {
    fn default() -> Self {
        Self {
            start_epsilon: 1.0,
            end_epsilon: 0.1,
            decay_steps: 300_000,
            replay_buffer_capacity: 20_000,
            gamma: 0.95,
            replay_start_size: 500,
            update_interval: 1,
            target_update_interval: 100,
            learning_rate: 1e-4,
            epsilon: 1e-2,
            minibatch_size: 32,
            hidden_dim: 256,
            gradients_weights_log_interval: 100,
        }
    }
}
