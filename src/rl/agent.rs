use anyhow::Result;
use std::path::Path;

/// L2 norms of one network parameter and of its latest gradient
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterNorms {
    /// Parameter path such as `fc1.weight`
    pub name: String,
    pub param_norm: f64,
    pub grad_norm: f64,
}

impl ParameterNorms {
    pub fn param_scalar_name(&self) -> String {
        format!("{}/param_norm", self.name)
    }

    pub fn grad_scalar_name(&self) -> String {
        format!("{}/grad_norm", self.name)
    }
}

/// Agent interface used by the training and evaluation loops
///
/// The learning half (`act_and_train`, `stop_episode_and_train`) is only
/// called by the training loop. Evaluation uses `act` and `stop_episode`,
/// which never update weights.
pub trait Agent {
    type Observation;

    /// Select a greedy action without exploring or learning
    fn act(&mut self, obs: &Self::Observation) -> Result<usize>;

    /// Record `reward` for the previous action, learn if due, and select the
    /// next (exploratory) action for `obs`
    fn act_and_train(&mut self, obs: &Self::Observation, reward: f64) -> Result<usize>;

    /// Record the final transition of an episode and close it
    ///
    /// `done` is false when the episode was truncated rather than terminated.
    fn stop_episode_and_train(
        &mut self,
        obs: &Self::Observation,
        reward: f64,
        done: bool,
    ) -> Result<()>;

    /// Close the current episode without learning
    fn stop_episode(&mut self);

    /// Persist the learned state into `dir`
    fn save(&self, dir: &Path) -> Result<()>;

    /// Number of training steps taken so far
    fn t(&self) -> u64;

    /// Running average of the max Q-value of selected actions
    fn average_q(&self) -> f64;

    /// Running average of the training loss
    fn average_loss(&self) -> f64;

    /// Short type name used in artifact names
    fn kind(&self) -> &str;

    /// Parameter norms captured since the last call, if any
    ///
    /// Agents without gradient statistics return nothing.
    fn take_parameter_norms(&mut self) -> Vec<ParameterNorms> {
        Vec::new()
    }
}
