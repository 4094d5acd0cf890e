//! Q-network for the DQN agent
//!
//! # Architecture
//!
//! ```text
//! Input: [batch, obs_dim]
//!   ↓ Linear(obs_dim → hidden) + ReLU
//!   ↓ Linear(hidden → hidden) + ReLU
//!   ↓ Linear(hidden → num_actions)
//! Output: [batch, num_actions] action values
//! ```
//!
//! # Example
//!
//! ```rust
//! use ml_textloc::rl::QNetworkConfig;
//! use burn::backend::ndarray::NdArrayDevice;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray<f32>;
//!
//! let device = NdArrayDevice::default();
//! let network = QNetworkConfig::new(94, 9).init::<Backend>(&device);
//!
//! let observation = Tensor::zeros([4, 94], &device);
//! assert_eq!(network.forward(observation).dims(), [4, 9]);
//! ```

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    optim::GradientsParams,
    tensor::{
        activation::relu,
        backend::{AutodiffBackend, Backend},
        ElementConversion, Tensor,
    },
};

use super::agent::ParameterNorms;

/// Configuration for the Q-network
#[derive(Debug, Clone)]
pub struct QNetworkConfig {
    /// Length of the observation vector
    pub obs_dim: usize,

    /// Number of discrete actions
    pub num_actions: usize,

    /// Width of both hidden layers (default: 256)
    pub hidden_dim: usize,
}

impl QNetworkConfig {
    /// Create a new configuration with the default hidden width
    pub fn new(obs_dim: usize, num_actions: usize) -> Self {
        Self {
            obs_dim,
            num_actions,
            hidden_dim: 256,
        }
    }

    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    /// Initialize the Q-network from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        QNetwork {
            fc1: LinearConfig::new(self.obs_dim, self.hidden_dim).init(device),
            fc2: LinearConfig::new(self.hidden_dim, self.hidden_dim).init(device),
            q_head: LinearConfig::new(self.hidden_dim, self.num_actions).init(device),
        }
    }
}

/// Fully connected action-value network
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    /// Outputs one value per action
    q_head: Linear<B>,
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: `[batch, obs_dim]` → `[batch, num_actions]`
    pub fn forward(&self, observation: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(observation));
        let x = relu(self.fc2.forward(x));
        self.q_head.forward(x)
    }

    fn layers(&self) -> [(&'static str, &Linear<B>); 3] {
        [("fc1", &self.fc1), ("fc2", &self.fc2), ("q_head", &self.q_head)]
    }
}

impl<B: AutodiffBackend> QNetwork<B> {
    /// Weight and bias norms of every layer next to the norms of `grads`
    ///
    /// A parameter without a gradient reports a gradient norm of 0.
    pub fn parameter_norms(&self, grads: &GradientsParams) -> Vec<ParameterNorms> {
        let mut norms = Vec::with_capacity(6);
        for (layer_name, layer) in self.layers() {
            let grad = grads
                .get::<B::InnerBackend, 2>(layer.weight.id)
                .map_or(0.0, l2_norm);
            norms.push(ParameterNorms {
                name: format!("{}.weight", layer_name),
                param_norm: l2_norm(layer.weight.val().inner()),
                grad_norm: grad,
            });

            if let Some(bias) = &layer.bias {
                let grad = grads
                    .get::<B::InnerBackend, 1>(bias.id)
                    .map_or(0.0, l2_norm);
                norms.push(ParameterNorms {
                    name: format!("{}.bias", layer_name),
                    param_norm: l2_norm(bias.val().inner()),
                    grad_norm: grad,
                });
            }
        }
        norms
    }
}

fn l2_norm<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> f64 {
    tensor
        .powf_scalar(2.0)
        .sum()
        .sqrt()
        .into_scalar()
        .elem::<f32>() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::backend::Autodiff;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_forward_pass_shapes() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new(10, 9)
            .with_hidden_dim(16)
            .init::<TestBackend>(&device);

        for batch_size in [1, 4, 32] {
            let observation = Tensor::zeros([batch_size, 10], &device);
            assert_eq!(network.forward(observation).dims(), [batch_size, 9]);
        }
    }

    #[test]
    fn test_outputs_are_finite() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new(10, 9)
            .with_hidden_dim(16)
            .init::<TestBackend>(&device);

        let observation = Tensor::random([8, 10], Distribution::Normal(0.0, 1.0), &device);
        let values: Vec<f32> = network.forward(observation).into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_parameter_norms_cover_every_layer() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new(10, 9)
            .with_hidden_dim(16)
            .init::<Autodiff<TestBackend>>(&device);

        let observation = Tensor::random([4, 10], Distribution::Normal(0.0, 1.0), &device);
        let loss = network.forward(observation).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &network);

        let norms = network.parameter_norms(&grads);
        let names: Vec<&str> = norms.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["fc1.weight", "fc1.bias", "fc2.weight", "fc2.bias", "q_head.weight", "q_head.bias"]
        );
        assert!(norms.iter().all(|n| n.param_norm > 0.0 && n.param_norm.is_finite()));
        assert!(norms.iter().all(|n| n.grad_norm.is_finite()));
        // d(sum)/d(bias) of the output layer is the batch size for every action
        let head_bias = &norms[5];
        assert!((head_bias.grad_norm - (4.0f64 * 4.0 * 9.0).sqrt()).abs() < 1e-4);
    }
}
