//! Backend selection
//!
//! Training and evaluation both run on the autodiff NdArray backend; the
//! evaluation path reaches the plain backend through `Module::valid()`. The
//! Q-network is a small MLP over box geometry and action history, so the CPU
//! is enough.

use burn::backend::{
    ndarray::{NdArray, NdArrayDevice},
    Autodiff,
};
use tracing::warn;

/// Backend type for training (with autodiff)
pub type TrainingBackend = Autodiff<NdArray<f32>>;

pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}

/// Device for a configured `gpu_id`
///
/// `-1` selects the CPU. Any other id falls back to the CPU with a warning,
/// since no GPU backend is compiled in.
pub fn device_for(gpu_id: i32) -> NdArrayDevice {
    if gpu_id != -1 {
        warn!(
            "gpu_id {} requested, but only the CPU ndarray backend is available",
            gpu_id
        );
    }
    default_device()
}
