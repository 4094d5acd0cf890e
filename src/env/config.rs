use serde::{Deserialize, Serialize};

/// Configuration for the text localization environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Fraction of the box size moved or scaled per action
    pub alpha: f32,
    /// Reward magnitude for the trigger action (positive on a hit, negative on a miss)
    pub trigger_reward: f32,
    /// IoU at or above which a trigger counts as a hit
    pub iou_threshold: f64,
    /// Number of past actions encoded in the observation
    pub history_length: usize,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            trigger_reward: 3.0,
            iou_threshold: 0.5,
            history_length: 10,
        }
    }
}

impl EnvConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.alpha <= 0.0 || self.alpha >= 1.0 {
            return Err(format!("alpha must be in (0, 1), got {}", self.alpha));
        }

        if self.trigger_reward < 0.0 {
            return Err(format!(
                "trigger_reward must be non-negative, got {}",
                self.trigger_reward
            ));
        }

        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(format!(
                "iou_threshold must be in [0, 1], got {}",
                self.iou_threshold
            ));
        }

        Ok(())
    }
}
