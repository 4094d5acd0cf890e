use std::collections::VecDeque;

use super::action::NUM_ACTIONS;
use super::bbox::BoundingBox;

/// Length of the observation vector for a given action history length
pub fn observation_size(history_length: usize) -> usize {
    4 + history_length * NUM_ACTIONS
}

/// Create a flat observation from the current box and action history
///
/// Layout:
/// - `[0..4]`: box corners normalized by image size (`x0/w, y0/h, x1/w, y1/h`)
/// - `[4..]`: one-hot encoding of the last `history_length` actions, most
///   recent first; missing entries stay zero
pub fn create_observation(
    bbox: &BoundingBox,
    width: u32,
    height: u32,
    history: &VecDeque<usize>,
    history_length: usize,
) -> Vec<f32> {
    let mut obs = vec![0.0; observation_size(history_length)];
    let (w, h) = (width as f32, height as f32);
    obs[0] = bbox.x0 / w;
    obs[1] = bbox.y0 / h;
    obs[2] = bbox.x1 / w;
    obs[3] = bbox.y1 / h;

    for (slot, &action) in history.iter().take(history_length).enumerate() {
        obs[4 + slot * NUM_ACTIONS + action] = 1.0;
    }

    obs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_layout() {
        let bbox = BoundingBox::new(10.0, 5.0, 60.0, 25.0);
        let history: VecDeque<usize> = VecDeque::from(vec![3, 0]);

        let obs = create_observation(&bbox, 100, 50, &history, 4);

        assert_eq!(obs.len(), observation_size(4));
        assert_eq!(&obs[..4], &[0.1, 0.1, 0.6, 0.5]);
        assert_eq!(obs[4 + 3], 1.0);
        assert_eq!(obs[4 + NUM_ACTIONS], 1.0);
        assert_eq!(obs.iter().skip(4).filter(|&&v| v == 1.0).count(), 2);
    }

    #[test]
    fn test_empty_history_is_zero() {
        let bbox = BoundingBox::full(10, 10);
        let obs = create_observation(&bbox, 10, 10, &VecDeque::new(), 2);
        assert!(obs[4..].iter().all(|&v| v == 0.0));
    }
}
