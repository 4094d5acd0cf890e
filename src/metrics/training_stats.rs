//! Rolling statistics over training episodes
//!
//! Used by the training loop for its periodic progress line. Evaluation
//! statistics go through [`MetricsAggregator`](super::MetricsAggregator)
//! instead.

use std::collections::VecDeque;

use super::stats;

/// Training statistics tracker with rolling averages
///
/// Tracks episode-level metrics (return, length, final IoU) and the agent's
/// running Q/loss averages sampled at episode ends.
///
/// # Example
///
/// ```rust
/// use ml_textloc::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(100);
/// stats.record_episode(3.0, 12, 0.71);
/// stats.record_agent(0.4, 0.02);
///
/// assert_eq!(stats.total_episodes(), 1);
/// println!("{}", stats.format_summary());
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    episode_rewards: VecDeque<f64>,
    episode_lengths: VecDeque<usize>,
    episode_ious: VecDeque<f64>,

    /// Last sampled agent averages
    average_q: f64,
    average_loss: f64,

    total_episodes: usize,
    total_steps: usize,

    window_size: usize,
}

impl TrainingStats {
    /// Create a tracker keeping the last `window_size` episodes
    pub fn new(window_size: usize) -> Self {
        Self {
            episode_rewards: VecDeque::with_capacity(window_size),
            episode_lengths: VecDeque::with_capacity(window_size),
            episode_ious: VecDeque::with_capacity(window_size),
            average_q: 0.0,
            average_loss: 0.0,
            total_episodes: 0,
            total_steps: 0,
            window_size,
        }
    }

    /// Record a finished training episode
    ///
    /// # Arguments
    ///
    /// * `reward` - Undiscounted return of the episode
    /// * `length` - Number of steps taken
    /// * `iou` - IoU of the box when the episode ended
    pub fn record_episode(&mut self, reward: f64, length: usize, iou: f64) {
        push_bounded(&mut self.episode_rewards, reward, self.window_size);
        push_bounded(&mut self.episode_lengths, length, self.window_size);
        push_bounded(&mut self.episode_ious, iou, self.window_size);
        self.total_episodes += 1;
        self.total_steps += length;
    }

    /// Sample the agent's running averages
    pub fn record_agent(&mut self, average_q: f64, average_loss: f64) {
        self.average_q = average_q;
        self.average_loss = average_loss;
    }

    /// Mean return over the window, 0.0 if no episodes were recorded
    pub fn mean_episode_reward(&self) -> f64 {
        window_mean(self.episode_rewards.iter().copied())
    }

    pub fn mean_episode_length(&self) -> f64 {
        window_mean(self.episode_lengths.iter().map(|&l| l as f64))
    }

    pub fn mean_episode_iou(&self) -> f64 {
        window_mean(self.episode_ious.iter().copied())
    }

    pub fn average_q(&self) -> f64 {
        self.average_q
    }

    pub fn average_loss(&self) -> f64 {
        self.average_loss
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    /// Environment steps summed over recorded episodes
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// One-line summary of the current statistics
    ///
    /// ```text
    /// Episodes: 1 | Steps: 12 | Reward: 3.00 | IoU: 0.710 | Len: 12.0 | Q: 0.4000 | Loss: 0.0200
    /// ```
    pub fn format_summary(&self) -> String {
        format!(
            "Episodes: {} | Steps: {} | Reward: {:.2} | IoU: {:.3} | Len: {:.1} | Q: {:.4} | Loss: {:.4}",
            self.total_episodes,
            self.total_steps,
            self.mean_episode_reward(),
            self.mean_episode_iou(),
            self.mean_episode_length(),
            self.average_q,
            self.average_loss,
        )
    }
}

fn window_mean(values: impl Iterator<Item = f64>) -> f64 {
    stats::mean(&values.collect::<Vec<_>>())
}

fn push_bounded<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
    if deque.len() >= window_size {
        deque.pop_front();
    }
    deque.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let stats = TrainingStats::new(100);
        assert_eq!(stats.window_size(), 100);
        assert_eq!(stats.total_episodes(), 0);
        assert_eq!(stats.total_steps(), 0);
        assert_eq!(stats.mean_episode_reward(), 0.0);
        assert_eq!(stats.mean_episode_length(), 0.0);
        assert_eq!(stats.mean_episode_iou(), 0.0);
    }

    #[test]
    fn test_record_episode() {
        let mut stats = TrainingStats::new(100);
        stats.record_episode(-2.0, 50, 0.25);

        assert_eq!(stats.total_episodes(), 1);
        assert_eq!(stats.total_steps(), 50);
        assert_eq!(stats.mean_episode_reward(), -2.0);
        assert_eq!(stats.mean_episode_length(), 50.0);
        assert_eq!(stats.mean_episode_iou(), 0.25);
    }

    #[test]
    fn test_rolling_window() {
        let mut stats = TrainingStats::new(3);
        stats.record_episode(1.0, 10, 0.1);
        stats.record_episode(2.0, 20, 0.2);
        stats.record_episode(3.0, 30, 0.3);
        assert_eq!(stats.mean_episode_reward(), 2.0);

        // evicts the first episode
        stats.record_episode(4.0, 40, 0.4);
        assert_eq!(stats.total_episodes(), 4);
        assert_eq!(stats.total_steps(), 100);
        assert_eq!(stats.mean_episode_reward(), 3.0);
        assert_eq!(stats.mean_episode_length(), 30.0);
    }

    #[test]
    fn test_format_summary() {
        let mut stats = TrainingStats::new(100);
        stats.record_episode(3.0, 12, 0.71);
        stats.record_agent(0.4, 0.02);

        let summary = stats.format_summary();
        assert!(summary.contains("Episodes: 1"));
        assert!(summary.contains("Steps: 12"));
        assert!(summary.contains("Reward: 3.00"));
        assert!(summary.contains("IoU: 0.710"));
        assert!(summary.contains("Len: 12.0"));
        assert!(summary.contains("Q: 0.4000"));
        assert!(summary.contains("Loss: 0.0200"));
    }
}
