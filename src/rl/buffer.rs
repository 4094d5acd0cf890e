//! Episodic experience replay buffer for DQN
//!
//! Transitions are appended to the episode in progress. Only completed
//! episodes are sampled from, and when the stored transition count exceeds the
//! capacity the oldest whole episodes are evicted.

use rand::Rng;
use std::collections::VecDeque;

/// A single environment transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    /// True if `next_state` is terminal (no bootstrapping from it)
    pub is_state_terminal: bool,
}

/// Replay buffer grouping transitions by episode
///
/// # Example
///
/// ```rust
/// use ml_textloc::rl::{EpisodicReplayBuffer, Transition};
///
/// let mut buffer = EpisodicReplayBuffer::new(100);
/// buffer.append(Transition {
///     state: vec![0.0],
///     action: 0,
///     reward: 1.0,
///     next_state: vec![1.0],
///     is_state_terminal: true,
/// });
///
/// // Terminal transitions close the episode, making it sampleable
/// assert_eq!(buffer.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EpisodicReplayBuffer {
    /// Completed episodes, oldest first
    episodes: VecDeque<Vec<Transition>>,

    /// Episode in progress
    current_episode: Vec<Transition>,

    /// Transitions stored in completed episodes
    len: usize,

    /// Maximum number of transitions kept in completed episodes
    capacity: usize,
}

impl EpisodicReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            episodes: VecDeque::new(),
            current_episode: Vec::new(),
            len: 0,
            capacity,
        }
    }

    /// Add a transition to the current episode
    ///
    /// A terminal transition closes the episode.
    pub fn append(&mut self, transition: Transition) {
        let terminal = transition.is_state_terminal;
        self.current_episode.push(transition);
        if terminal {
            self.stop_current_episode();
        }
    }

    /// Close the current episode and make it available for sampling
    pub fn stop_current_episode(&mut self) {
        if self.current_episode.is_empty() {
            return;
        }
        let episode = std::mem::take(&mut self.current_episode);
        self.len += episode.len();
        self.episodes.push_back(episode);

        while self.len > self.capacity && self.episodes.len() > 1 {
            if let Some(evicted) = self.episodes.pop_front() {
                self.len -= evicted.len();
            }
        }
    }

    /// Number of sampleable transitions
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of completed episodes stored
    pub fn n_episodes(&self) -> usize {
        self.episodes.len()
    }

    /// Sample `n` transitions uniformly (with replacement) from completed episodes
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<&Transition> {
        if self.len == 0 {
            return Vec::new();
        }
        (0..n)
            .filter_map(|_| self.get(rng.gen_range(0..self.len)))
            .collect()
    }

    /// Transition at a flat index across completed episodes
    fn get(&self, mut idx: usize) -> Option<&Transition> {
        for episode in &self.episodes {
            if idx < episode.len() {
                return episode.get(idx);
            }
            idx -= episode.len();
        }
        None
    }
}
