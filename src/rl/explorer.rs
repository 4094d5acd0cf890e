use rand::Rng;

/// Epsilon-greedy exploration with a linearly decaying epsilon
#[derive(Debug, Clone)]
pub struct LinearDecayEpsilonGreedy {
    start_epsilon: f64,
    end_epsilon: f64,
    decay_steps: u64,
}

impl LinearDecayEpsilonGreedy {
    pub fn new(start_epsilon: f64, end_epsilon: f64, decay_steps: u64) -> Self {
        Self {
            start_epsilon,
            end_epsilon,
            decay_steps,
        }
    }

    /// Epsilon at step `t`
    pub fn epsilon(&self, t: u64) -> f64 {
        if t >= self.decay_steps {
            self.end_epsilon
        } else {
            let progress = t as f64 / self.decay_steps as f64;
            self.start_epsilon + (self.end_epsilon - self.start_epsilon) * progress
        }
    }

    /// Pick between a random and the greedy action
    ///
    /// The greedy action is only computed when it is actually used.
    pub fn select<R, G, F>(&self, t: u64, rng: &mut R, random_action: F, greedy_action: G) -> usize
    where
        R: Rng + ?Sized,
        F: FnOnce(&mut R) -> usize,
        G: FnOnce() -> usize,
    {
        if rng.gen::<f64>() < self.epsilon(t) {
            random_action(rng)
        } else {
            greedy_action()
        }
    }
}
