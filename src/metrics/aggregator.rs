//! Evaluation round aggregation
//!
//! Episode results are collected into a fixed number of slots. When every
//! slot of the round has been filled, seven aggregate scalars are sent to the
//! sink at the step supplied with the completing event, and the round starts
//! over.

use super::event::{EpisodeRecord, EvaluationEvent};
use super::sink::MetricsSink;
use super::stats;
use anyhow::Result;
use tracing::warn;

pub const NEW_BEST_SCORE: &str = "evaluation_new_best_score";
pub const LENGTH_MEAN: &str = "evaluation_length_mean";
pub const REWARD_MEAN: &str = "evaluation_reward_mean";
pub const REWARD_MEDIAN: &str = "evaluation_reward_median";
pub const REWARD_VARIANCE: &str = "evaluation_reward_variance";
pub const IOU_MEAN: &str = "evaluation_iou_mean";
pub const IOU_MEDIAN: &str = "evaluation_iou_median";
pub const MAX_IOU_MEAN: &str = "evaluation_max_iou_mean";

/// Names of the scalars emitted when a round completes, in emission order
pub const ROUND_SCALARS: [&str; 7] = [
    LENGTH_MEAN,
    REWARD_MEAN,
    REWARD_MEDIAN,
    REWARD_VARIANCE,
    IOU_MEAN,
    IOU_MEDIAN,
    MAX_IOU_MEAN,
];

/// One round's worth of episode slots
#[derive(Debug, Clone)]
struct EvaluationRound {
    slots: Vec<Option<EpisodeRecord>>,
    filled: usize,
}

impl EvaluationRound {
    fn new(n_episodes: usize) -> Self {
        Self {
            slots: vec![None; n_episodes],
            filled: 0,
        }
    }

    fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.filled = 0;
    }

    fn records(&self) -> impl Iterator<Item = &EpisodeRecord> {
        self.slots.iter().flatten()
    }
}

/// Turns evaluation events into step-indexed scalars
///
/// # Example
///
/// ```rust
/// use ml_textloc::metrics::{EpisodeRecord, EvaluationEvent, MemorySink, MetricsAggregator};
///
/// let mut aggregator = MetricsAggregator::new(2);
/// let mut sink = MemorySink::new();
///
/// for index in 0..2 {
///     let record = EpisodeRecord { index, length: 3, reward: 1.0, iou: 0.6, max_iou: 0.7 };
///     aggregator
///         .handle(&EvaluationEvent::EpisodeResult(record), 500, &mut sink)
///         .unwrap();
/// }
///
/// assert_eq!(sink.series("evaluation_reward_mean"), vec![(500, 1.0)]);
/// ```
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    round: EvaluationRound,
    rounds_completed: usize,
}

impl MetricsAggregator {
    /// Create an aggregator for rounds of `n_episodes` episodes
    ///
    /// `n_episodes` must be positive; a zero-sized round never completes.
    pub fn new(n_episodes: usize) -> Self {
        Self {
            round: EvaluationRound::new(n_episodes),
            rounds_completed: 0,
        }
    }

    pub fn n_episodes(&self) -> usize {
        self.round.slots.len()
    }

    /// Episodes stored for the round in progress
    pub fn pending(&self) -> usize {
        self.round.filled
    }

    pub fn rounds_completed(&self) -> usize {
        self.rounds_completed
    }

    /// Process one event at training step `step`
    ///
    /// Returns `true` when the event completed a round and its scalars were
    /// emitted.
    pub fn handle(
        &mut self,
        event: &EvaluationEvent,
        step: u64,
        sink: &mut dyn MetricsSink,
    ) -> Result<bool> {
        match event {
            EvaluationEvent::NewBest(score) => {
                sink.scalar(NEW_BEST_SCORE, *score, step)?;
                Ok(false)
            }
            EvaluationEvent::EpisodeResult(record) => self.store(*record, step, sink),
        }
    }

    fn store(&mut self, record: EpisodeRecord, step: u64, sink: &mut dyn MetricsSink) -> Result<bool> {
        let n_episodes = self.n_episodes();
        let Some(slot) = self.round.slots.get_mut(record.index) else {
            warn!(
                "Ignoring evaluation episode {}: round holds {} episodes",
                record.index, n_episodes
            );
            return Ok(false);
        };

        if slot.is_some() {
            warn!(
                "Evaluation episode {} reported twice in one round, keeping the latest",
                record.index
            );
        } else {
            self.round.filled += 1;
        }
        *slot = Some(record);

        if !self.round.is_complete() {
            return Ok(false);
        }

        self.flush(step, sink)?;
        self.round.clear();
        self.rounds_completed += 1;
        Ok(true)
    }

    fn flush(&self, step: u64, sink: &mut dyn MetricsSink) -> Result<()> {
        let lengths: Vec<f64> = self.round.records().map(|r| r.length as f64).collect();
        let rewards: Vec<f64> = self.round.records().map(|r| r.reward).collect();
        let ious: Vec<f64> = self.round.records().map(|r| r.iou).collect();
        let max_ious: Vec<f64> = self.round.records().map(|r| r.max_iou).collect();

        let values = [
            stats::mean(&lengths),
            stats::mean(&rewards),
            stats::median(&rewards),
            stats::variance(&rewards),
            stats::mean(&ious),
            stats::median(&ious),
            stats::mean(&max_ious),
        ];
        for (name, value) in ROUND_SCALARS.iter().zip(values) {
            sink.scalar(name, value, step)?;
        }
        Ok(())
    }
}
