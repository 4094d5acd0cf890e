//! Evaluation events and scalar metric events
//!
//! The `Display` implementations here define the log line formats that
//! [`parse_line`](super::parser::parse_line) recognizes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one evaluation episode
///
/// `index` is the position of the episode inside its evaluation round
/// (0-based), not a global counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeRecord {
    pub index: usize,
    pub length: usize,
    pub reward: f64,
    pub iou: f64,
    pub max_iou: f64,
}

impl fmt::Display for EpisodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "evaluation episode {} length:{} R:{} IoU:{} Max_IoU:{}",
            self.index, self.length, self.reward, self.iou, self.max_iou
        )
    }
}

/// Best evaluation score improvement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewBestScore {
    pub previous: f64,
    pub score: f64,
}

impl fmt::Display for NewBestScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The best score is updated {} -> {}",
            self.previous, self.score
        )
    }
}

/// Structured event produced during evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvaluationEvent {
    /// The best mean evaluation score improved to this value
    NewBest(f64),
    /// One evaluation episode finished
    EpisodeResult(EpisodeRecord),
}

/// A scalar sent to a metrics sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    pub name: String,
    pub value: f64,
    /// Training step the value belongs to
    pub step: u64,
}

impl MetricEvent {
    pub fn new(name: impl Into<String>, value: f64, step: u64) -> Self {
        Self {
            name: name.into(),
            value,
            step,
        }
    }
}
