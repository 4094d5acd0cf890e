//! Rebuild evaluation scalars from a saved training log
//!
//! Evaluations run every `eval_interval` training steps, so the k-th
//! completed round (1-based) belongs to step `k * eval_interval`. A new-best
//! line follows the episodes of its round and is attributed to the step of
//! the most recently completed round.

use super::aggregator::MetricsAggregator;
use super::event::EvaluationEvent;
use super::parser::parse_line;
use super::sink::MetricsSink;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Counts collected while replaying a log
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub lines: usize,
    pub episodes: usize,
    pub new_bests: usize,
    pub rounds: usize,
}

/// Feeds log lines through the parser and aggregator
pub struct LogReplay {
    aggregator: MetricsAggregator,
    eval_interval: u64,
    summary: ReplaySummary,
}

impl LogReplay {
    pub fn new(eval_n_episodes: usize, eval_interval: u64) -> Self {
        Self {
            aggregator: MetricsAggregator::new(eval_n_episodes),
            eval_interval,
            summary: ReplaySummary::default(),
        }
    }

    /// Process one line; lines without an evaluation event are skipped
    pub fn feed_line(&mut self, line: &str, sink: &mut dyn MetricsSink) -> Result<()> {
        self.summary.lines += 1;
        let Some(event) = parse_line(line) else {
            return Ok(());
        };

        let completed = self.aggregator.rounds_completed() as u64;
        let step = match event {
            EvaluationEvent::NewBest(_) => {
                self.summary.new_bests += 1;
                completed * self.eval_interval
            }
            EvaluationEvent::EpisodeResult(_) => {
                self.summary.episodes += 1;
                (completed + 1) * self.eval_interval
            }
        };

        if self.aggregator.handle(&event, step, sink)? {
            self.summary.rounds += 1;
        }
        Ok(())
    }

    /// Replay every line from `reader`
    pub fn replay<R: BufRead>(&mut self, reader: R, sink: &mut dyn MetricsSink) -> Result<ReplaySummary> {
        for (i, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read log line {}", i + 1))?;
            self.feed_line(&line, sink)?;
        }
        sink.flush()?;
        Ok(self.summary)
    }

    /// Replay a log file
    pub fn replay_file(&mut self, path: &Path, sink: &mut dyn MetricsSink) -> Result<ReplaySummary> {
        let file = File::open(path).with_context(|| format!("Failed to open log {:?}", path))?;
        let summary = self.replay(BufReader::new(file), sink)?;

        if self.aggregator.pending() > 0 {
            info!(
                "Log ends inside an evaluation round ({} of {} episodes), partial round dropped",
                self.aggregator.pending(),
                self.aggregator.n_episodes()
            );
        }
        Ok(summary)
    }

    pub fn summary(&self) -> ReplaySummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::aggregator::{NEW_BEST_SCORE, REWARD_MEAN};
    use crate::metrics::{EpisodeRecord, MemorySink, NewBestScore};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn episode_line(index: usize, reward: f64) -> String {
        format!(
            "INFO ml_textloc::training::evaluation: {}",
            EpisodeRecord {
                index,
                length: 4,
                reward,
                iou: 0.5,
                max_iou: 0.6,
            }
        )
    }

    fn sample_log() -> String {
        let mut lines = vec!["INFO ml_textloc: step:1 episode:0 R:-1".to_string()];
        for round in 0..3 {
            for i in 0..2 {
                lines.push(episode_line(i, round as f64));
            }
            if round != 1 {
                lines.push(
                    NewBestScore {
                        previous: f64::NEG_INFINITY,
                        score: round as f64,
                    }
                    .to_string(),
                );
            }
        }
        lines.join("\n")
    }

    #[test]
    fn test_rounds_attributed_to_interval_multiples() {
        let mut replay = LogReplay::new(2, 100);
        let mut sink = MemorySink::new();

        let summary = replay.replay(Cursor::new(sample_log()), &mut sink).unwrap();

        assert_eq!(
            sink.series(REWARD_MEAN),
            vec![(100, 0.0), (200, 1.0), (300, 2.0)]
        );
        assert_eq!(sink.series(NEW_BEST_SCORE), vec![(100, 0.0), (300, 2.0)]);
        assert_eq!(
            summary,
            ReplaySummary {
                lines: 9,
                episodes: 6,
                new_bests: 2,
                rounds: 3,
            }
        );
    }

    #[test]
    fn test_replay_file_drops_partial_round() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("train.log");
        let log = format!("{}\n{}", sample_log(), episode_line(0, 9.0));
        std::fs::write(&path, log).unwrap();

        let mut replay = LogReplay::new(2, 50);
        let mut sink = MemorySink::new();
        let summary = replay.replay_file(&path, &mut sink).unwrap();

        assert_eq!(summary.rounds, 3);
        assert_eq!(sink.count(REWARD_MEAN), 3);
    }

    #[test]
    fn test_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut replay = LogReplay::new(2, 50);
        let result = replay.replay_file(&temp_dir.path().join("missing.log"), &mut MemorySink::new());
        assert!(result.is_err());
    }
}
