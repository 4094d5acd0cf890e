//! Metrics extraction
//!
//! Evaluation results and training-step averages become `(name, value, step)`
//! scalars. Live training routes typed [`EvaluationEvent`]s straight into the
//! [`MetricsAggregator`]; [`LogReplay`] recovers the same events from a saved
//! log with [`parse_line`].

pub mod aggregator;
pub mod event;
pub mod parser;
pub mod replay;
pub mod sink;
pub mod stats;
pub mod step_observer;
pub mod training_stats;

pub use aggregator::MetricsAggregator;
pub use event::{EpisodeRecord, EvaluationEvent, MetricEvent, NewBestScore};
pub use parser::parse_line;
pub use replay::{LogReplay, ReplaySummary};
pub use sink::{
    read_scalars, FanoutSink, JsonlScalarWriter, MemorySink, MetricsSink, TracingSink,
    SCALARS_FILE,
};
pub use step_observer::TrainingStepObserver;
pub use training_stats::TrainingStats;
