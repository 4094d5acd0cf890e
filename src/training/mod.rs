//! Training and evaluation loops

pub mod evaluation;
pub mod orchestrator;

pub use evaluation::{
    read_scores, EvaluationRunner, EvaluationScores, Evaluator, BEST_AGENT_DIR, SCORES_FILE,
};
pub use orchestrator::{
    RunName, TrainingOrchestrator, TrainingOutcome, TrainingSchedule,
};
