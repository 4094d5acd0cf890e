pub mod evaluate;
pub mod replay;
pub mod train;

pub use evaluate::{EvaluateMode, EvaluationReport};
pub use replay::{ReplayConfig, ReplayMode};
pub use train::TrainMode;
