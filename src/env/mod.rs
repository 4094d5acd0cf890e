//! Text localization environment
//!
//! The environment holds the current image, the current bounding box and the
//! episode-level IoU state. Pixel content is not used: observations encode the
//! box geometry and the recent action history.

pub mod action;
pub mod bbox;
pub mod config;
pub mod dataset;
pub mod environment;
pub mod observation;

pub use action::{BoxAction, NUM_ACTIONS};
pub use bbox::BoundingBox;
pub use config::EnvConfig;
pub use dataset::{Dataset, Sample};
pub use environment::{ActionSpace, Environment, Step, StepInfo, TextLocEnvironment};
pub use observation::{create_observation, observation_size};
