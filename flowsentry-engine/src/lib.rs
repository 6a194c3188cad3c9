//! # flowsentry-engine
//!
//! Pipeline orchestration: wires capture, analysis, detection, and
//! alerting into the live, replay, and training modes shared by every
//! frontend.

pub mod error;
pub mod rules;
pub mod runtime;

pub use error::PipelineError;
pub use rules::build_signature_engine;
pub use runtime::{
    run_live_mode, run_replay_mode, run_training_mode, PipelineRuntime, TrainingReport,
};
