//! # flowsentry-analysis
//!
//! Flow aggregation: turns the stream of raw packet records into per-flow
//! statistical feature snapshots for the detection engine.

pub mod analyzer;
pub mod flow;

pub use analyzer::TrafficAnalyzer;
pub use flow::{FeatureSnapshot, FlowKey, FlowState};
