//! # flowsentry-core
//!
//! Foundation layer for the flowsentry pipeline: the packet event type that
//! flows from capture to analysis, and the bounded SPSC queue that carries it.
//!
//! ### Key Submodules:
//! - `events`: `PacketRecord` plus the single-producer/single-consumer
//!   intake queue connecting the capture thread to the consumer task.

pub mod events;

pub mod prelude {
    pub use crate::events::*;
}
