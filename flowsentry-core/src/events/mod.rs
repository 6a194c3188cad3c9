//! Pipeline event types and the capture-to-consumer intake queue.

pub mod packet;
pub mod queue;

pub use packet::PacketRecord;
pub use queue::{PacketQueue, QueueError};
