//! flowsentry-capture
//!
//! Packet acquisition boundary: live pcap capture and offline pcap-file
//! replay, both decoding frames into [`flowsentry_core::events::PacketRecord`]
//! before anything downstream sees them.
//!
//! Interface selection, privilege handling, and transport filtering all live
//! here; the analysis pipeline only ever receives well-formed TCP records.

pub mod decode;
pub mod error;
pub mod file;
pub mod live;

pub use decode::decode_frame;
pub use error::CaptureError;
pub use file::replay_file;
pub use live::run_capture_loop;
