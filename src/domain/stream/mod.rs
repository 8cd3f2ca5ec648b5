//! Streaming response domain module

mod delta;
mod frame_decoder;

pub use delta::{parse_payload, StreamDelta};
pub use frame_decoder::FrameDecoder;
