mod buffering;
mod sse_parser;

pub use buffering::CircularLineBuffer;
pub use sse_parser::{decode_frames, parse_event, FrameDecoder};
