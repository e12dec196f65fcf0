pub mod buffer_utils;
pub mod client;
pub mod config;
pub mod error;
pub mod request;

pub use buffer_utils::{decode_frames, parse_event, CircularLineBuffer, FrameDecoder};
pub use client::{RunClient, RunStream};
pub use config::{ClientConfig, DEFAULT_ENDPOINT};
pub use error::{ClientError, Result};
pub use request::{build_request_body, RunOptions};
