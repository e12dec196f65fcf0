//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use agui::prelude::*;
//! ```

pub use crate::{
    ClientConfig, Event, EventKind, EventType, Message, Role, RunClient, RunOptions, RunStatus,
    Session, SessionSnapshot, Step, ToolCall, WireMessage,
};
