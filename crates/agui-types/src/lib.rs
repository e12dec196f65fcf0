//! Core types for the AG-UI client runtime: the protocol event model and
//! the projections a session derives from it.

pub mod events;
pub mod patch;
pub mod state;

pub use events::{
    Event, EventCategory, EventDecodeError, EventKind, EventType, UnknownEventType,
    CLIENT_ERROR_CODE, STATE_SYNC_ERROR_CODE,
};
pub use patch::{PatchOp, PatchOpKind};
pub use state::{
    Message, Role, RunStatus, Step, StepStatus, ToolCall, ToolCallStatus, WireMessage,
};

/// The shared application-state document.
pub type StateDocument = serde_json::Value;
