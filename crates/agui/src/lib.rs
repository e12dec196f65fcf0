//! # AG-UI
//!
//! Client runtime for the AG-UI agent protocol.
//!
//! ## Overview
//!
//! An agent server streams a run back as Server-Sent Events. This crate:
//!
//! - **Streams runs** over HTTP, decoding `data:` frames as they arrive
//! - **Cancels** superseded or aborted runs without leaking their events
//! - **Reconciles** events into messages, steps, tool calls and run status
//! - **Patches** the shared state document atomically
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agui::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Session::from_config(ClientConfig::new(
//!         "http://localhost:9000/agui/v1/run",
//!     ))?;
//!
//!     session.send_user_message("Hello!").await;
//!
//!     for message in session.messages() {
//!         println!("[{}] {}", message.role, message.content);
//!     }
//!     println!("state: {}", session.state());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`agui-types`**: protocol events, projections and patch operations
//! - **`agui-client`**: SSE frame decoder and the cancellable run client
//! - **`agui-session`**: event reconciler, patch engine and `Session`
//!
//! ## License
//!
//! MIT

pub mod prelude;

pub use agui_types::{
    Event, EventCategory, EventKind, EventType, Message, PatchOp, PatchOpKind, Role, RunStatus,
    StateDocument, Step, StepStatus, ToolCall, ToolCallStatus, WireMessage, CLIENT_ERROR_CODE,
    STATE_SYNC_ERROR_CODE,
};

pub use agui_client::{
    build_request_body, ClientConfig, ClientError, FrameDecoder, RunClient, RunOptions,
    RunStream, DEFAULT_ENDPOINT,
};

pub use agui_session::{patch, LoggedEvent, PatchError, Reconciler, Session, SessionSnapshot};

pub use serde_json;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serde_json::json;

    #[test]
    fn test_reexported_json_builds_state() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(Event::state_snapshot(json!({"todos": []})));
        reconciler.apply(Event::state_delta(json!([
            {"op": "add", "path": "/todos/-", "value": "ship"}
        ])));

        assert_eq!(reconciler.state(), &json!({"todos": ["ship"]}));
    }
}
