use agui_types::{
    Event, EventKind, Message, Role, RunStatus, Step, ToolCall, ToolCallStatus,
    STATE_SYNC_ERROR_CODE,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::patch;

/// One entry of the raw event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEvent {
    /// Arrival order, unique within one reconciler
    pub seq: u64,
    pub id: String,
    pub received_at: DateTime<Utc>,
    pub event_type: String,
    /// Produced locally rather than received from the server
    pub synthesized: bool,
    pub event: Event,
}

/// Folds the event stream of successive runs into UI projections.
///
/// Events are reduced strictly in arrival order. Every event is logged
/// verbatim before it is reduced; the log is never read back.
#[derive(Debug, Clone)]
pub struct Reconciler {
    messages: Vec<Message>,
    streaming: Option<Message>,
    steps: Vec<Step>,
    tool_calls: Vec<ToolCall>,
    state: Value,
    status: RunStatus,
    events: Vec<LoggedEvent>,
    next_seq: u64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            streaming: None,
            steps: Vec::new(),
            tool_calls: Vec::new(),
            state: empty_document(),
            status: RunStatus::Idle,
            events: Vec::new(),
            next_seq: 0,
        }
    }

    /// Reduce one event into the projections.
    pub fn apply(&mut self, event: Event) {
        self.log(event.clone(), false);

        let timestamp = event.timestamp;
        match event.kind {
            EventKind::RunStarted { .. } => {
                self.status = RunStatus::Running;
            }
            EventKind::RunFinished { .. } => {
                self.status = RunStatus::Idle;
                if let Some(partial) = self.streaming.take() {
                    tracing::debug!(
                        message_id = %partial.id,
                        "Run finished mid-message, discarding partial content"
                    );
                }
            }
            EventKind::RunError { message, code } => {
                self.status = RunStatus::Idle;
                let content = message.unwrap_or_else(|| "Unknown error".to_string());
                self.messages.push(Message::error(content, code));
            }
            EventKind::StepStarted { step_name } => {
                self.steps.push(Step::started(step_name, timestamp));
            }
            EventKind::StepFinished { step_name } => {
                self.steps
                    .iter_mut()
                    .filter(|step| step.name == step_name)
                    .for_each(|step| step.finish(timestamp));
            }
            EventKind::TextMessageStart { message_id, role } => {
                if let Some(previous) = self.streaming.take() {
                    tracing::debug!(
                        message_id = %previous.id,
                        "New message started, discarding uncommitted message"
                    );
                }
                self.streaming = Some(Message::new(
                    message_id,
                    role.unwrap_or(Role::Assistant),
                    String::new(),
                ));
            }
            EventKind::TextMessageContent { message_id, delta } => match &mut self.streaming {
                Some(message) => message.content.push_str(&delta),
                None => tracing::debug!(%message_id, "Content without an active message"),
            },
            EventKind::TextMessageEnd { message_id } => match self.streaming.take() {
                Some(message) => self.messages.push(message),
                None => tracing::debug!(%message_id, "End without an active message"),
            },
            EventKind::ToolCallStart {
                tool_call_id,
                tool_call_name,
                ..
            } => {
                let call = ToolCall::new(tool_call_id, tool_call_name);
                match self.tool_call_mut(&call.id) {
                    Some(existing) => *existing = call,
                    None => self.tool_calls.push(call),
                }
            }
            EventKind::ToolCallArgs {
                tool_call_id,
                delta,
            } => {
                self.tool_call_entry(tool_call_id).args_buffer.push_str(&delta);
            }
            EventKind::ToolCallResult {
                tool_call_id,
                result,
                ..
            } => {
                let call = self.tool_call_entry(tool_call_id);
                call.result = result;
                call.status = ToolCallStatus::Completed;
            }
            EventKind::ToolCallEnd { tool_call_id } => match self.tool_call_mut(&tool_call_id) {
                Some(call) => call.status = ToolCallStatus::Finished,
                None => tracing::debug!(%tool_call_id, "End for unknown tool call"),
            },
            EventKind::StateSnapshot { snapshot } => {
                self.state = snapshot.unwrap_or_else(empty_document);
            }
            EventKind::StateDelta { delta } => match delta {
                Some(delta @ Value::Array(_)) => self.apply_delta(&delta),
                _ => tracing::debug!("State delta without an operation array"),
            },
            EventKind::MessagesSnapshot { messages } => {
                if let Some(messages) = messages {
                    self.messages = messages.into_iter().map(Message::from).collect();
                }
            }
            EventKind::Custom { .. } | EventKind::Raw { .. } | EventKind::Unrecognized { .. } => {}
        }
    }

    /// Reset run-scoped projections ahead of a new run.
    pub fn begin_run(&mut self) {
        self.steps.clear();
        self.tool_calls.clear();
    }

    /// Drop everything: history, projections, state and the event log.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Record a locally produced message, e.g. the user's prompt.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn streaming_message(&self) -> Option<&Message> {
        self.streaming.as_ref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    pub fn state(&self) -> &Value {
        &self.state
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    fn apply_delta(&mut self, delta: &Value) {
        let result = patch::parse_ops(delta).and_then(|ops| patch::apply(&self.state, &ops));
        match result {
            Ok(patched) => self.state = patched,
            Err(e) => {
                tracing::warn!("Rejected state delta: {}", e);
                let message = format!("State delta rejected: {}", e);
                self.log(
                    Event::run_error(message.clone(), STATE_SYNC_ERROR_CODE),
                    true,
                );
                self.messages.push(Message::error(
                    message,
                    Some(STATE_SYNC_ERROR_CODE.to_string()),
                ));
            }
        }
    }

    fn tool_call_mut(&mut self, id: &str) -> Option<&mut ToolCall> {
        self.tool_calls.iter_mut().find(|call| call.id == id)
    }

    fn tool_call_entry(&mut self, id: String) -> &mut ToolCall {
        let position = match self.tool_calls.iter().position(|call| call.id == id) {
            Some(position) => position,
            None => {
                self.tool_calls.push(ToolCall::new(id, String::new()));
                self.tool_calls.len() - 1
            }
        };
        &mut self.tool_calls[position]
    }

    fn log(&mut self, event: Event, synthesized: bool) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(LoggedEvent {
            seq,
            id: uuid::Uuid::new_v4().to_string(),
            received_at: Utc::now(),
            event_type: event.type_name().to_string(),
            synthesized,
            event,
        });
    }
}

fn empty_document() -> Value {
    Value::Object(Map::new())
}
