use crate::state::{Role, WireMessage};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Error code attached to `RUN_ERROR` events synthesized by the client
/// for transport failures (non-success status, network errors).
pub const CLIENT_ERROR_CODE: &str = "CLIENT_ERROR";

/// Error code attached to error events synthesized when a `STATE_DELTA`
/// cannot be applied to the current state document.
pub const STATE_SYNC_ERROR_CODE: &str = "STATE_SYNC_ERROR";

/// Wire names of every event type the runtime understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RunStarted,
    RunFinished,
    RunError,
    StepStarted,
    StepFinished,
    TextMessageStart,
    TextMessageContent,
    TextMessageEnd,
    ToolCallStart,
    ToolCallArgs,
    ToolCallResult,
    ToolCallEnd,
    StateSnapshot,
    StateDelta,
    MessagesSnapshot,
    Custom,
    Raw,
}

impl EventType {
    pub const ALL: [EventType; 17] = [
        EventType::RunStarted,
        EventType::RunFinished,
        EventType::RunError,
        EventType::StepStarted,
        EventType::StepFinished,
        EventType::TextMessageStart,
        EventType::TextMessageContent,
        EventType::TextMessageEnd,
        EventType::ToolCallStart,
        EventType::ToolCallArgs,
        EventType::ToolCallResult,
        EventType::ToolCallEnd,
        EventType::StateSnapshot,
        EventType::StateDelta,
        EventType::MessagesSnapshot,
        EventType::Custom,
        EventType::Raw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RunStarted => "RUN_STARTED",
            EventType::RunFinished => "RUN_FINISHED",
            EventType::RunError => "RUN_ERROR",
            EventType::StepStarted => "STEP_STARTED",
            EventType::StepFinished => "STEP_FINISHED",
            EventType::TextMessageStart => "TEXT_MESSAGE_START",
            EventType::TextMessageContent => "TEXT_MESSAGE_CONTENT",
            EventType::TextMessageEnd => "TEXT_MESSAGE_END",
            EventType::ToolCallStart => "TOOL_CALL_START",
            EventType::ToolCallArgs => "TOOL_CALL_ARGS",
            EventType::ToolCallResult => "TOOL_CALL_RESULT",
            EventType::ToolCallEnd => "TOOL_CALL_END",
            EventType::StateSnapshot => "STATE_SNAPSHOT",
            EventType::StateDelta => "STATE_DELTA",
            EventType::MessagesSnapshot => "MESSAGES_SNAPSHOT",
            EventType::Custom => "CUSTOM",
            EventType::Raw => "RAW",
        }
    }

    /// Coarse grouping used when rendering event logs.
    pub fn category(&self) -> EventCategory {
        match self {
            EventType::RunStarted | EventType::RunFinished | EventType::RunError => {
                EventCategory::Lifecycle
            }
            EventType::StepStarted | EventType::StepFinished => EventCategory::Step,
            EventType::TextMessageStart
            | EventType::TextMessageContent
            | EventType::TextMessageEnd => EventCategory::TextMessage,
            EventType::ToolCallStart
            | EventType::ToolCallArgs
            | EventType::ToolCallResult
            | EventType::ToolCallEnd => EventCategory::ToolCall,
            EventType::StateSnapshot | EventType::StateDelta => EventCategory::State,
            EventType::MessagesSnapshot => EventCategory::Messages,
            EventType::Custom | EventType::Raw => EventCategory::Special,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Lifecycle,
    Step,
    TextMessage,
    ToolCall,
    State,
    Messages,
    Special,
    Unknown,
}

impl EventCategory {
    /// Short marker shown next to the event type in console output.
    pub fn marker(&self) -> &'static str {
        match self {
            EventCategory::Lifecycle => "▶",
            EventCategory::Step => "→",
            EventCategory::TextMessage => "…",
            EventCategory::ToolCall => "🔧",
            EventCategory::State => "Δ",
            EventCategory::Messages => "📋",
            EventCategory::Special => "✦",
            EventCategory::Unknown => "?",
        }
    }
}

/// Variant-specific payload of a protocol event.
///
/// Field names follow the wire format (camelCase). Identity fields
/// (`messageId`, `toolCallId`, `stepName`) are required; a frame that
/// omits them fails to decode and is dropped by the frame decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum EventKind {
    RunStarted {
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
    },

    RunFinished {
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
    },

    RunError {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    StepStarted {
        step_name: String,
    },

    StepFinished {
        step_name: String,
    },

    TextMessageStart {
        message_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<Role>,
    },

    TextMessageContent {
        message_id: String,
        #[serde(default)]
        delta: String,
    },

    TextMessageEnd {
        message_id: String,
    },

    ToolCallStart {
        tool_call_id: String,
        tool_call_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
    },

    ToolCallArgs {
        tool_call_id: String,
        #[serde(default)]
        delta: String,
    },

    ToolCallResult {
        tool_call_id: String,
        #[serde(default, alias = "content")]
        result: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },

    ToolCallEnd {
        tool_call_id: String,
    },

    StateSnapshot {
        #[serde(skip_serializing_if = "Option::is_none")]
        snapshot: Option<Value>,
    },

    /// `delta` stays untyped here: a missing or non-array delta is a
    /// no-op for the reducer, while a malformed op inside an array is a
    /// state synchronization failure.
    StateDelta {
        #[serde(skip_serializing_if = "Option::is_none")]
        delta: Option<Value>,
    },

    MessagesSnapshot {
        #[serde(skip_serializing_if = "Option::is_none")]
        messages: Option<Vec<WireMessage>>,
    },

    Custom {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },

    Raw {
        #[serde(skip_serializing_if = "Option::is_none")]
        event: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },

    /// Event whose `type` this runtime does not know. Kept verbatim.
    #[serde(skip)]
    Unrecognized { event_type: String, payload: Value },
}

/// A single decoded protocol event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Milliseconds since the Unix epoch, when the producer supplied one.
    pub timestamp: Option<f64>,
    pub kind: EventKind,
}

#[derive(Serialize, Deserialize)]
struct WireEvent {
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    timestamp: Option<f64>,
    #[serde(flatten)]
    kind: EventKind,
}

/// A timestamp that is not a JSON number is treated as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64))
}

#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("event payload is not an object with a string `type` field")]
    MissingType,

    #[error("invalid {event_type} event: {source}")]
    InvalidFields {
        event_type: EventType,
        #[source]
        source: serde_json::Error,
    },
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: None,
            kind,
        }
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Decode an event from a JSON frame payload.
    pub fn from_json(payload: &str) -> Result<Self, EventDecodeError> {
        let value: Value = serde_json::from_str(payload).map_err(EventDecodeError::Json)?;
        Self::from_value(value)
    }

    /// Decode an event from an already-parsed JSON value.
    ///
    /// Unknown `type` strings yield [`EventKind::Unrecognized`] rather than
    /// an error so newer servers never break older clients.
    pub fn from_value(value: Value) -> Result<Self, EventDecodeError> {
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(EventDecodeError::MissingType)?;

        let event_type = match type_name.parse::<EventType>() {
            Ok(event_type) => event_type,
            Err(UnknownEventType(event_type)) => {
                let timestamp = value.get("timestamp").and_then(Value::as_f64);
                return Ok(Self {
                    timestamp,
                    kind: EventKind::Unrecognized {
                        event_type,
                        payload: value,
                    },
                });
            }
        };

        let wire: WireEvent = serde_json::from_value(value)
            .map_err(|source| EventDecodeError::InvalidFields { event_type, source })?;

        Ok(Self {
            timestamp: wire.timestamp,
            kind: wire.kind,
        })
    }

    /// JSON form of the event as it appears on the wire.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Known event type, `None` for unrecognized events.
    pub fn event_type(&self) -> Option<EventType> {
        Some(match &self.kind {
            EventKind::RunStarted { .. } => EventType::RunStarted,
            EventKind::RunFinished { .. } => EventType::RunFinished,
            EventKind::RunError { .. } => EventType::RunError,
            EventKind::StepStarted { .. } => EventType::StepStarted,
            EventKind::StepFinished { .. } => EventType::StepFinished,
            EventKind::TextMessageStart { .. } => EventType::TextMessageStart,
            EventKind::TextMessageContent { .. } => EventType::TextMessageContent,
            EventKind::TextMessageEnd { .. } => EventType::TextMessageEnd,
            EventKind::ToolCallStart { .. } => EventType::ToolCallStart,
            EventKind::ToolCallArgs { .. } => EventType::ToolCallArgs,
            EventKind::ToolCallResult { .. } => EventType::ToolCallResult,
            EventKind::ToolCallEnd { .. } => EventType::ToolCallEnd,
            EventKind::StateSnapshot { .. } => EventType::StateSnapshot,
            EventKind::StateDelta { .. } => EventType::StateDelta,
            EventKind::MessagesSnapshot { .. } => EventType::MessagesSnapshot,
            EventKind::Custom { .. } => EventType::Custom,
            EventKind::Raw { .. } => EventType::Raw,
            EventKind::Unrecognized { .. } => return None,
        })
    }

    /// Wire `type` string, including unrecognized ones.
    pub fn type_name(&self) -> &str {
        match (&self.kind, self.event_type()) {
            (EventKind::Unrecognized { event_type, .. }, _) => event_type,
            (_, Some(event_type)) => event_type.as_str(),
            (_, None) => "",
        }
    }

    pub fn category(&self) -> EventCategory {
        self.event_type()
            .map(|t| t.category())
            .unwrap_or(EventCategory::Unknown)
    }

    pub fn run_started() -> Self {
        Self::new(EventKind::RunStarted {
            thread_id: None,
            run_id: None,
        })
    }

    pub fn run_finished() -> Self {
        Self::new(EventKind::RunFinished {
            thread_id: None,
            run_id: None,
        })
    }

    pub fn run_error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(EventKind::RunError {
            message: Some(message.into()),
            code: Some(code.into()),
        })
    }

    pub fn step_started(step_name: impl Into<String>) -> Self {
        Self::new(EventKind::StepStarted {
            step_name: step_name.into(),
        })
    }

    pub fn step_finished(step_name: impl Into<String>) -> Self {
        Self::new(EventKind::StepFinished {
            step_name: step_name.into(),
        })
    }

    pub fn text_message_start(message_id: impl Into<String>) -> Self {
        Self::new(EventKind::TextMessageStart {
            message_id: message_id.into(),
            role: None,
        })
    }

    pub fn text_message_content(message_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::new(EventKind::TextMessageContent {
            message_id: message_id.into(),
            delta: delta.into(),
        })
    }

    pub fn text_message_end(message_id: impl Into<String>) -> Self {
        Self::new(EventKind::TextMessageEnd {
            message_id: message_id.into(),
        })
    }

    pub fn tool_call_start(tool_call_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(EventKind::ToolCallStart {
            tool_call_id: tool_call_id.into(),
            tool_call_name: name.into(),
            parent_message_id: None,
        })
    }

    pub fn tool_call_args(tool_call_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::new(EventKind::ToolCallArgs {
            tool_call_id: tool_call_id.into(),
            delta: delta.into(),
        })
    }

    pub fn tool_call_result(tool_call_id: impl Into<String>, result: Value) -> Self {
        Self::new(EventKind::ToolCallResult {
            tool_call_id: tool_call_id.into(),
            result,
            message_id: None,
        })
    }

    pub fn tool_call_end(tool_call_id: impl Into<String>) -> Self {
        Self::new(EventKind::ToolCallEnd {
            tool_call_id: tool_call_id.into(),
        })
    }

    pub fn state_snapshot(snapshot: Value) -> Self {
        Self::new(EventKind::StateSnapshot {
            snapshot: Some(snapshot),
        })
    }

    pub fn state_delta(delta: Value) -> Self {
        Self::new(EventKind::StateDelta { delta: Some(delta) })
    }

    pub fn messages_snapshot(messages: Vec<WireMessage>) -> Self {
        Self::new(EventKind::MessagesSnapshot {
            messages: Some(messages),
        })
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let EventKind::Unrecognized { payload, .. } = &self.kind {
            return payload.serialize(serializer);
        }

        WireEvent {
            timestamp: self.timestamp,
            kind: self.kind.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Event::from_value(value).map_err(serde::de::Error::custom)
    }
}
