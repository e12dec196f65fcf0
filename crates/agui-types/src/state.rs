use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Author of a message.
///
/// Known roles get their own variant; anything else the server sends is
/// preserved in [`Role::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    #[default]
    Assistant,
    System,
    Tool,
    Developer,
    /// Client-side role for errors surfaced into the message history.
    Error,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
            Role::Developer => "developer",
            Role::Error => "error",
            Role::Other(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            "tool" => Role::Tool,
            "developer" => Role::Developer,
            "error" => Role::Error,
            _ => Role::Other(role),
        }
    }
}

impl From<&str> for Role {
    fn from(role: &str) -> Self {
        Role::from(role.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message shape exchanged with the server: request history and
/// `MESSAGES_SNAPSHOT` payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub role: Role,
    #[serde(default, deserialize_with = "nullable_string")]
    pub content: String,
}

impl WireMessage {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
        }
    }
}

/// Entry of the message history projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Error code, only set for `Role::Error` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            code: None,
        }
    }

    /// User message with a freshly generated id.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), Role::User, content)
    }

    /// Error message with a freshly generated id.
    pub fn error(content: impl Into<String>, code: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Error,
            content: content.into(),
            code,
        }
    }

    pub fn is_error(&self) -> bool {
        self.role == Role::Error
    }

    /// Strip client bookkeeping, keeping only what the server expects.
    pub fn to_wire(&self) -> WireMessage {
        WireMessage::new(self.id.clone(), self.role.clone(), self.content.clone())
    }
}

impl From<WireMessage> for Message {
    fn from(message: WireMessage) -> Self {
        Self::new(message.id, message.role, message.content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Running,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}

impl Step {
    pub fn started(name: impl Into<String>, start_time: Option<f64>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Running,
            start_time,
            end_time: None,
        }
    }

    pub fn finish(&mut self, end_time: Option<f64>) {
        self.status = StepStatus::Finished;
        self.end_time = end_time;
    }

    pub fn is_running(&self) -> bool {
        self.status == StepStatus::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Calling,
    Completed,
    Finished,
}

/// Entry of the tool-call table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw concatenation of argument deltas. Not parsed: it is only valid
    /// JSON once the call has finished streaming.
    pub args_buffer: String,
    pub result: Value,
    pub status: ToolCallStatus,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args_buffer: String::new(),
            result: Value::Null,
            status: ToolCallStatus::Calling,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != ToolCallStatus::Finished
    }

    /// Parsed arguments, if the buffer currently holds valid JSON.
    pub fn parsed_args(&self) -> Option<Value> {
        serde_json::from_str(&self.args_buffer).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
