use agui_types::{StateDocument, WireMessage};
use serde_json::{Map, Value};

/// Per-run options for [`RunClient::start`](crate::RunClient::start)
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Conversation thread id; a random UUID when absent
    pub thread_id: Option<String>,
    /// Run id; a random UUID when absent
    pub run_id: Option<String>,
    /// Extra top-level fields merged into the request body, last wins
    pub extra: Map<String, Value>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying the state document plus empty tool, context and
    /// forwarded-property fields, which servers validate as present.
    pub fn with_state(state: StateDocument) -> Self {
        Self::new()
            .extra("state", state)
            .extra("tools", Value::Array(Vec::new()))
            .extra("context", Value::Array(Vec::new()))
            .extra("forwardedProps", Value::Object(Map::new()))
    }

    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Build the run request body:
/// `{messages, threadId, runId, ...extra}`.
pub fn build_request_body(messages: &[WireMessage], options: &RunOptions) -> Value {
    let mut body = Map::new();

    body.insert(
        "messages".to_string(),
        serde_json::to_value(messages).unwrap_or_else(|_| Value::Array(Vec::new())),
    );
    body.insert(
        "threadId".to_string(),
        Value::String(options.thread_id.clone().unwrap_or_else(random_id)),
    );
    body.insert(
        "runId".to_string(),
        Value::String(options.run_id.clone().unwrap_or_else(random_id)),
    );

    for (key, value) in &options.extra {
        body.insert(key.clone(), value.clone());
    }

    Value::Object(body)
}

fn random_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agui_types::Role;
    use serde_json::json;

    #[test]
    fn test_body_generates_ids() {
        let body = build_request_body(&[], &RunOptions::new());

        let thread_id = body["threadId"].as_str().unwrap();
        let run_id = body["runId"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(thread_id).is_ok());
        assert!(uuid::Uuid::parse_str(run_id).is_ok());
        assert_ne!(thread_id, run_id);
        assert_eq!(body["messages"], json!([]));
    }

    #[test]
    fn test_body_keeps_supplied_ids_and_messages() {
        let messages = vec![WireMessage::new("1", Role::User, "hi")];
        let options = RunOptions::new().thread_id("thread-1").run_id("run-1");
        let body = build_request_body(&messages, &options);

        assert_eq!(body["threadId"], "thread-1");
        assert_eq!(body["runId"], "run-1");
        assert_eq!(
            body["messages"],
            json!([{"id": "1", "role": "user", "content": "hi"}])
        );
    }

    #[test]
    fn test_with_state_fills_extra_fields() {
        let body = build_request_body(&[], &RunOptions::with_state(json!({"count": 2})));

        assert_eq!(body["state"], json!({"count": 2}));
        assert_eq!(body["tools"], json!([]));
        assert_eq!(body["context"], json!([]));
        assert_eq!(body["forwardedProps"], json!({}));
    }

    #[test]
    fn test_extra_overrides_earlier_keys() {
        let options = RunOptions::new()
            .thread_id("mine")
            .extra("threadId", json!("override"));
        let body = build_request_body(&[], &options);
        assert_eq!(body["threadId"], "override");
    }
}
