use agui_client::{ClientConfig, RunClient, RunOptions};
use agui_types::{Event, Message, RunStatus, Step, ToolCall, WireMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::reconciler::{LoggedEvent, Reconciler};

/// Point-in-time copy of every projection a session exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub streaming_message: Option<Message>,
    pub steps: Vec<Step>,
    pub tool_calls: Vec<ToolCall>,
    pub state: Value,
    pub status: RunStatus,
    pub events: Vec<LoggedEvent>,
}

/// A conversation with one AG-UI endpoint.
///
/// Owns the run client and the reconciled projections. Sessions share
/// nothing with each other; one session can be driven from several tasks.
pub struct Session {
    client: RunClient,
    reconciler: Mutex<Reconciler>,
}

impl Session {
    pub fn new(client: RunClient) -> Self {
        Self {
            client,
            reconciler: Mutex::new(Reconciler::new()),
        }
    }

    pub fn from_config(config: ClientConfig) -> agui_client::Result<Self> {
        Ok(Self::new(RunClient::new(config)?))
    }

    pub fn client(&self) -> &RunClient {
        &self.client
    }

    /// Run the exchange for `messages`, reducing events as they arrive.
    ///
    /// Supersedes any run in flight. Resolves when the stream ends or the
    /// run is aborted or superseded; failures become error messages.
    pub async fn send(&self, messages: Vec<WireMessage>, options: RunOptions) {
        self.send_with(messages, options, |_| {}).await;
    }

    /// Like [`send`](Self::send), handing each event to `observer` once it
    /// has been reduced. The session is not locked while `observer` runs.
    pub async fn send_with<F>(
        &self,
        messages: Vec<WireMessage>,
        options: RunOptions,
        mut observer: F,
    )
    where
        F: FnMut(&Event),
    {
        let mut stream = {
            let mut reconciler = self.reconciler();
            reconciler.begin_run();
            self.client.start(messages, options)
        };

        while let Some(event) = stream.next().await {
            {
                let mut reconciler = self.reconciler();
                // An abort may land between receiving and reducing
                if stream.is_cancelled() {
                    break;
                }
                reconciler.apply(event.clone());
            }
            observer(&event);
        }
    }

    /// Append a user message and send the whole history with the current
    /// state document.
    pub async fn send_user_message(&self, content: impl Into<String>) {
        self.send_user_message_with(content, |_| {}).await;
    }

    pub async fn send_user_message_with<F>(&self, content: impl Into<String>, observer: F)
    where
        F: FnMut(&Event),
    {
        let (messages, state) = {
            let mut reconciler = self.reconciler();
            reconciler.push_message(Message::user(content));
            let messages = reconciler
                .messages()
                .iter()
                .map(Message::to_wire)
                .collect::<Vec<_>>();
            (messages, reconciler.state().clone())
        };

        self.send_with(messages, RunOptions::with_state(state), observer)
            .await;
    }

    /// Cancel the run in flight. No further events of it are reduced.
    pub fn abort(&self) {
        let _reconciler = self.reconciler();
        self.client.abort();
    }

    /// Abort and reset every projection.
    pub fn clear(&self) {
        let mut reconciler = self.reconciler();
        self.client.abort();
        reconciler.clear();
    }

    /// Reduce an event obtained from another transport.
    pub fn apply(&self, event: Event) {
        self.reconciler().apply(event);
    }

    pub fn messages(&self) -> Vec<Message> {
        self.reconciler().messages().to_vec()
    }

    pub fn streaming_message(&self) -> Option<Message> {
        self.reconciler().streaming_message().cloned()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.reconciler().steps().to_vec()
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.reconciler().tool_calls().to_vec()
    }

    pub fn active_tool_calls(&self) -> Vec<ToolCall> {
        self.reconciler()
            .tool_calls()
            .iter()
            .filter(|call| call.is_active())
            .cloned()
            .collect()
    }

    pub fn finished_tool_calls(&self) -> Vec<ToolCall> {
        self.reconciler()
            .tool_calls()
            .iter()
            .filter(|call| !call.is_active())
            .cloned()
            .collect()
    }

    pub fn state(&self) -> Value {
        self.reconciler().state().clone()
    }

    pub fn status(&self) -> RunStatus {
        self.reconciler().status()
    }

    pub fn is_running(&self) -> bool {
        self.status() == RunStatus::Running
    }

    pub fn events(&self) -> Vec<LoggedEvent> {
        self.reconciler().events().to_vec()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let reconciler = self.reconciler();
        SessionSnapshot {
            messages: reconciler.messages().to_vec(),
            streaming_message: reconciler.streaming_message().cloned(),
            steps: reconciler.steps().to_vec(),
            tool_calls: reconciler.tool_calls().to_vec(),
            state: reconciler.state().clone(),
            status: reconciler.status(),
            events: reconciler.events().to_vec(),
        }
    }

    fn reconciler(&self) -> MutexGuard<'_, Reconciler> {
        self.reconciler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
