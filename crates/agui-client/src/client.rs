// Run client: one in-flight AG-UI exchange at a time

use agui_types::{Event, WireMessage, CLIENT_ERROR_CODE};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::buffer_utils::{decode_frames, parse_event};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::request::{build_request_body, RunOptions};

/// HTTP client for an AG-UI run endpoint.
///
/// Starting a run cancels the previous one, so at most one exchange per
/// client is ever in flight. Every failure other than an intentional
/// cancellation reaches the consumer as a synthesized `RUN_ERROR` event
/// with code `CLIENT_ERROR`.
pub struct RunClient {
    http_client: reqwest::Client,
    endpoint: String,
    channel_capacity: usize,
    in_flight: Mutex<Option<InFlight>>,
}

struct InFlight {
    token: CancellationToken,
    exchange: JoinHandle<()>,
}

impl InFlight {
    fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.exchange.is_finished()
    }
}

impl RunClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim().to_string(),
            channel_capacity: config.channel_capacity,
            in_flight: Mutex::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Start a run and return the stream of its events.
    ///
    /// Any exchange already in flight is cancelled first; its stream stops
    /// yielding immediately, even for events that were already queued.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, messages: Vec<WireMessage>, options: RunOptions) -> RunStream {
        let token = CancellationToken::new();
        let mut in_flight = self.in_flight();
        if let Some(previous) = in_flight.take() {
            if previous.is_active() {
                tracing::debug!("Superseding in-flight run");
            }
            previous.token.cancel();
        }

        let body = build_request_body(&messages, &options);
        tracing::debug!(
            endpoint = %self.endpoint,
            thread_id = body["threadId"].as_str().unwrap_or_default(),
            run_id = body["runId"].as_str().unwrap_or_default(),
            messages = messages.len(),
            "Starting run"
        );

        let request = self.http_client.post(&self.endpoint).json(&body);
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let exchange = tokio::spawn(run_exchange(request, tx, token.clone()));
        *in_flight = Some(InFlight {
            token: token.clone(),
            exchange,
        });

        RunStream { events: rx, token }
    }

    /// Run to completion, handing every event to `sink` in arrival order.
    ///
    /// Resolves when the response ends or the run is aborted or superseded.
    /// Never fails: errors arrive through `sink` as `RUN_ERROR` events.
    pub async fn send<F>(&self, messages: Vec<WireMessage>, options: RunOptions, mut sink: F)
    where
        F: FnMut(Event),
    {
        let mut stream = self.start(messages, options);
        while let Some(event) = stream.next().await {
            sink(event);
        }
    }

    /// Cancel the in-flight run, if any. Idempotent.
    pub fn abort(&self) {
        if let Some(previous) = self.in_flight().take() {
            if previous.is_active() {
                tracing::debug!("Aborting in-flight run");
            }
            previous.token.cancel();
        }
    }

    /// Whether an exchange is still reading from the server.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight()
            .as_ref()
            .map(InFlight::is_active)
            .unwrap_or(false)
    }

    fn in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Events of one exchange, in wire order.
///
/// Dropping the stream cancels the exchange.
pub struct RunStream {
    events: mpsc::Receiver<Event>,
    token: CancellationToken,
}

impl RunStream {
    /// Next event, or `None` once the exchange has ended or been cancelled.
    pub async fn next(&mut self) -> Option<Event> {
        if self.token.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for RunStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_exchange(
    request: reqwest::RequestBuilder,
    tx: mpsc::Sender<Event>,
    token: CancellationToken,
) {
    let response = tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::debug!("Run aborted before response");
            return;
        }
        response = request.send() => response,
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            forward(&tx, &token, client_error_event(ClientError::Http(e))).await;
            return;
        }
    };

    if !response.status().is_success() {
        let error = ClientError::from_status(response.status());
        tracing::warn!("Run request failed: {}", error);
        forward(&tx, &token, client_error_event(error)).await;
        return;
    }

    let mut frames = decode_frames(response.bytes_stream());
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("Run aborted mid-stream");
                return;
            }
            next = frames.next() => next,
        };

        match next {
            Some(Ok(payload)) => {
                if let Some(event) = parse_event(&payload) {
                    if !forward(&tx, &token, event).await {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                tracing::warn!("Run stream failed: {}", e);
                forward(&tx, &token, client_error_event(e)).await;
                return;
            }
            None => break,
        }
    }

    tracing::debug!("Run stream ended");
}

/// Queue an event unless the exchange was cancelled or the consumer left.
async fn forward(tx: &mpsc::Sender<Event>, token: &CancellationToken, event: Event) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        sent = tx.send(event) => sent.is_ok(),
    }
}

fn client_error_event(error: ClientError) -> Event {
    Event::run_error(error.to_string(), CLIENT_ERROR_CODE)
        .with_timestamp(now_millis())
}

fn now_millis() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}
