use agui_client::{ClientConfig, RunOptions};
use agui_session::Session;
use agui_types::{
    Event, Message, Role, RunStatus, ToolCallStatus, WireMessage, CLIENT_ERROR_CODE,
};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

const RUN_PATH: &str = "/agui/v1/run";

fn sse_body(events: &[Event]) -> String {
    events
        .iter()
        .map(|event| format!("data: {}\n\n", serde_json::to_string(event).unwrap()))
        .collect()
}

fn session_for(server: &mockito::ServerGuard) -> Session {
    Session::from_config(ClientConfig::new(format!("{}{}", server.url(), RUN_PATH))).unwrap()
}

#[tokio::test]
async fn test_full_run_is_reconciled() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", RUN_PATH)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&[
            Event::run_started(),
            Event::step_started("plan").with_timestamp(10.0),
            Event::tool_call_start("t1", "search"),
            Event::tool_call_args("t1", "{\"q\":\"x\"}"),
            Event::tool_call_result("t1", json!("ok")),
            Event::tool_call_end("t1"),
            Event::step_finished("plan").with_timestamp(20.0),
            Event::state_snapshot(json!({"todos": []})),
            Event::state_delta(json!([{"op": "add", "path": "/todos/-", "value": "ship"}])),
            Event::text_message_start("m1"),
            Event::text_message_content("m1", "Hel"),
            Event::text_message_content("m1", "lo"),
            Event::text_message_end("m1"),
            Event::run_finished(),
        ]))
        .create_async()
        .await;

    let session = session_for(&server);
    session
        .send(
            vec![WireMessage::new("u1", Role::User, "hi")],
            RunOptions::new(),
        )
        .await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, RunStatus::Idle);
    assert_eq!(
        snapshot.messages,
        vec![Message::new("m1", Role::Assistant, "Hello")]
    );
    assert!(snapshot.streaming_message.is_none());
    assert_eq!(snapshot.steps.len(), 1);
    assert_eq!(snapshot.steps[0].end_time, Some(20.0));
    assert_eq!(snapshot.tool_calls.len(), 1);
    assert_eq!(snapshot.tool_calls[0].args_buffer, "{\"q\":\"x\"}");
    assert_eq!(snapshot.tool_calls[0].status, ToolCallStatus::Finished);
    assert_eq!(snapshot.state, json!({"todos": ["ship"]}));
    assert_eq!(snapshot.events.len(), 14);
}

#[tokio::test]
async fn test_http_failure_becomes_error_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", RUN_PATH)
        .with_status(500)
        .create_async()
        .await;

    let session = session_for(&server);
    session.send_user_message("hello").await;

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Error);
    assert_eq!(messages[1].content, "HTTP 500: Internal Server Error");
    assert_eq!(messages[1].code.as_deref(), Some(CLIENT_ERROR_CODE));
    assert_eq!(session.status(), RunStatus::Idle);
    assert_eq!(session.events().len(), 1);
}

#[tokio::test]
async fn test_user_message_sends_history_and_state() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", RUN_PATH)
        .match_body(Matcher::PartialJson(json!({
            "messages": [{"role": "user", "content": "what now?"}],
            "state": {"mode": "plan"},
            "tools": [],
            "context": [],
            "forwardedProps": {},
        })))
        .with_status(200)
        .with_body(sse_body(&[Event::run_started(), Event::run_finished()]))
        .create_async()
        .await;

    let session = session_for(&server);
    session.apply(Event::state_snapshot(json!({"mode": "plan"})));
    session.send_user_message("what now?").await;

    mock.assert_async().await;
    assert_eq!(session.messages().len(), 1);
}

#[tokio::test]
async fn test_send_resets_run_scoped_projections() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", RUN_PATH)
        .with_status(200)
        .with_body(sse_body(&[Event::run_started(), Event::run_finished()]))
        .create_async()
        .await;

    let session = session_for(&server);
    session.apply(Event::step_started("old"));
    session.apply(Event::tool_call_start("old", "tool"));
    session.apply(Event::state_snapshot(json!({"kept": true})));

    session.send(Vec::new(), RunOptions::new()).await;

    assert!(session.steps().is_empty());
    assert!(session.tool_calls().is_empty());
    assert_eq!(session.state(), json!({"kept": true}));
}

#[tokio::test]
async fn test_abort_before_response_reduces_nothing() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", RUN_PATH)
        .with_status(200)
        .with_body(sse_body(&[Event::run_started(), Event::run_finished()]))
        .create_async()
        .await;

    let session = session_for(&server);
    session.abort();
    session.abort();

    let run = session.send(Vec::new(), RunOptions::new());
    tokio::pin!(run);

    // Start the run, then abort it before the spawned exchange gets to reply
    let _ = poll_once(run.as_mut()).await;
    session.abort();
    run.await;

    assert!(session.events().is_empty());
    assert_eq!(session.status(), RunStatus::Idle);
}

async fn poll_once<F: std::future::Future + Unpin>(future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        output = future => Some(output),
        _ = std::future::ready(()) => None,
    }
}

/// Read one HTTP request, headers and `Content-Length` body.
async fn read_request(socket: &mut TcpStream) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        request.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&request);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if request.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }
}

/// Serve one streaming response: `first` immediately, `rest` once `resume` fires.
async fn staged_server(
    first: Vec<Event>,
    rest: Vec<Event>,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}{}", listener.local_addr().unwrap(), RUN_PATH);
    let (resume_tx, resume_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(sse_body(&first).as_bytes()).await.unwrap();
        socket.flush().await.unwrap();

        let _ = resume_rx.await;
        // The client may already have hung up
        let _ = socket.write_all(sse_body(&rest).as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    (url, resume_tx, server)
}

async fn wait_for_events(session: &Session, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while session.events().len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_abort_mid_stream_stops_reduction() {
    let (url, resume, server) = staged_server(
        vec![Event::run_started()],
        vec![Event::step_started("late"), Event::run_finished()],
    )
    .await;

    let session = Arc::new(Session::from_config(ClientConfig::new(url)).unwrap());
    let run = tokio::spawn({
        let session = session.clone();
        async move { session.send(Vec::new(), RunOptions::new()).await }
    });

    wait_for_events(&session, 1).await;
    session.abort();
    resume.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
    server.await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(session.events().len(), 1);
    assert!(session.steps().is_empty());
    assert!(!session.client().is_in_flight());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", RUN_PATH)
        .with_status(200)
        .with_body(sse_body(&[
            Event::run_started(),
            Event::state_snapshot(json!({"n": 1})),
            Event::run_finished(),
        ]))
        .expect(1)
        .create_async()
        .await;

    let first = session_for(&server);
    let second = session_for(&server);

    first.send(Vec::new(), RunOptions::new()).await;

    assert_eq!(first.state(), json!({"n": 1}));
    assert_eq!(second.state(), json!({}));
    assert!(second.events().is_empty());
}
