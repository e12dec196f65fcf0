use agui_client::{ClientConfig, RunClient, RunOptions};
use agui_types::{Event, EventKind, Role, WireMessage, CLIENT_ERROR_CODE};
use mockito::Matcher;
use serde_json::json;

const RUN_PATH: &str = "/agui/v1/run";

fn sse_body(events: &[Event]) -> String {
    events
        .iter()
        .map(|event| format!("data: {}\n\n", serde_json::to_string(event).unwrap()))
        .collect()
}

fn client_for(server: &mockito::ServerGuard) -> RunClient {
    RunClient::new(ClientConfig::new(format!("{}{}", server.url(), RUN_PATH))).unwrap()
}

fn user_message(content: &str) -> Vec<WireMessage> {
    vec![WireMessage::new("u1", Role::User, content)]
}

#[tokio::test]
async fn test_streams_events_in_order() {
    let mut server = mockito::Server::new_async().await;
    let body = sse_body(&[
        Event::run_started(),
        Event::text_message_start("m1"),
        Event::text_message_content("m1", "Hi"),
        Event::text_message_end("m1"),
        Event::run_finished(),
    ]);
    let mock = server
        .mock("POST", RUN_PATH)
        .match_header("content-type", "application/json")
        .match_header("accept", "text/event-stream")
        .match_body(Matcher::PartialJson(json!({
            "threadId": "thread-1",
            "messages": [{"id": "u1", "role": "user", "content": "hello"}],
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let client = client_for(&server);
    let mut received = Vec::new();
    client
        .send(
            user_message("hello"),
            RunOptions::new().thread_id("thread-1"),
            |event| received.push(event.type_name().to_string()),
        )
        .await;

    mock.assert_async().await;
    assert_eq!(
        received,
        vec![
            "RUN_STARTED",
            "TEXT_MESSAGE_START",
            "TEXT_MESSAGE_CONTENT",
            "TEXT_MESSAGE_END",
            "RUN_FINISHED",
        ]
    );
}

#[tokio::test]
async fn test_http_error_yields_single_run_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", RUN_PATH)
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let client = client_for(&server);
    let mut received = Vec::new();
    client
        .send(user_message("hello"), RunOptions::new(), |event| {
            received.push(event)
        })
        .await;

    assert_eq!(received.len(), 1);
    match &received[0].kind {
        EventKind::RunError { message, code } => {
            assert_eq!(message.as_deref(), Some("HTTP 500: Internal Server Error"));
            assert_eq!(code.as_deref(), Some(CLIENT_ERROR_CODE));
        }
        other => panic!("Expected RunError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_failure_yields_client_error() {
    // Nothing listens on port 1
    let client = RunClient::new(ClientConfig::new("http://127.0.0.1:1/run")).unwrap();

    let mut stream = client.start(user_message("hello"), RunOptions::new());
    let event = stream.next().await.unwrap();

    match event.kind {
        EventKind::RunError { code, .. } => assert_eq!(code.as_deref(), Some(CLIENT_ERROR_CODE)),
        other => panic!("Expected RunError, got {:?}", other),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_abort_stops_delivery() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", RUN_PATH)
        .with_status(200)
        .with_body(sse_body(&[Event::run_started(), Event::run_finished()]))
        .create_async()
        .await;

    let client = client_for(&server);
    let mut stream = client.start(user_message("hello"), RunOptions::new());
    assert!(client.is_in_flight());

    client.abort();
    client.abort();

    assert!(!client.is_in_flight());

    assert!(stream.is_cancelled());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_new_run_supersedes_previous() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", RUN_PATH)
        .with_status(200)
        .with_body(sse_body(&[Event::run_started(), Event::run_finished()]))
        .expect_at_least(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let mut first = client.start(user_message("one"), RunOptions::new());
    let mut second = client.start(user_message("two"), RunOptions::new());

    assert!(first.next().await.is_none());

    let mut types = Vec::new();
    while let Some(event) = second.next().await {
        types.push(event.type_name().to_string());
    }
    assert_eq!(types, vec!["RUN_STARTED", "RUN_FINISHED"]);
}

#[test]
fn test_rejects_invalid_endpoint() {
    assert!(RunClient::new(ClientConfig::new("not a url")).is_err());
}
