//! End-to-end streaming against a mock TalkForge server

use pretty_assertions::assert_eq;
use serde_json::json;
use talkforge_rs::{
    config::ClientConfig,
    messages::{ChatMessage, FunctionCall, MessageList, Role},
    services::{streaming::StreamIngestor, ChatStreamClient, StreamStatus},
    ForgeError,
};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const STREAM_PATH: &str = "/api/v1/chat/stream/submit";

fn client_for(server: &MockServer) -> ChatStreamClient {
    let config = ClientConfig {
        base_url: server.uri(),
        ..ClientConfig::default()
    };
    ChatStreamClient::new(config).unwrap()
}

#[tokio::test]
async fn streams_content_into_live_message() {
    let server = MockServer::start().await;
    let body = concat!(
        "data:{\"delta\":{\"role\":\"assistant\"}},\n",
        "\n",
        "data:{\"delta\":{\"content\":\"Hello\"}},\n",
        "\n",
        "data:{\"delta\":{\"content\":\",\\n\\nw\u{f6}rld\"}},\n",
        "\n",
    );
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(header("accept", "text/event-stream"))
        .and(body_json(json!({"content": "hi", "sessionId": "s-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let ingestor = StreamIngestor::new(client_for(&server));
    let mut messages = MessageList::new();
    messages.push(ChatMessage::user("hi"));
    let mut updates = Vec::new();

    let mut live = messages.live(|m: &ChatMessage| updates.push(m.content.clone()));
    let outcome = ingestor.stream_submit("s-1", "hi", &mut live).await.unwrap();
    assert_eq!(live.status(), &StreamStatus::Idle);
    drop(live);

    assert_eq!(outcome.deltas_applied, 2);
    assert_eq!(outcome.records_dropped, 1);
    assert_eq!(outcome.discarded_tail_bytes, 0);
    assert_eq!(updates, vec!["Hello".to_string(), "Hello,<p/>w\u{f6}rld".to_string()]);

    assert_eq!(messages.len(), 2);
    let reply = messages.last().unwrap();
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content, "Hello,<p/>w\u{f6}rld");
}

#[tokio::test]
async fn streams_function_call() {
    let server = MockServer::start().await;
    let body = concat!(
        "data:{\"delta\":{\"function_call\":{\"name\":\"get_weather\",\"arguments\":\"\"}}},\n",
        "data:{\"delta\":{\"function_call\":{\"arguments\":\"{\\\"city\\\":\"}}},\n",
        "data:{\"delta\":{\"function_call\":{\"arguments\":\"\\\"Oslo\\\"}\"}}},\n",
    );
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    // Post-processing is skipped for function calls, so no GET mock is needed.
    let ingestor = StreamIngestor::new(client_for(&server)).with_post_process(true);
    let mut messages = MessageList::new();
    let mut live = messages.live(|_: &ChatMessage| {});
    let outcome = ingestor.stream_submit("s-2", "weather?", &mut live).await.unwrap();
    drop(live);

    assert!(outcome.saw_function_call);
    let call = messages.last().unwrap().function_call.clone().unwrap();
    assert_eq!(
        call,
        FunctionCall {
            name: "get_weather".to_string(),
            arguments: r#"{"city":"Oslo"}"#.to_string(),
        }
    );
    assert_eq!(call.parsed_arguments().unwrap()["city"], "Oslo");
}

#[tokio::test]
async fn error_status_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("Session not found"))
        .mount(&server)
        .await;

    let ingestor = StreamIngestor::new(client_for(&server));
    let mut messages = MessageList::new();
    let mut live = messages.live(|_: &ChatMessage| {});
    let err = ingestor.stream_submit("missing", "hi", &mut live).await.unwrap_err();
    let status = live.status().clone();
    drop(live);

    match err {
        ForgeError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Session not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(matches!(status, StreamStatus::Failed(_)));
    // The placeholder stays in the list.
    assert_eq!(messages.len(), 1);
    assert_eq!(messages.last().unwrap().content, "");
}

#[tokio::test]
async fn post_process_replaces_streamed_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data:{\"delta\":{\"content\":\"`x`\"}},\n", "text/event-stream"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/session/s-3/postprocess/last"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "role": "assistant",
            "content": "<code>x</code>"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ingestor = StreamIngestor::new(client_for(&server)).with_post_process(true);
    let mut messages = MessageList::new();
    let mut live = messages.live(|_: &ChatMessage| {});
    ingestor.stream_submit("s-3", "code", &mut live).await.unwrap();
    drop(live);

    assert_eq!(messages.len(), 1);
    assert_eq!(messages.last().unwrap().content, "<code>x</code>");
}
