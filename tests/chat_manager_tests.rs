//! Chat manager tests over the real HTTP client and a mock endpoint

use std::sync::Arc;
use std::time::Duration;

use chatstream::application::ports::CompletionError;
use chatstream::application::{ChatError, ChatEvent, ChatManager, ChatSettings};
use chatstream::domain::chat::{ChatMessage, ModelProfile, RetryPolicy};
use chatstream::infrastructure::{ClientOptions, OpenAiClient};
use futures::StreamExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_reply(parts: &[&str]) -> String {
    let mut body = String::new();
    for part in parts {
        let chunk = serde_json::json!({"choices": [{"delta": {"content": part}}]});
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn profile(server: &MockServer) -> ModelProfile {
    ModelProfile::from_base_url("mock", &server.uri(), Some("sk-mock".to_string()), "mock-model")
}

fn manager(max_attempts: u32) -> ChatManager<OpenAiClient> {
    ChatManager::new(
        Arc::new(OpenAiClient::default()),
        ChatSettings {
            retry: RetryPolicy::no_delay(max_attempts),
            ..Default::default()
        },
    )
}

fn reply_text(events: &[ChatEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Delta(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn conversation_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "first"}]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_reply(&["one"]), "text/event-stream"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "mock-model",
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "one"},
                {"role": "user", "content": "second"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_reply(&["t", "wo"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager(1);
    let profile = profile(&server);

    let first: Vec<_> = manager.send_message_stream("first", &profile).collect().await;
    assert_eq!(reply_text(&first), "one");

    let second: Vec<_> = manager.send_message_stream("second", &profile).collect().await;
    assert_eq!(reply_text(&second), "two");
    assert!(matches!(second.last(), Some(ChatEvent::Done)));

    assert_eq!(manager.history("mock").len(), 4);
}

#[tokio::test]
async fn server_error_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_reply(&["recovered"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let manager = manager(3);
    let events: Vec<_> = manager
        .send_message_stream("hello", &profile(&server))
        .collect()
        .await;

    assert!(matches!(
        events[0],
        ChatEvent::Retrying {
            attempt: 1,
            error: CompletionError::Http { status: 502, .. },
            ..
        }
    ));
    assert_eq!(reply_text(&events), "recovered");
    assert_eq!(
        manager.history("mock"),
        vec![ChatMessage::user("hello"), ChatMessage::assistant("recovered")]
    );
}

#[tokio::test]
async fn rate_limit_is_retried_until_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let manager = manager(2);
    let events: Vec<_> = manager
        .send_message_stream("hello", &profile(&server))
        .collect()
        .await;

    assert!(matches!(events[0], ChatEvent::Retrying { delay, .. } if delay == Duration::ZERO));
    assert!(matches!(
        events.last(),
        Some(ChatEvent::Failed(ChatError::RetriesExhausted {
            attempts: 2,
            last: CompletionError::RateLimited { .. },
        }))
    ));
}

#[tokio::test]
async fn rejected_key_fails_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager(3);
    let events: Vec<_> = manager
        .send_message_stream("hello", &profile(&server))
        .collect()
        .await;

    assert!(matches!(
        events.as_slice(),
        [ChatEvent::Failed(ChatError::Completion(
            CompletionError::InvalidApiKey
        ))]
    ));
}

#[tokio::test]
async fn invalid_proxy_fails_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_reply(&["x"]), "text/event-stream"))
        .expect(0)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(ClientOptions {
        proxy: Some("::not a url".to_string()),
        ..ClientOptions::default()
    });
    let manager = ChatManager::new(
        Arc::new(client),
        ChatSettings {
            retry: RetryPolicy::no_delay(3),
            ..Default::default()
        },
    );
    let events: Vec<_> = manager
        .send_message_stream("hello", &profile(&server))
        .collect()
        .await;

    assert!(matches!(
        events.as_slice(),
        [ChatEvent::Failed(ChatError::Completion(CompletionError::Config(_)))]
    ));
}

#[tokio::test]
async fn in_band_error_payload_fails_reply() {
    let server = MockServer::start().await;
    let body = "data: {\"error\":{\"message\":\"context length exceeded\"}}\n\n";

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager(3);
    let events: Vec<_> = manager
        .send_message_stream("hello", &profile(&server))
        .collect()
        .await;

    match events.last() {
        Some(ChatEvent::Failed(ChatError::Completion(CompletionError::Api(message)))) => {
            assert_eq!(message, "context length exceeded");
        }
        other => panic!("expected in-band API error, got {:?}", other),
    }
}

#[tokio::test]
async fn interrupt_while_waiting_for_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_reply(&["too late"]), "text/event-stream")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let manager = manager(3);
    let mut events = manager.send_message_stream("hello", &profile(&server));

    let interrupter = manager.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        interrupter.interrupt();
    });

    let event = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .expect("interrupt should end the wait");
    assert!(matches!(event, Some(ChatEvent::Interrupted)));
    assert_eq!(manager.history("mock"), vec![ChatMessage::user("hello")]);
}
