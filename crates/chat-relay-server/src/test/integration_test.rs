//! End-to-end tests: full router against mocked chat platform and contact relay

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{ChatApiConfig, ContactConfig, ReplyPollingConfig, Settings};
use crate::services::{
    ChatService, ContactService, ConversationGateway, MessageCache, ResponseWaiter, UpstreamClient,
};
use crate::{build_router, AppState};

use super::log_capture::CapturedLogs;

fn fast_polling() -> ReplyPollingConfig {
    ReplyPollingConfig {
        initial_delay_ms: 1,
        max_delay_ms: 5,
        ..ReplyPollingConfig::default()
    }
}

fn app(chat_server: &MockServer, contact_server: &MockServer) -> Router {
    let settings = Settings {
        chat_api: ChatApiConfig {
            base_url: chat_server.uri(),
            timeout_seconds: 5,
        },
        reply_polling: fast_polling(),
        contact: ContactConfig {
            endpoint: format!("{}/submit", contact_server.uri()),
            access_key: Some("access-123".to_string()),
            timeout_seconds: 5,
            ..ContactConfig::default()
        },
        ..Settings::default()
    };

    let platform = Arc::new(UpstreamClient::new(&settings.chat_api).unwrap());
    let gateway = Arc::new(ConversationGateway::new(
        platform,
        MessageCache::new(settings.cache.ttl()),
    ));
    let waiter = ResponseWaiter::new(gateway.clone(), settings.reply_polling.clone());
    let chat_service = Arc::new(ChatService::new(gateway, waiter));
    let contact_service = Arc::new(ContactService::new(settings.contact.clone()).unwrap());

    build_router(AppState::new(chat_service, contact_service, settings))
}

fn platform_message(id: &str, user_id: &str, created_at: &str, text: &str) -> Value {
    json!({
        "id": id,
        "createdAt": created_at,
        "conversationId": "conv_1",
        "userId": user_id,
        "payload": {"type": "text", "text": text}
    })
}

async fn mount_send(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": platform_message("msg_user", "user_1", "2026-01-01T10:00:00.000Z", text)
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn post_json(
    app: Router,
    uri: &str,
    body: Value,
    user_key: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = user_key {
        builder = builder.header("x-user-key", key);
    }

    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_new_visitor_gets_bot_reply() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": "user_1"},
            "key": "key_abcdefghijkl"
        })))
        .expect(1)
        .mount(&chat)
        .await;
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .and(header("x-user-key", "key_abcdefghijkl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation": {
                "id": "conv_1",
                "createdAt": "2026-01-01T09:59:59.000Z",
                "updatedAt": "2026-01-01T09:59:59.000Z"
            }
        })))
        .expect(1)
        .mount(&chat)
        .await;
    mount_send(&chat, "Hello").await;
    Mock::given(method("GET"))
        .and(path("/conversations/conv_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                platform_message("msg_bot", "bot_1", "2026-01-01T10:00:02.000Z", "Hi! How can I help?"),
                platform_message("msg_user", "user_1", "2026-01-01T10:00:00.000Z", "Hello")
            ],
            "meta": {}
        })))
        .mount(&chat)
        .await;

    let (status, body) = post_json(
        app(&chat, &contact),
        "/api/chat",
        json!({"message": "Hello"}),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sentMessage"]["id"], "msg_user");
    assert_eq!(body["botResponse"]["id"], "msg_bot");
    assert_eq!(body["botResponse"]["payload"]["text"], "Hi! How can I help?");
    assert_eq!(body["conversation"]["id"], "conv_1");
    assert_eq!(body["conversation"]["isStarted"], true);
    assert_eq!(body["user"]["key"], "key_abcdefghijkl");
    assert_eq!(body["user"]["id"], "user_1");

    let messages = body["messages"].as_array().unwrap();
    assert!(messages.len() >= 2);
    assert_eq!(messages[0]["id"], "msg_user");
}

#[tokio::test]
async fn test_returning_visitor_skips_creation() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&chat)
        .await;
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&chat)
        .await;
    mount_send(&chat, "Still there?").await;
    Mock::given(method("GET"))
        .and(path("/conversations/conv_1/messages"))
        .and(header("x-user-key", "key_existing_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                platform_message("msg_user", "user_1", "2026-01-01T10:00:00.000Z", "Still there?"),
                platform_message("msg_bot", "bot_1", "2026-01-01T10:00:01.000Z", "Yes!")
            ]
        })))
        .mount(&chat)
        .await;

    let (status, body) = post_json(
        app(&chat, &contact),
        "/api/chat",
        json!({"message": "Still there?", "userId": "user_1", "conversationId": "conv_1"}),
        Some("key_existing_123"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["botResponse"]["id"], "msg_bot");
    assert_eq!(body["user"]["key"], "key_existing_123");
    assert_eq!(body["user"]["id"], "user_1");
}

#[tokio::test]
async fn test_history_failure_still_returns_sent_message() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    mount_send(&chat, "Hello").await;
    Mock::given(method("GET"))
        .and(path("/conversations/conv_1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&chat)
        .await;

    let (status, body) = post_json(
        app(&chat, &contact),
        "/api/chat",
        json!({"message": "Hello", "conversationId": "conv_1"}),
        Some("key_existing_123"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sentMessage"]["id"], "msg_user");
    assert!(body["botResponse"].is_null());
    assert_eq!(body["messages"], json!([]));
    // No user id supplied: taken from the sent message
    assert_eq!(body["user"]["id"], "user_1");
}

#[tokio::test]
async fn test_empty_message_is_rejected_before_upstream() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&chat)
        .await;

    let (status, body) = post_json(
        app(&chat, &contact),
        "/api/chat",
        json!({"message": "   "}),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    let (status, body) = post_json(
        app(&chat, &contact),
        "/api/chat",
        json!({"text": "Hello"}),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_send_failure_is_500_with_stable_code() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key key_existing_123"))
        .mount(&chat)
        .await;

    let (status, body) = post_json(
        app(&chat, &contact),
        "/api/chat",
        json!({"message": "Hello", "conversationId": "conv_1"}),
        Some("key_existing_123"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "MESSAGE_SEND_FAILED");
    assert!(!body.to_string().contains("key_existing_123"));
}

#[tokio::test]
async fn test_send_failure_logs_never_contain_user_key() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key key_existing_123"))
        .mount(&chat)
        .await;

    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let (status, _) = post_json(
        app(&chat, &contact),
        "/api/chat",
        json!({"message": "Hello", "conversationId": "conv_1"}),
        Some("key_existing_123"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let output = logs.contents();
    assert!(output.contains("Message send failed: send_message returned 401"));
    assert!(output.contains("invalid key key_***"));
    assert!(!output.contains("key_existing_123"));
    // One error line with the cause, no second generic one
    assert_eq!(output.matches("Message send failed").count(), 1);
    assert!(!output.contains("Upstream error ["));
}

#[tokio::test]
async fn test_contact_invalid_email() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&contact)
        .await;

    let (status, body) = post_json(
        app(&chat, &contact),
        "/api/contact",
        json!({"name": "Ada", "email": "not-an-email", "message": "Hello there"}),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["fields"]["email"].is_string());
    assert!(body["fields"].get("name").is_none());
}

#[tokio::test]
async fn test_contact_success() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Email sent successfully!"
        })))
        .expect(1)
        .mount(&contact)
        .await;

    let (status, body) = post_json(
        app(&chat, &contact),
        "/api/contact",
        json!({"name": "Ada", "email": "ada@example.com", "message": "Hello there"}),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_cache_invalidation_endpoint() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    let response = app(&chat, &contact)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/conversations/conv_1/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_health() {
    let chat = MockServer::start().await;
    let contact = MockServer::start().await;

    let response = app(&chat, &contact)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["uptimeSeconds"].is_u64());
}
