//! WebSocket integration tests
//!
//! Run with: cargo test -p integration-tests --test websocket_tests

use futures_util::SinkExt;
use chrono::{Duration as ChronoDuration, Utc};
use integration_tests::{
    assert_error, assert_json, eventually, next_close_code, next_envelope, TestServer, WsClient,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

async fn publish(server: &TestServer, body: Value) -> String {
    let response = server.post("/notifications", &body).await.unwrap();
    let accepted: Value = assert_json(response, StatusCode::ACCEPTED).await.unwrap();
    accepted["id"].as_str().unwrap().to_string()
}

/// Poll the stored notification until it leaves `pending`
async fn settled_status(server: &TestServer, id: &str) -> String {
    for _ in 0..200 {
        let response = server.get(&format!("/notifications/{id}")).await.unwrap();
        if response.status() == StatusCode::OK {
            let body: Value = response.json().await.unwrap();
            if body["status"] != "pending" {
                return body["status"].as_str().unwrap().to_string();
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("notification {id} still pending");
}

#[tokio::test]
async fn test_notification_reaches_user() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = server.connect_notify("alice").await.unwrap();

    let response = server
        .post(
            "/notifications",
            &json!({ "user_id": "alice", "kind": "greeting", "payload": {"text": "hi"} }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let envelope = next_envelope(&mut alice).await.unwrap();
    assert_eq!(envelope["type"], "notification");
    assert_eq!(envelope["payload"]["kind"], "greeting");
    assert_eq!(envelope["payload"]["payload"]["text"], "hi");
}

#[tokio::test]
async fn test_queue_changes_are_pushed() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = server.connect_notify("alice").await.unwrap();
    let mut bob = server.connect_notify("bob").await.unwrap();

    for user in ["alice", "bob"] {
        server
            .post("/events/concert/queue", &json!({ "user_id": user }))
            .await
            .unwrap();
    }

    let update = next_envelope(&mut alice).await.unwrap();
    assert_eq!(update["payload"]["kind"], "queue.update");
    assert_eq!(update["payload"]["payload"]["position"], 1);

    let update = next_envelope(&mut bob).await.unwrap();
    assert_eq!(update["payload"]["payload"]["position"], 2);

    // Alice leaves, bob moves up
    server.delete("/events/concert/queue/alice").await.unwrap();
    let update = next_envelope(&mut bob).await.unwrap();
    assert_eq!(update["payload"]["payload"]["position"], 1);
    assert_eq!(update["payload"]["payload"]["status"], "waiting");
}

#[tokio::test]
async fn test_queue_commands_over_socket() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = server.connect_notify("alice").await.unwrap();

    send_text(
        &mut alice,
        r#"{"type":"queue.join","payload":{"resource_id":"expo"}}"#,
    )
    .await;
    let update = next_envelope(&mut alice).await.unwrap();
    assert_eq!(update["payload"]["kind"], "queue.update");

    send_text(
        &mut alice,
        r#"{"type":"queue.position","payload":{"resource_id":"expo"}}"#,
    )
    .await;
    let reply = next_envelope(&mut alice).await.unwrap();
    assert_eq!(reply["type"], "queue.position");
    assert_eq!(reply["payload"]["position"], 1);

    // A rejected command is answered and the session stays up
    send_text(&mut alice, "not a command").await;
    let error = next_envelope(&mut alice).await.unwrap();
    assert_eq!(error["type"], "error");
    assert_eq!(error["payload"]["code"], "INVALID_FRAME");

    send_text(
        &mut alice,
        r#"{"type":"queue.join","payload":{"resource_id":"expo"}}"#,
    )
    .await;
    let error = next_envelope(&mut alice).await.unwrap();
    assert_eq!(error["payload"]["code"], "ALREADY_QUEUED");
}

#[tokio::test]
async fn test_reconnect_replaces_session() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut first = server.connect_notify("alice").await.unwrap();
    let first_id = server.state.notify_hub().session_id("alice").unwrap();

    let mut second = server.connect_notify("alice").await.unwrap();
    let hub = server.state.notify_hub();
    eventually(|| hub.session_id("alice").is_some_and(|id| id != first_id))
        .await
        .unwrap();

    assert_eq!(next_close_code(&mut first).await.unwrap(), 4000);
    assert_eq!(hub.len(), 1);

    server
        .post(
            "/notifications",
            &json!({ "user_id": "alice", "kind": "greeting" }),
        )
        .await
        .unwrap();
    let envelope = next_envelope(&mut second).await.unwrap();
    assert_eq!(envelope["payload"]["kind"], "greeting");
}

#[tokio::test]
async fn test_notify_requires_user_id() {
    let server = TestServer::start().await.expect("Failed to start server");
    let url = format!("ws://{}/ws/notify", server.addr);
    assert!(connect_async(url).await.is_err());
}

#[tokio::test]
async fn test_chat_room_broadcast_and_history() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = server.connect_chat("lobby", "alice", 1).await.unwrap();
    let mut bob = server.connect_chat("lobby", "bob", 2).await.unwrap();

    send_text(&mut alice, "hello\nlobby").await;

    for ws in [&mut alice, &mut bob] {
        let envelope = next_envelope(ws).await.unwrap();
        assert_eq!(envelope["type"], "chat.message");
        assert_eq!(envelope["payload"]["sender_id"], "alice");
        assert_eq!(envelope["payload"]["content"], "hello lobby");
    }

    // Latecomers get the history first
    let mut carol = server.connect_chat("lobby", "carol", 3).await.unwrap();
    let replayed = next_envelope(&mut carol).await.unwrap();
    assert_eq!(replayed["payload"]["content"], "hello lobby");
}

#[tokio::test]
async fn test_empty_room_is_dropped() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = server.connect_chat("side", "alice", 1).await.unwrap();

    alice.close(None).await.unwrap();

    let rooms = server.state.rooms();
    eventually(|| rooms.get("side").is_none()).await.unwrap();
}

#[tokio::test]
async fn test_notification_status_is_recorded() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = server.connect_notify("alice").await.unwrap();

    let delivered = publish(&server, json!({ "user_id": "alice", "kind": "ping", "payload": {} })).await;
    next_envelope(&mut alice).await.unwrap();
    assert_eq!(settled_status(&server, &delivered).await, "sent");

    let offline = publish(&server, json!({ "user_id": "nobody", "kind": "ping", "payload": {} })).await;
    assert_eq!(settled_status(&server, &offline).await, "failed");

    let response = server.get("/notifications/unknown").await.unwrap();
    assert_error(response, StatusCode::NOT_FOUND, "NOTIFICATION_NOT_FOUND")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_scheduled_notification_is_delivered_when_due() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = server.connect_notify("alice").await.unwrap();

    let at = Utc::now() + ChronoDuration::milliseconds(300);
    let id = publish(
        &server,
        json!({ "user_id": "alice", "kind": "reminder", "payload": {}, "scheduled_at": at }),
    )
    .await;

    let envelope = next_envelope(&mut alice).await.unwrap();
    assert_eq!(envelope["payload"]["kind"], "reminder");
    assert!(Utc::now() >= at);
    assert_eq!(settled_status(&server, &id).await, "sent");
}

#[tokio::test]
async fn test_cancel_scheduled_notification() {
    let server = TestServer::start().await.expect("Failed to start server");

    let at = Utc::now() + ChronoDuration::hours(1);
    let id = publish(
        &server,
        json!({ "user_id": "alice", "kind": "reminder", "payload": {}, "scheduled_at": at }),
    )
    .await;

    // Publishing is asynchronous; wait for the dispatcher to store it
    let mut stored = false;
    for _ in 0..200 {
        if server.get(&format!("/notifications/{id}")).await.unwrap().status() == StatusCode::OK {
            stored = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(stored, "notification {id} never stored");

    let response = server.delete(&format!("/notifications/{id}")).await.unwrap();
    let cancelled: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");

    let response = server.delete(&format!("/notifications/{id}")).await.unwrap();
    assert_error(response, StatusCode::CONFLICT, "NOT_CANCELLABLE")
        .await
        .unwrap();

    let response = server.delete("/notifications/unknown").await.unwrap();
    assert_error(response, StatusCode::NOT_FOUND, "NOTIFICATION_NOT_FOUND")
        .await
        .unwrap();
}
