//! Queue facade integration tests
//!
//! Run with: cargo test -p integration-tests --test queue_tests

use integration_tests::{assert_error, assert_json, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn join(server: &TestServer, event: &str, user: &str) -> Value {
    let response = server
        .post(&format!("/events/{event}/queue"), &json!({ "user_id": user }))
        .await
        .unwrap();
    assert_json(response, StatusCode::CREATED).await.unwrap()
}

async fn position(server: &TestServer, event: &str, user: &str) -> u64 {
    let response = server
        .get(&format!("/events/{event}/queue/{user}/position"))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    body["position"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["dispatcher_running"], true);
    assert_eq!(body["scheduler_running"], true);
}

#[tokio::test]
async fn test_queue_lifecycle() {
    let server = TestServer::start().await.expect("Failed to start server");

    for (i, user) in ["alice", "bob", "carol"].iter().enumerate() {
        let entry = join(&server, "concert", user).await;
        assert_eq!(entry["status"], "waiting");
        assert_eq!(entry["position"], i + 1);
    }

    // Leaving shifts everyone behind
    let response = server.delete("/events/concert/queue/alice").await.unwrap();
    let left: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(left["user_id"], "alice");
    assert_eq!(position(&server, "concert", "bob").await, 1);
    assert_eq!(position(&server, "concert", "carol").await, 2);

    // Head is admitted, then completes
    let response = server.post_empty("/events/concert/queue-actions/next").await.unwrap();
    let head: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(head["user_id"], "bob");
    assert_eq!(head["status"], "active");
    assert_eq!(position(&server, "concert", "carol").await, 1);

    let response = server
        .post_empty("/events/concert/queue/bob/complete")
        .await
        .unwrap();
    let done: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(done["status"], "completed");

    let response = server.get("/events/concert/queue").await.unwrap();
    let status: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(status["waiting"], 1);
    assert_eq!(status["entries"][0]["user_id"], "carol");

    // Close cancels whoever is left and refuses new joins
    let response = server.post_empty("/events/concert/queue-actions/close").await.unwrap();
    let cancelled: Vec<Value> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0]["user_id"], "carol");

    let response = server
        .post("/events/concert/queue", &json!({ "user_id": "dave" }))
        .await
        .unwrap();
    assert_error(response, StatusCode::CONFLICT, "RESOURCE_CLOSED")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_queue_errors() {
    let server = TestServer::start().await.expect("Failed to start server");
    join(&server, "expo", "alice").await;

    let response = server
        .post("/events/expo/queue", &json!({ "user_id": "alice" }))
        .await
        .unwrap();
    assert_error(response, StatusCode::CONFLICT, "ALREADY_QUEUED")
        .await
        .unwrap();

    let response = server.delete("/events/expo/queue/bob").await.unwrap();
    assert_error(response, StatusCode::NOT_FOUND, "NOT_QUEUED")
        .await
        .unwrap();

    let response = server.get("/events/expo/queue/bob/position").await.unwrap();
    assert_error(response, StatusCode::NOT_FOUND, "NOT_QUEUED")
        .await
        .unwrap();

    let response = server.post_empty("/events/empty/queue-actions/next").await.unwrap();
    assert_error(response, StatusCode::CONFLICT, "EMPTY_QUEUE")
        .await
        .unwrap();

    let response = server
        .post("/events/expo/queue", &json!({ "user_id": "" }))
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_resources_are_independent() {
    let server = TestServer::start().await.expect("Failed to start server");

    join(&server, "a", "alice").await;
    join(&server, "b", "bob").await;
    join(&server, "b", "alice").await;

    assert_eq!(position(&server, "a", "alice").await, 1);
    assert_eq!(position(&server, "b", "alice").await, 2);

    server.post_empty("/events/a/queue-actions/close").await.unwrap();
    assert_eq!(position(&server, "b", "alice").await, 2);
}

#[tokio::test]
async fn test_user_ids_matching_action_names() {
    let server = TestServer::start().await.expect("Failed to start server");

    join(&server, "gala", "next").await;
    join(&server, "gala", "close").await;
    assert_eq!(position(&server, "gala", "close").await, 2);

    let response = server.delete("/events/gala/queue/next").await.unwrap();
    let left: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(left["user_id"], "next");
    assert_eq!(position(&server, "gala", "close").await, 1);

    let response = server.post_empty("/events/gala/queue-actions/next").await.unwrap();
    let head: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(head["user_id"], "close");
}
