//! Integration tests for the server-sent event stream.

mod helpers;

use std::collections::HashSet;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use charisma_core::types::id::UserId;
use charisma_database::JobStore;
use charisma_entity::notification::{CreateNotification, NotificationKind};
use charisma_entity::user::UserRole;

use helpers::{TestApp, analysis_job};

/// Open the stream and return the response body.
async fn open(app: &TestApp, uri: &str, bearer: Option<&str>) -> axum::response::Response {
    let mut req = Request::builder().uri(uri);
    if let Some(token) = bearer {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    app.router
        .clone()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Read one event as `(name, data)`.
async fn next_event(body: &mut Body) -> (String, Value) {
    let frame = tokio::time::timeout(Duration::from_secs(120), body.frame())
        .await
        .expect("timed out waiting for an event")
        .expect("stream ended")
        .expect("body error");
    let bytes = frame.into_data().expect("expected a data frame");
    let text = std::str::from_utf8(&bytes).unwrap();

    let mut name = String::new();
    let mut data = String::new();
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            name = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push_str(rest.trim());
        }
    }
    (name, serde_json::from_str(&data).unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_connected_then_heartbeat() {
    let (app, _jobs) = TestApp::new().await;
    let user = UserId::new();
    let token = app.token(user, UserRole::User);

    let response = open(&app, "/api/notifications/stream", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()["x-accel-buffering"], "no");

    let mut body = response.into_body();
    let (name, data) = next_event(&mut body).await;
    assert_eq!(name, "connected");
    assert_eq!(data["type"], "connected");
    assert_eq!(data["user_id"], user.to_string());

    let (name, data) = next_event(&mut body).await;
    assert_eq!(name, "heartbeat");
    assert!(data["timestamp"].is_string());
}

#[tokio::test]
async fn test_query_token_accepted() {
    let (app, _jobs) = TestApp::new().await;
    let token = app.token(UserId::new(), UserRole::User);

    let response = open(&app, &format!("/api/notifications/stream?token={token}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    assert_eq!(next_event(&mut body).await.0, "connected");
}

#[tokio::test]
async fn test_missing_or_bad_token_rejected() {
    let (app, _jobs) = TestApp::new().await;

    let response = open(&app, "/api/notifications/stream", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = open(&app, "/api/notifications/stream?token=garbage", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.state.streams.registry().total(), 0);
}

#[tokio::test]
async fn test_notification_relayed_to_owner_only() {
    let (app, _jobs) = TestApp::new().await;
    let alice = UserId::new();
    let bob = UserId::new();

    let mut alice_body = open(&app, "/api/notifications/stream", Some(&app.token(alice, UserRole::User)))
        .await
        .into_body();
    let mut bob_body = open(&app, "/api/notifications/stream", Some(&app.token(bob, UserRole::User)))
        .await
        .into_body();
    next_event(&mut alice_body).await;
    next_event(&mut bob_body).await;

    let result = app
        .state
        .notifications
        .send(CreateNotification::to_user(alice, NotificationKind::Info, "For Alice", "Hi"))
        .await
        .unwrap();
    assert_eq!(result.delivered, 1);

    let broadcast = app
        .state
        .notifications
        .send_to_all(CreateNotification::broadcast(
            NotificationKind::SystemAnnouncement,
            "Everyone",
            "Hello all",
        ))
        .await
        .unwrap();
    assert!(broadcast.success);

    let (name, data) = next_event(&mut alice_body).await;
    assert_eq!(name, "notification");
    assert_eq!(data["title"], "For Alice");

    // Bob's first event is the broadcast, not Alice's notification.
    let (name, data) = next_event(&mut bob_body).await;
    assert_eq!(name, "system_announcement");
    assert_eq!(data["title"], "Everyone");
}

#[tokio::test]
async fn test_job_completion_events() {
    let (app, jobs) = TestApp::new().await;
    let user = UserId::new();
    let mut body = open(&app, "/api/notifications/stream", Some(&app.token(user, UserRole::User)))
        .await
        .into_body();
    next_event(&mut body).await;

    let job = jobs.create(analysis_job(user)).await.unwrap();
    app.state.queue.enqueue(&job).await.unwrap();
    let (_, claimed) = app.state.queue.claim().await.unwrap().unwrap();
    assert_eq!(claimed.id, job.id);
    app.state
        .queue
        .complete(job.id, serde_json::json!({"score": 0.9}))
        .await
        .unwrap();

    // Events arrive on separate channels, so order across them is not fixed.
    let mut names = HashSet::new();
    for _ in 0..3 {
        let (name, data) = next_event(&mut body).await;
        if name != "notification" {
            assert_eq!(data["job_id"], job.id.to_string());
        }
        names.insert(name);
    }
    assert_eq!(
        names,
        HashSet::from([
            "job_update".to_string(),
            "analysis_complete".to_string(),
            "notification".to_string(),
        ])
    );
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_releases_session() {
    let (app, _jobs) = TestApp::new().await;
    let user = UserId::new();
    let mut body = open(&app, "/api/notifications/stream", Some(&app.token(user, UserRole::User)))
        .await
        .into_body();
    next_event(&mut body).await;
    assert_eq!(app.state.streams.registry().count_for_user(user), 1);

    drop(body);
    for _ in 0..100 {
        if app.state.streams.registry().total() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(app.state.streams.registry().total(), 0);

    let response = app
        .request("GET", "/api/health/detailed", None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["streams"]["open_sessions"], 0);
}

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _jobs) = TestApp::new().await;

    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "ok");

    let response = app.request("GET", "/api/health/detailed", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "ok");
    assert_eq!(response.data()["database"]["provider"], "memory");
    assert_eq!(response.data()["queue"]["status"], "up");

    let (degraded, jobs) = TestApp::new().await;
    jobs.set_available(false);
    let response = degraded
        .request("GET", "/api/health/detailed", None, None)
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.data()["database"]["status"], "down");
}
