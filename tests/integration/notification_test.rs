//! Integration tests for notification endpoints.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use charisma_core::types::id::{NotificationId, UserId};
use charisma_entity::notification::{CreateNotification, NotificationKind};
use charisma_entity::user::UserRole;

use helpers::TestApp;

async fn seed(app: &TestApp, user: UserId, count: usize) -> Vec<NotificationId> {
    let mut ids = Vec::new();
    for i in 0..count {
        let request = CreateNotification::to_user(
            user,
            NotificationKind::Info,
            format!("Note {i}"),
            "Body",
        );
        let result = app.state.notifications.send(request).await.unwrap();
        assert!(result.success);
        ids.push(result.notification_id.unwrap());
    }
    ids
}

#[tokio::test]
async fn test_unread_only_filter() {
    let (app, _jobs) = TestApp::new().await;
    let user = UserId::new();
    let token = app.token(user, UserRole::User);
    let ids = seed(&app, user, 5).await;
    for id in &ids[..3] {
        app.state.notifications.mark_as_read(user, *id).await.unwrap();
    }

    let response = app
        .request("GET", "/api/notifications?unread_only=true", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["notifications"].as_array().unwrap().len(), 2);
    assert_eq!(response.data()["unread_count"], 2);

    let response = app
        .request("GET", "/api/notifications?limit=50", None, Some(&token))
        .await;
    assert_eq!(response.data()["notifications"].as_array().unwrap().len(), 5);
    assert_eq!(response.data()["unread_count"], 2);
}

#[tokio::test]
async fn test_mark_read_twice_is_idempotent() {
    let (app, _jobs) = TestApp::new().await;
    let user = UserId::new();
    let token = app.token(user, UserRole::User);
    let ids = seed(&app, user, 2).await;
    let path = format!("/api/notifications/{}/read", ids[0]);

    for _ in 0..2 {
        let response = app.request("PUT", &path, None, Some(&token)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["success"], true);
        assert_eq!(response.data()["message"], "Marked as read");
        assert_eq!(app.state.notifications.unread_count(user).await.unwrap(), 1);
    }
}

#[tokio::test]
async fn test_mark_read_scoped_to_owner() {
    let (app, _jobs) = TestApp::new().await;
    let owner = UserId::new();
    let ids = seed(&app, owner, 1).await;
    let intruder = app.token(UserId::new(), UserRole::User);

    let response = app
        .request("PUT", &format!("/api/notifications/{}/read", ids[0]), None, Some(&intruder))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(
            "PUT",
            &format!("/api/notifications/{}/read", NotificationId::new()),
            None,
            Some(&intruder),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_read_all() {
    let (app, _jobs) = TestApp::new().await;
    let user = UserId::new();
    let token = app.token(user, UserRole::User);
    seed(&app, user, 3).await;

    let response = app
        .request("PUT", "/api/notifications/read-all", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["updated"], 3);
    assert_eq!(app.state.notifications.unread_count(user).await.unwrap(), 0);
}

#[tokio::test]
async fn test_send_requires_admin() {
    let (app, _jobs) = TestApp::new().await;
    let token = app.token(UserId::new(), UserRole::User);
    let body = json!({"type": "info", "title": "Hi", "message": "There"});

    let response = app
        .request("POST", "/api/notifications/send", Some(body.clone()), Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request("POST", "/api/notifications/send", Some(body), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_broadcast_with_no_users_succeeds() {
    let (app, _jobs) = TestApp::new().await;
    let admin = app.token(UserId::new(), UserRole::Admin);

    let response = app
        .request(
            "POST",
            "/api/notifications/send",
            Some(json!({
                "type": "system_announcement",
                "title": "Maintenance",
                "message": "Down at midnight",
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["success"], true);
    assert_eq!(response.data()["delivered"], 0);

    // Any user now sees it as unread.
    let reader = UserId::new();
    let token = app.token(reader, UserRole::User);
    let response = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    assert_eq!(response.data()["unread_count"], 1);
    assert_eq!(
        response.data()["notifications"][0]["title"],
        "Maintenance"
    );
}

#[tokio::test]
async fn test_send_to_user_and_validation() {
    let (app, _jobs) = TestApp::new().await;
    let admin = app.token(UserId::new(), UserRole::Admin);
    let user = UserId::new();

    let response = app
        .request(
            "POST",
            "/api/notifications/send",
            Some(json!({
                "recipient_id": user,
                "type": "success",
                "title": "Report ready",
                "message": "Open it from the dashboard",
                "metadata": {"report_id": "r-1"},
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.data()["notification_id"].is_string());
    assert_eq!(app.state.notifications.unread_count(user).await.unwrap(), 1);

    let response = app
        .request(
            "POST",
            "/api/notifications/send",
            Some(json!({"recipient_id": user, "type": "info", "title": "", "message": "x"})),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let (app, _jobs) = TestApp::new().await;
    let response = app
        .request("GET", "/api/notifications", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_store_outage_is_503() {
    let (app, _jobs) = TestApp::new().await;
    let token = app.token(UserId::new(), UserRole::User);
    app.notifications.set_available(false);

    let response = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], "SERVICE_UNAVAILABLE");
}
