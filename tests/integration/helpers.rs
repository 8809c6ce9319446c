//! Shared test helpers for integration tests.
//!
//! Every test app runs on in-memory stores and backends, so no external
//! services are needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use charisma_api::{AppState, build_app};
use charisma_auth::JwtEncoder;
use charisma_cache::CacheBackends;
use charisma_core::config::AppConfig;
use charisma_core::types::id::UserId;
use charisma_database::memory::{MemoryJobStore, MemoryNotificationStore};
use charisma_database::{JobStore, Stores};
use charisma_entity::job::{AnalysisPayload, AnalysisProvider, CreateJob, JobType};
use charisma_entity::user::UserRole;

pub const CRON_SECRET: &str = "integration-cron-secret";
pub const JWT_SECRET: &str = "integration-jwt-secret";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for driving services directly
    pub state: AppState,
    /// Notification store, for toggling availability
    pub notifications: Arc<MemoryNotificationStore>,
    encoder: JwtEncoder,
}

/// Configuration used by every test app.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.cron.secret = CRON_SECRET.to_string();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.logging.level = "debug".to_string();
    config
}

impl TestApp {
    /// App over a fresh in-memory job store.
    pub async fn new() -> (Self, Arc<MemoryJobStore>) {
        let jobs = Arc::new(MemoryJobStore::new());
        let app = Self::with_job_store(jobs.clone(), test_config());
        (app, jobs)
    }

    /// App over a caller-supplied job store.
    pub fn with_job_store(jobs: Arc<dyn JobStore>, config: AppConfig) -> Self {
        let notifications = Arc::new(MemoryNotificationStore::new());
        let stores = Stores {
            jobs,
            notifications: notifications.clone(),
            pool: None,
        };
        let backends = CacheBackends::in_memory(&config.cache, &config.realtime);
        let encoder = JwtEncoder::new(&config.auth);
        let state = AppState::new(config, stores, backends);

        Self {
            router: build_app(state.clone()),
            state,
            notifications,
            encoder,
        }
    }

    /// Session token for `user_id` with `role`.
    pub fn token(&self, user_id: UserId, role: UserRole) -> String {
        self.encoder
            .issue(user_id, role, chrono::Duration::hours(1))
            .expect("Failed to issue token")
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        self.request_with_auth(method, path, body, token.map(|t| format!("Bearer {t}")))
            .await
    }

    /// Make a request with a raw `Authorization` header value.
    pub async fn request_with_auth(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        authorization: Option<String>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(value) = authorization {
            req = req.header("Authorization", value);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The `data` field of a success envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

/// A pending conversation analysis for `user_id`.
pub fn analysis_job(user_id: UserId) -> CreateJob {
    CreateJob {
        user_id,
        job_type: JobType::ConversationAnalysis,
        payload: AnalysisPayload {
            file_content: Some("A: hi\nB: hello".into()),
            file_name: Some("chat.txt".into()),
            template_id: None,
            model: Some("claude-sonnet".into()),
            provider: AnalysisProvider::Anthropic,
        },
        max_retries: 3,
    }
}
