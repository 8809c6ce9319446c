//! Integration tests for the cron drain entry.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};

use charisma_core::result::AppResult;
use charisma_core::types::id::{JobId, UserId};
use charisma_database::JobStore;
use charisma_database::memory::MemoryJobStore;
use charisma_entity::job::{CreateJob, Job, JobStatus, JobStatusCounts};
use charisma_entity::user::UserRole;

use helpers::{CRON_SECRET, TestApp, analysis_job, test_config};

/// Counts every store call.
#[derive(Debug, Default)]
struct SpyJobStore {
    inner: MemoryJobStore,
    calls: AtomicUsize,
}

impl SpyJobStore {
    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for SpyJobStore {
    async fn health_check(&self) -> AppResult<()> {
        self.touch();
        self.inner.health_check().await
    }
    async fn create(&self, data: CreateJob) -> AppResult<Job> {
        self.touch();
        self.inner.create(data).await
    }
    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        self.touch();
        self.inner.find_by_id(id).await
    }
    async fn find_pending(&self, limit: usize) -> AppResult<Vec<Job>> {
        self.touch();
        self.inner.find_pending(limit).await
    }
    async fn find_stuck(&self, before: DateTime<Utc>) -> AppResult<Vec<Job>> {
        self.touch();
        self.inner.find_stuck(before).await
    }
    async fn mark_queued(&self, id: JobId) -> AppResult<bool> {
        self.touch();
        self.inner.mark_queued(id).await
    }
    async fn mark_processing(&self, id: JobId) -> AppResult<Option<Job>> {
        self.touch();
        self.inner.mark_processing(id).await
    }
    async fn mark_completed(
        &self,
        id: JobId,
        result: serde_json::Value,
    ) -> AppResult<Option<Job>> {
        self.touch();
        self.inner.mark_completed(id, result).await
    }
    async fn mark_failed(&self, id: JobId, error: &str) -> AppResult<Option<Job>> {
        self.touch();
        self.inner.mark_failed(id, error).await
    }
    async fn requeue_for_retry(&self, id: JobId) -> AppResult<Option<Job>> {
        self.touch();
        self.inner.requeue_for_retry(id).await
    }
    async fn cancel(&self, id: JobId) -> AppResult<bool> {
        self.touch();
        self.inner.cancel(id).await
    }
    async fn count_by_status(&self) -> AppResult<JobStatusCounts> {
        self.touch();
        self.inner.count_by_status().await
    }
}

fn cron_header() -> Option<String> {
    Some(format!("Bearer {CRON_SECRET}"))
}

#[tokio::test]
async fn test_invalid_bearer_rejected_before_store_access() {
    let spy = Arc::new(SpyJobStore::default());
    let app = TestApp::with_job_store(spy.clone(), test_config());

    for auth in [
        None,
        Some("Bearer wrong-secret".to_string()),
        Some(CRON_SECRET.to_string()),
    ] {
        let response = app
            .request_with_auth("GET", "/api/cron/process-jobs", None, auth)
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["error"], "UNAUTHORIZED");
    }

    assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_three_pending_jobs_queued() {
    let (app, jobs) = TestApp::new().await;
    let user = UserId::new();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(jobs.create(analysis_job(user)).await.unwrap().id);
    }

    let response = app
        .request_with_auth("GET", "/api/cron/process-jobs", None, cron_header())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    let report = response.data();
    assert_eq!(report["processed"], 3);
    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r["status"] == "queued"));

    for id in ids {
        let job = jobs.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
    }
}

#[tokio::test]
async fn test_post_is_accepted() {
    let (app, _jobs) = TestApp::new().await;
    let response = app
        .request_with_auth("POST", "/api/cron/process-jobs", None, cron_header())
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["processed"], 0);
}

#[tokio::test]
async fn test_batch_limited_to_ten() {
    let (app, jobs) = TestApp::new().await;
    let user = UserId::new();
    for _ in 0..12 {
        jobs.create(analysis_job(user)).await.unwrap();
    }

    let first = app
        .request_with_auth("GET", "/api/cron/process-jobs", None, cron_header())
        .await;
    assert_eq!(first.data()["processed"], 10);
    assert_eq!(first.data()["results"].as_array().unwrap().len(), 10);

    let second = app
        .request_with_auth("GET", "/api/cron/process-jobs", None, cron_header())
        .await;
    assert_eq!(second.data()["processed"], 2);
}

#[tokio::test]
async fn test_unreachable_store_returns_503() {
    let (app, jobs) = TestApp::new().await;
    let job = jobs.create(analysis_job(UserId::new())).await.unwrap();
    jobs.set_available(false);

    let response = app
        .request_with_auth("GET", "/api/cron/process-jobs", None, cron_header())
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], "SERVICE_UNAVAILABLE");

    jobs.set_available(true);
    let job = jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
}

#[tokio::test]
async fn test_admin_stats_after_drain() {
    let (app, jobs) = TestApp::new().await;
    let user = UserId::new();
    for _ in 0..2 {
        jobs.create(analysis_job(user)).await.unwrap();
    }
    app.request_with_auth("GET", "/api/cron/process-jobs", None, cron_header())
        .await;

    let admin = app.token(UserId::new(), UserRole::Admin);
    let response = app
        .request("GET", "/api/admin/jobs/stats", None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["queue"]["pending"], 2);
    assert_eq!(response.data()["jobs"]["queued"], 2);

    let member = app.token(user, UserRole::User);
    let response = app
        .request("GET", "/api/admin/jobs/stats", None, Some(&member))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_job_lookup() {
    let (app, jobs) = TestApp::new().await;
    let job = jobs.create(analysis_job(UserId::new())).await.unwrap();
    let admin = app.token(UserId::new(), UserRole::Admin);

    let response = app
        .request("GET", &format!("/api/admin/jobs/{}", job.id), None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "pending");

    let response = app
        .request(
            "GET",
            &format!("/api/admin/jobs/{}", JobId::new()),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
