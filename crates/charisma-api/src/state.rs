//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use charisma_auth::cron::CronSecretVerifier;
use charisma_auth::jwt::decoder::JwtDecoder;
use charisma_cache::{CacheBackends, CacheManager, PubSub};
use charisma_core::config::AppConfig;
use charisma_database::Stores;
use charisma_realtime::connection::StreamHub;
use charisma_realtime::notification::NotificationFanout;
use charisma_realtime::publisher::EventPublisher;
use charisma_worker::{CronDrainer, QueueAdapter};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    pub config: Arc<AppConfig>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,

    // ── Infrastructure ───────────────────────────────────────
    pub stores: Stores,
    pub cache: CacheManager,
    pub pubsub: Arc<dyn PubSub>,

    // ── Auth ─────────────────────────────────────────────────
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Guards the cron drain entry.
    pub cron_verifier: Arc<CronSecretVerifier>,

    // ── Services ─────────────────────────────────────────────
    pub queue: QueueAdapter,
    pub drainer: Arc<CronDrainer>,
    pub notifications: NotificationFanout,
    pub streams: StreamHub,
}

impl AppState {
    /// Wire services over already-connected backends.
    pub fn new(config: AppConfig, stores: Stores, backends: CacheBackends) -> Self {
        let publisher = EventPublisher::new(backends.pubsub.clone());
        let notifications = NotificationFanout::new(
            stores.notifications.clone(),
            publisher.clone(),
            backends.cache.clone(),
        );
        let queue = QueueAdapter::new(
            stores.jobs.clone(),
            backends.queue.clone(),
            publisher,
            &config.queue,
        )
        .with_notifications(notifications.clone());
        let drainer = Arc::new(CronDrainer::new(queue.clone(), &config.queue));
        let streams = StreamHub::new(backends.pubsub.clone(), &config.realtime);

        Self {
            jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
            cron_verifier: Arc::new(CronSecretVerifier::new(&config.cron.secret)),
            started_at: Instant::now(),
            stores,
            cache: backends.cache,
            pubsub: backends.pubsub,
            queue,
            drainer,
            notifications,
            streams,
            config: Arc::new(config),
        }
    }
}
