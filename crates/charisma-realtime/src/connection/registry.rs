//! Registry of open stream sessions, indexed by session and by user.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use charisma_core::types::id::UserId;

/// Per-session counters, shared between the relay task and observers.
#[derive(Debug, Default)]
pub struct SessionStats {
    heartbeats: AtomicU64,
    relayed: AtomicU64,
}

impl SessionStats {
    pub(crate) fn record_heartbeat(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_relayed(&self) {
        self.relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Heartbeats written to the client.
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Relaxed)
    }

    /// Bus events written to the client.
    pub fn relayed(&self) -> u64 {
        self.relayed.load(Ordering::Relaxed)
    }
}

/// One open session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: Uuid,
    pub user_id: UserId,
    pub opened_at: DateTime<Utc>,
    pub stats: Arc<SessionStats>,
}

/// Aggregate view for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub open_sessions: usize,
    pub connected_users: usize,
}

/// Thread-safe registry of open sessions.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    by_id: DashMap<Uuid, SessionInfo>,
    /// User ID → session IDs (one user can have several tabs open).
    by_user: DashMap<UserId, Vec<Uuid>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened session.
    pub fn register(&self, info: SessionInfo) {
        self.by_user.entry(info.user_id).or_default().push(info.id);
        self.by_id.insert(info.id, info);
    }

    /// Forget a session.
    pub fn remove(&self, session_id: Uuid) -> Option<SessionInfo> {
        let (_, info) = self.by_id.remove(&session_id)?;
        if let Some(mut sessions) = self.by_user.get_mut(&info.user_id) {
            sessions.retain(|id| *id != session_id);
            if sessions.is_empty() {
                drop(sessions);
                self.by_user.remove_if(&info.user_id, |_, ids| ids.is_empty());
            }
        }
        Some(info)
    }

    pub fn get(&self, session_id: Uuid) -> Option<SessionInfo> {
        self.by_id.get(&session_id).map(|entry| entry.value().clone())
    }

    /// Open sessions across all users.
    pub fn total(&self) -> usize {
        self.by_id.len()
    }

    /// Open sessions owned by `user_id`.
    pub fn count_for_user(&self, user_id: UserId) -> usize {
        self.by_user.get(&user_id).map_or(0, |ids| ids.len())
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            open_sessions: self.by_id.len(),
            connected_users: self.by_user.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(user_id: UserId) -> SessionInfo {
        SessionInfo {
            id: Uuid::new_v4(),
            user_id,
            opened_at: Utc::now(),
            stats: Arc::new(SessionStats::default()),
        }
    }

    #[test]
    fn test_counts_per_user() {
        let registry = StreamRegistry::new();
        let (a, b) = (UserId::new(), UserId::new());
        let first = info(a);
        let first_id = first.id;
        registry.register(first);
        registry.register(info(a));
        registry.register(info(b));

        assert_eq!(registry.total(), 3);
        assert_eq!(registry.count_for_user(a), 2);
        assert_eq!(
            registry.snapshot(),
            RegistrySnapshot {
                open_sessions: 3,
                connected_users: 2
            }
        );

        assert!(registry.remove(first_id).is_some());
        assert!(registry.remove(first_id).is_none());
        assert_eq!(registry.count_for_user(a), 1);
    }

    #[test]
    fn test_last_session_removes_user() {
        let registry = StreamRegistry::new();
        let user = UserId::new();
        let session = info(user);
        let id = session.id;
        registry.register(session);
        registry.remove(id);
        assert_eq!(registry.count_for_user(user), 0);
        assert_eq!(registry.snapshot().connected_users, 0);
    }
}
