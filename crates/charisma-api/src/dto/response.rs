//! Response DTOs.

use serde::{Deserialize, Serialize};

use charisma_realtime::connection::RegistrySnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Count of rows touched by a bulk operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// State of one dependency.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// `"up"` or `"down"`.
    pub status: &'static str,
    /// Backend in use, such as `"postgres"` or `"memory"`.
    pub provider: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    pub fn up(provider: &'static str, latency_ms: Option<u64>) -> Self {
        Self {
            status: "up",
            provider,
            latency_ms,
            error: None,
        }
    }

    pub fn down(provider: &'static str, error: impl Into<String>) -> Self {
        Self {
            status: "down",
            provider,
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Readiness response with per-dependency detail.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    /// `"ok"` when every dependency is up, otherwise `"degraded"`.
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: ComponentHealth,
    pub queue: ComponentHealth,
    pub cache: ComponentHealth,
    pub pubsub: ComponentHealth,
    pub streams: RegistrySnapshot,
}
