//! Server-sent event stream of notifications and job updates.

use std::convert::Infallible;

use axum::extract::State;
use axum::http::HeaderName;
use axum::response::IntoResponse;
use axum::response::sse::{Event, Sse};
use futures::StreamExt;

use crate::error::ApiResult;
use crate::extractors::StreamAuth;
use crate::state::AppState;

/// Disables proxy buffering so events are flushed as written.
static X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// GET /api/notifications/stream
///
/// The first event is `connected`; a `heartbeat` follows every interval.
/// Closing the connection drops the session, which stops the relay.
pub async fn stream(
    State(state): State<AppState>,
    StreamAuth(auth): StreamAuth,
) -> ApiResult<impl IntoResponse> {
    let session = state.streams.open(auth.user_id).await?;

    let events = session.filter_map(|event| async move {
        match Event::default().event(event.name()).json_data(&event) {
            Ok(sse) => Some(Ok::<_, Infallible>(sse)),
            Err(e) => {
                tracing::warn!(event = event.name(), error = %e, "Failed to encode stream event");
                None
            }
        }
    });

    Ok(([(X_ACCEL_BUFFERING.clone(), "no")], Sse::new(events)))
}
