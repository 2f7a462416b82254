//! Server-Sent Events for vault workflow progress

use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use uuid::Uuid;
use viq_common::sse::broadcast_sse_stream;

use crate::AppState;

/// GET /vaults/events query
#[derive(Debug, Deserialize)]
pub struct EventStreamQuery {
    /// Only stream events of this session
    pub session_id: Option<Uuid>,
}

/// GET /vaults/events - SSE stream of workflow events
///
/// Streams stage changes plus verification and mint progress for every
/// session, or for one session when `session_id` is given.
pub async fn vault_event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_bus.subscribe();
    broadcast_sse_stream("viq-vault", rx, move |event| {
        query
            .session_id
            .map_or(true, |id| event.session_id() == id)
    })
}
