//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE implementations for VaultIQ services.

use crate::events::NamedEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Heartbeat interval for SSE connections
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Forward events from a broadcast receiver to an SSE client
///
/// Each event is sent with its `event_type()` as the SSE event name and its
/// JSON serialization as data. Events matching `filter == false` are skipped.
/// A lagging receiver skips the dropped events and continues.
pub fn broadcast_sse_stream<E, F>(
    service_name: &'static str,
    mut rx: broadcast::Receiver<E>,
    filter: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    E: NamedEvent + Serialize,
    F: Fn(&E) -> bool + Send + 'static,
{
    info!("New SSE client connected to {} events", service_name);

    let stream = async_stream::stream! {
        // Send initial connected status
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !filter(&event) {
                        continue;
                    }
                    let event_type = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            debug!("SSE: Broadcasting {} event: {}", service_name, event_type);
                            yield Ok(Event::default().event(event_type).data(json));
                        }
                        Err(e) => {
                            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("SSE: {} client lagged, skipped {} events", service_name, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("SSE: {} event channel closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
