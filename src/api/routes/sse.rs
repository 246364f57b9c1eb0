//! Live event stream
//!
//! - GET /events - server-sent events carrying rendered table fragments
//!
//! Each connection gets its own broker subscription. The first frame is an
//! unnamed `connected` marker so clients can confirm the stream is up
//! before any change arrives. The subscription's drop handler unregisters
//! the client when the connection closes.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures_util::Stream;

use crate::api::state::AppState;

/// GET /events
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.broker.subscribe().await;
    tracing::debug!(subscriber_id = subscription.id(), "Event stream opened");

    let stream = async_stream::stream! {
        yield Ok(Event::default().data(serde_json::json!({"type": "connected"}).to_string()));

        while let Some(event) = subscription.recv().await {
            yield Ok(Event::default().event(event.event_type).data(event.payload));
        }

        tracing::debug!(subscriber_id = subscription.id(), "Event stream closed");
    };

    // No keep-alive frames: liveness is the transport's problem, and a dead
    // connection surfaces as the stream being dropped.
    Sse::new(stream)
}
