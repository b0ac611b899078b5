//! Axum handler for the live log stream.

use std::convert::Infallible;

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::state::AppState;

use super::LogHub;

/// Emits the disconnect notice when the SSE stream is dropped by the
/// transport. The server never closes the stream from its side.
struct Disconnect {
    hub: LogHub,
}

impl Drop for Disconnect {
    fn drop(&mut self) {
        self.hub.broadcast("🔴 Frontend disconnected");
    }
}

/// GET /api/logs
///
/// Long-lived SSE stream of pipeline log lines (`data: <line>\n\n` frames).
/// Registers a subscriber on connect and deregisters it when the connection
/// closes. Lines emitted before the connection was established are not
/// replayed.
pub async fn logs_handler(State(state): State<AppState>) -> impl IntoResponse {
    let rx = state.hub.register();
    state.hub.broadcast("🟢 Frontend connected to logs");
    tracing::debug!("log subscribers: {}", state.hub.subscriber_count());

    let disconnect = Disconnect {
        hub: state.hub.clone(),
    };
    let stream = BroadcastStream::new(rx).filter_map(move |item| {
        // Captured so the notice fires exactly when the stream is dropped.
        let _connected = &disconnect;
        match item {
            Ok(line) => Some(Ok::<_, Infallible>(Event::default().data(line))),
            // This subscriber lagged and lost lines; delivery is best-effort.
            Err(_) => None,
        }
    });

    let sse = Sse::new(stream).keep_alive(KeepAlive::default());
    ([(header::CACHE_CONTROL, "no-cache")], sse)
}
