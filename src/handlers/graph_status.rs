// Graph status stream endpoint

use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use crate::handlers::AppState;

const EVENT_BUFFER: usize = 16;

/// Handler for GET /api/graph-status-stream
/// Runs the status pipeline and streams its events as SSE
pub async fn graph_status_stream(State(state): State<AppState>) -> impl IntoResponse {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        // Dropping the response drops `rx`, which ends the run at its next event
        state.status.run(&state.sources, &tx).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| Event::default().json_data(event));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(stream),
    )
}
