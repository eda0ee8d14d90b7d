// Note generation relay: one upstream generation per request, one SSE record per delta

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::RelayState;
use crate::api::{CompletionProvider, DeltaStream};
use crate::models::NotesRequest;
use crate::prompts;
use crate::sse::Frame;

/// Failures that happen before the event stream exists
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid request body: {0}")]
    InvalidRequest(#[from] serde_json::Error),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

enum Phase {
    Connect {
        provider: Arc<dyn CompletionProvider>,
        instructions: String,
        input: String,
    },
    Streaming {
        deltas: DeltaStream,
        sent: usize,
    },
    Finished,
}

/// Handler for `POST /api/notes`
pub async fn generate_notes(
    State(state): State<RelayState>,
    body: Bytes,
) -> Result<impl IntoResponse, RelayError> {
    let request: NotesRequest = serde_json::from_slice(&body)?;
    let request_id = Uuid::new_v4();

    info!(
        %request_id,
        mode = request.mode.label(),
        prompt_bytes = request.prompt.len(),
        "Starting note generation"
    );

    let frames = relay_frames(
        Arc::clone(&state.provider),
        prompts::instructions_for(request.mode),
        request.prompt,
        state.idle_timeout,
        request_id,
    );

    let headers = [
        (header::CACHE_CONTROL, "no-cache, no-transform"),
        (header::CONNECTION, "keep-alive"),
    ];
    Ok((headers, Sse::new(frames).keep_alive(KeepAlive::default())))
}

/// The SSE events for one generation.
///
/// Dropping the stream (client went away) drops the upstream delta stream with it,
/// which releases the provider connection.
pub fn relay_frames(
    provider: Arc<dyn CompletionProvider>,
    instructions: String,
    input: String,
    idle: Duration,
    request_id: Uuid,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    let start = Phase::Connect {
        provider,
        instructions,
        input,
    };

    stream::unfold(start, move |phase| async move {
        let (frame, next) = match phase {
            Phase::Connect {
                provider,
                instructions,
                input,
            } => match timeout(idle, provider.stream_completion(&instructions, &input)).await {
                Ok(Ok(deltas)) => next_frame(deltas, 0, idle).await,
                Ok(Err(e)) => (Frame::Error(e.to_string()), Phase::Finished),
                Err(_) => (idle_error(idle), Phase::Finished),
            },
            Phase::Streaming { deltas, sent } => next_frame(deltas, sent, idle).await,
            Phase::Finished => return None,
        };

        match &frame {
            Frame::Content(_) => {}
            Frame::Done => info!(%request_id, "Note generation complete"),
            Frame::Error(message) => warn!(%request_id, error = %message, "Note generation failed"),
        }

        Some((Ok(Event::default().data(frame.data())), next))
    })
}

async fn next_frame(mut deltas: DeltaStream, sent: usize, idle: Duration) -> (Frame, Phase) {
    loop {
        match timeout(idle, deltas.next()).await {
            Ok(Some(Ok(delta))) if delta.is_empty() => {}
            Ok(Some(Ok(delta))) => {
                let sent = sent + 1;
                debug!(fragment = sent, bytes = delta.len(), "Relaying delta");
                return (Frame::Content(delta), Phase::Streaming { deltas, sent });
            }
            Ok(Some(Err(e))) => return (Frame::Error(e.to_string()), Phase::Finished),
            Ok(None) => return (Frame::Done, Phase::Finished),
            Err(_) => return (idle_error(idle), Phase::Finished),
        }
    }
}

fn idle_error(idle: Duration) -> Frame {
    Frame::Error(format!(
        "Provider sent nothing for {} seconds",
        idle.as_secs()
    ))
}
