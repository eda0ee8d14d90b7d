// Relay consumer: posts a generation request and folds the SSE reply into note events

pub mod diffs;

pub use diffs::{DiffSource, HttpDiffSource};

use anyhow::{Context, Result};
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::events::AppEvent;
use crate::models::{NoteKey, NotesRequest};
use crate::notes::NoteEvent;
use crate::sse::{record_data, Frame, SseDecoder};

/// How a relay stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The terminal sentinel arrived
    Completed,
    /// An error record arrived, or the transport failed
    Failed(String),
    /// The connection closed before any terminal record
    Disconnected,
}

/// Read a relay byte stream to its end, handing each content fragment to `on_fragment`.
///
/// Records may span reads. A record with malformed JSON is skipped. Reading stops at the
/// first terminal record; anything after it is never looked at.
pub async fn drive<S, B, E>(mut bytes: S, mut on_fragment: impl FnMut(String)) -> StreamOutcome
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = bytes.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return StreamOutcome::Failed(format!("Stream error: {e}")),
        };

        for record in decoder.push(chunk.as_ref()) {
            let Some(data) = record_data(&record) else {
                continue;
            };
            match Frame::parse(&data) {
                Ok(Some(Frame::Content(text))) => on_fragment(text),
                Ok(Some(Frame::Error(message))) => return StreamOutcome::Failed(message),
                Ok(Some(Frame::Done)) => return StreamOutcome::Completed,
                Ok(None) => {}
                Err(e) => warn!("Skipping malformed SSE record: {e}"),
            }
        }
    }

    if decoder.pending() > 0 {
        debug!(bytes = decoder.pending(), "Discarding unterminated trailing record");
    }
    StreamOutcome::Disconnected
}

#[derive(Debug, Clone)]
pub struct NoteClient {
    base_url: String,
    client: Client,
}

impl NoteClient {
    pub fn new(base_url: &str, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Generate notes for one diff, reporting every change on `tx`.
    ///
    /// The caller has already announced the generation with [`NoteEvent::Requested`].
    /// Exactly one of `Finished` or `Failed` is sent when this returns.
    pub async fn generate(
        &self,
        key: NoteKey,
        generation: u64,
        diff: &str,
        tx: &UnboundedSender<AppEvent>,
    ) {
        let send = |event: NoteEvent| {
            // The UI may already be gone; nothing left to notify then
            let _ = tx.send(AppEvent::Note(event));
        };

        let outcome = match self.open(&NotesRequest::for_diff(diff, key.mode)).await {
            Ok(response) => {
                drive(Box::pin(response.bytes_stream()), |text| {
                    send(NoteEvent::Fragment {
                        key: key.clone(),
                        generation,
                        text,
                    });
                })
                .await
            }
            Err(e) => StreamOutcome::Failed(format!("{e:#}")),
        };

        debug!(diff_id = %key.diff_id, mode = key.mode.label(), ?outcome, "Note stream ended");

        match outcome {
            StreamOutcome::Completed => send(NoteEvent::Finished { key, generation }),
            StreamOutcome::Failed(reason) => send(NoteEvent::Failed {
                key,
                generation,
                reason,
            }),
            StreamOutcome::Disconnected => send(NoteEvent::Failed {
                key,
                generation,
                reason: "Connection closed before the notes were complete".to_string(),
            }),
        }
    }

    async fn open(&self, request: &NotesRequest) -> Result<reqwest::Response> {
        let url = format!("{}/api/notes", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send note request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("API error {status}: {text}");
        }

        Ok(response)
    }
}
