// OpenAI Responses API client

use eventsource_stream::{EventStreamError, Eventsource};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CompletionProvider, DeltaStream, ProviderError};
use crate::models::ProviderConfig;
use crate::sse::DONE_SENTINEL;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
pub struct ResponsesRequest<'a> {
    pub model: &'a str,
    pub instructions: &'a str,
    pub input: &'a str,
    pub stream: bool,
}

/// The subset of a streamed Responses API event that note generation needs
#[derive(Debug, Deserialize)]
pub struct ResponseEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub delta: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

impl ResponseEvent {
    /// Failure message carried by `error`, `response.failed` and `response.incomplete` events
    fn failure(&self) -> Option<String> {
        let response = self.response.as_ref();
        match self.kind.as_str() {
            "error" => Some(
                self.message
                    .clone()
                    .unwrap_or_else(|| "unknown provider error".to_string()),
            ),
            "response.failed" => Some(
                response
                    .and_then(|response| response["error"]["message"].as_str())
                    .unwrap_or("response failed")
                    .to_string(),
            ),
            "response.incomplete" => Some(format!(
                "response incomplete: {}",
                response
                    .and_then(|response| response["incomplete_details"]["reason"].as_str())
                    .unwrap_or("unknown reason")
            )),
            _ => None,
        }
    }
}

/// What one upstream SSE event means for the delta stream
#[derive(Debug)]
enum Step {
    Delta(String),
    Skip,
    Completed,
    Failed(ProviderError),
}

fn interpret(data: &str) -> Step {
    if data.is_empty() {
        return Step::Skip;
    }
    if data == DONE_SENTINEL {
        return Step::Completed;
    }

    let event = match serde_json::from_str::<ResponseEvent>(data) {
        Ok(event) => event,
        Err(e) => return Step::Failed(ProviderError::Stream(format!("malformed event: {e}"))),
    };
    if let Some(message) = event.failure() {
        return Step::Failed(ProviderError::Upstream(message));
    }
    if event.kind == "response.completed" {
        return Step::Completed;
    }
    match event.delta {
        Some(delta) if !delta.is_empty() => Step::Delta(delta),
        _ => Step::Skip,
    }
}

struct ReadState<S> {
    events: S,
    finished: bool,
}

impl OpenAiClient {
    pub fn new(config: &ProviderConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.ok_or(ProviderError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiClient {
    async fn stream_completion(
        &self,
        instructions: &str,
        input: &str,
    ) -> Result<DeltaStream, ProviderError> {
        let url = format!("{}/responses", self.base_url);
        let request = ResponsesRequest {
            model: &self.model,
            instructions,
            input,
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        tracing::debug!(model = %self.model, "Provider stream opened");

        let state = ReadState {
            events: Box::pin(response.bytes_stream().eventsource()),
            finished: false,
        };
        let deltas = stream::unfold(state, |mut state| async move {
            while !state.finished {
                let event = match state.events.next().await {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => {
                        state.finished = true;
                        let error = match e {
                            EventStreamError::Transport(e) => ProviderError::Http(e),
                            other => ProviderError::Stream(other.to_string()),
                        };
                        return Some((Err(error), state));
                    }
                    None => {
                        // Body ended without a completion event: the generation was cut off
                        state.finished = true;
                        let error = ProviderError::Stream(
                            "provider closed the stream before completing".to_string(),
                        );
                        return Some((Err(error), state));
                    }
                };

                match interpret(&event.data) {
                    Step::Delta(delta) => return Some((Ok(delta), state)),
                    Step::Skip => {}
                    Step::Completed => state.finished = true,
                    Step::Failed(error) => {
                        state.finished = true;
                        return Some((Err(error), state));
                    }
                }
            }
            None
        });

        Ok(Box::pin(deltas))
    }
}
