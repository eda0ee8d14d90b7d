// Upstream text-generation providers

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No API key configured for the provider")]
    MissingApiKey,
    #[error("Failed to reach the provider: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Provider reported an error: {0}")]
    Upstream(String),
    #[error("Provider stream error: {0}")]
    Stream(String),
}

/// Incremental text deltas, in generation order
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// A streaming text-generation backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open a streaming generation for `input` under the given system instructions
    async fn stream_completion(
        &self,
        instructions: &str,
        input: &str,
    ) -> Result<DeltaStream, ProviderError>;
}
