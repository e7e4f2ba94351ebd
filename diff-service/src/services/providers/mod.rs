//! Text-generation provider abstractions and implementations.
//!
//! Handlers depend on the [`TextProvider`] trait only, so the Gemini backend
//! can be swapped for the scripted mock in tests and local runs.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

/// Prompt used by dependency-probing health checks.
pub const HEALTH_PROBE_PROMPT: &str = "test";

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(_) => AppError::Configuration(anyhow::Error::new(err)),
            other => AppError::Dependency(anyhow::Error::new(other)),
        }
    }
}

/// Result of a completion call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Concatenated text of the first candidate.
    pub text: Option<String>,

    /// Input tokens consumed.
    pub input_tokens: i32,

    /// Output tokens generated.
    pub output_tokens: i32,

    /// Finish reason.
    pub finish_reason: FinishReason,
}

impl ProviderResponse {
    /// The response text, or [`ProviderError::EmptyResponse`] when there is none.
    pub fn into_text(self) -> Result<String, ProviderError> {
        match self.text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ProviderError::EmptyResponse),
        }
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Error,
}

/// Trait for text/JSON generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Single-attempt completion of `prompt`.
    async fn generate(&self, prompt: &str) -> Result<ProviderResponse, ProviderError>;

    /// Issue a minimal completion to prove the model is reachable.
    async fn health_check(&self) -> Result<(), ProviderError> {
        self.generate(HEALTH_PROBE_PROMPT).await.map(|_| ())
    }

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}
