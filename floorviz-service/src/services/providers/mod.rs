//! Generative-image provider abstractions and implementations.
//!
//! The provider contract mirrors the upstream wire shape: ordered content
//! parts (images then an instruction) go in, inline image parts come out.
//! Implementations: Gemini (live) and a mock used by tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::services::aspect::AspectRatio;

/// Error type for provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// An image payload on its way to the model.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

/// An inline binary image part extracted from a model response.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

/// Trait for generative image providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Submit the images and instruction prompt, returning every inline
    /// image part of the first response candidate in order. Text parts are
    /// discarded.
    async fn generate(
        &self,
        images: &[EncodedImage],
        prompt: &str,
        aspect_ratio: &AspectRatio,
    ) -> Result<Vec<InlineImage>, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
