//! Mock provider implementation for tests and credential-less development.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{EncodedImage, ImageProvider, InlineImage, ProviderError};
use crate::services::aspect::AspectRatio;

/// A recorded `generate` call, for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub image_sizes: Vec<usize>,
    pub prompt: String,
    pub aspect_ratio: String,
}

/// Mock image provider returning a fixed list of inline parts.
///
/// Records the last request it saw so tests can assert what would have been
/// sent upstream.
pub struct MockImageProvider {
    parts: Vec<InlineImage>,
    last_request: Mutex<Option<RecordedRequest>>,
}

impl MockImageProvider {
    pub fn new(parts: Vec<InlineImage>) -> Self {
        Self {
            parts,
            last_request: Mutex::new(None),
        }
    }

    /// The most recent request seen by this provider.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate(
        &self,
        images: &[EncodedImage],
        prompt: &str,
        aspect_ratio: &AspectRatio,
    ) -> Result<Vec<InlineImage>, ProviderError> {
        *self.last_request.lock().unwrap() = Some(RecordedRequest {
            image_sizes: images.iter().map(|img| img.data.len()).collect(),
            prompt: prompt.to_string(),
            aspect_ratio: aspect_ratio.as_str().to_string(),
        });

        Ok(self.parts.clone())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
