//! Backend gateways
//!
//! Two request/response services sit behind the orchestrator: the image
//! classifier and the question-answering service. Both are traits so the
//! runtime can be driven by mocks in tests.

mod error;
mod http;
mod progress;

pub use error::{ClassificationError, GatewayError, GatewayErrorKind, QaError};
pub use http::HttpGateway;
pub use progress::UploadProgress;

use crate::conversation::Candidate;
use crate::staging::SelectedFile;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Classify-images backend
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `images` (non-empty), reporting upload progress on `progress`.
    ///
    /// Candidates are returned in the order the backend produced them.
    async fn classify(
        &self,
        images: &[SelectedFile],
        progress: &UploadProgress,
    ) -> Result<Vec<Candidate>, ClassificationError>;
}

/// Question-answering backend
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    /// Ask `question`, optionally scoped to one species `label`.
    ///
    /// `Ok(None)` means the backend answered without an answer.
    async fn ask(&self, question: &str, label: Option<&str>) -> Result<Option<String>, QaError>;
}

#[async_trait]
impl<T: Classifier + ?Sized> Classifier for Arc<T> {
    async fn classify(
        &self,
        images: &[SelectedFile],
        progress: &UploadProgress,
    ) -> Result<Vec<Candidate>, ClassificationError> {
        (**self).classify(images, progress).await
    }
}

#[async_trait]
impl<T: QuestionAnswerer + ?Sized> QuestionAnswerer for Arc<T> {
    async fn ask(&self, question: &str, label: Option<&str>) -> Result<Option<String>, QaError> {
        (**self).ask(question, label).await
    }
}

/// Logging wrapper for gateways
pub struct Logged<G> {
    inner: G,
}

impl<G> Logged<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: Classifier> Classifier for Logged<G> {
    async fn classify(
        &self,
        images: &[SelectedFile],
        progress: &UploadProgress,
    ) -> Result<Vec<Candidate>, ClassificationError> {
        let start = Instant::now();
        let result = self.inner.classify(images, progress).await;
        let duration = start.elapsed();

        match &result {
            Ok(candidates) => {
                tracing::info!(
                    images = images.len(),
                    candidates = candidates.len(),
                    duration_ms = %duration.as_millis(),
                    "Classification completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    images = images.len(),
                    duration_ms = %duration.as_millis(),
                    error = %e,
                    "Classification failed"
                );
            }
        }

        result
    }
}

#[async_trait]
impl<G: QuestionAnswerer> QuestionAnswerer for Logged<G> {
    async fn ask(&self, question: &str, label: Option<&str>) -> Result<Option<String>, QaError> {
        let start = Instant::now();
        let result = self.inner.ask(question, label).await;
        let duration = start.elapsed();

        match &result {
            Ok(answer) => {
                tracing::info!(
                    label = ?label,
                    answered = answer.is_some(),
                    duration_ms = %duration.as_millis(),
                    "Question answered"
                );
            }
            Err(e) => {
                tracing::error!(
                    label = ?label,
                    duration_ms = %duration.as_millis(),
                    error = %e,
                    "Question failed"
                );
            }
        }

        result
    }
}
