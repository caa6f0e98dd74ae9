//! HTTP implementation of both gateways

use super::progress::{ByteTracker, UploadProgress};
use super::{ClassificationError, Classifier, GatewayError, QaError, QuestionAnswerer};
use crate::config::ClientConfig;
use crate::conversation::Candidate;
use crate::staging::SelectedFile;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const CLASSIFY_PATH: &str = "/api/classify";
const QA_PATH: &str = "/api/qa";
/// Every image goes in a part with this (repeated) name
const FILES_FIELD: &str = "files";

/// Body of a 2xx `/api/classify` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifyResponse {
    #[serde(default)]
    pub results: Option<Vec<Candidate>>,
}

impl ClassifyResponse {
    /// Candidates in response order, confidences clamped to `[0, 1]`
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.results
            .unwrap_or_default()
            .into_iter()
            .map(|c| Candidate::new(c.label, c.confidence))
            .collect()
    }
}

/// Body of a `/api/qa` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Body of a 2xx `/api/qa` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaResponse {
    #[serde(default)]
    pub answer: Option<String>,
}

/// Talks to the plant backend over HTTP
pub struct HttpGateway {
    client: Client,
    classify_url: String,
    qa_url: String,
    chunk_size: usize,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            classify_url: config.endpoint(CLASSIFY_PATH),
            qa_url: config.endpoint(QA_PATH),
            chunk_size: config.upload_chunk_size.max(1),
        })
    }

    fn image_part(&self, image: &SelectedFile, tracker: ByteTracker) -> Result<Part, GatewayError> {
        let data = Arc::clone(&image.data);
        let len = data.len();
        let chunk_size = self.chunk_size;

        // Progress advances as the transport pulls each chunk
        let chunks = futures::stream::iter((0..len).step_by(chunk_size)).map(move |start| {
            let end = start.saturating_add(chunk_size).min(data.len());
            let chunk = data[start..end].to_vec();
            tracker.advance(chunk.len());
            Ok::<_, std::io::Error>(chunk)
        });

        Part::stream_with_length(Body::wrap_stream(chunks), byte_len(len))
            .file_name(image.name.clone())
            .mime_str(&image.media_type)
            .map_err(|e| {
                GatewayError::transport(format!("Invalid media type {}: {e}", image.media_type))
            })
    }
}

fn byte_len(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

#[async_trait]
impl Classifier for HttpGateway {
    async fn classify(
        &self,
        images: &[SelectedFile],
        progress: &UploadProgress,
    ) -> Result<Vec<Candidate>, ClassificationError> {
        let total: u64 = images.iter().map(|i| byte_len(i.data.len())).sum();
        let tracker = progress.tracker(total);

        let mut form = Form::new();
        for image in images {
            form = form.part(FILES_FIELD, self.image_part(image, tracker.clone())?);
        }

        tracing::debug!(
            url = %self.classify_url,
            images = images.len(),
            bytes = total,
            "Uploading images for classification"
        );

        let response = self
            .client
            .post(&self.classify_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(&e))?;
        progress.report(total, total);

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::status(
                status.as_u16(),
                format!("Lỗi phân loại hình ảnh (HTTP {})", status.as_u16()),
            )
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::transport(format!("Failed to read response: {e}")))?;
        let parsed: ClassifyResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::decode(format!("Failed to parse response: {e}")))?;

        Ok(parsed.into_candidates())
    }
}

#[async_trait]
impl QuestionAnswerer for HttpGateway {
    async fn ask(&self, question: &str, label: Option<&str>) -> Result<Option<String>, QaError> {
        let request = QaRequest {
            question: question.to_string(),
            label: label.map(str::to_string),
        };

        let response = self
            .client
            .post(&self.qa_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::status(
                status.as_u16(),
                format!("Lỗi xử lý câu hỏi (HTTP {})", status.as_u16()),
            )
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::transport(format!("Failed to read response: {e}")))?;
        let parsed: QaResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::decode(format!("Failed to parse response: {e}")))?;

        Ok(parsed.answer)
    }
}
