//! Mock implementations for testing
//!
//! These mocks enable session tests without real I/O.

use crate::conversation::Candidate;
use crate::gateway::{
    ClassificationError, Classifier, GatewayError, QaError, QuestionAnswerer, UploadProgress,
};
use crate::staging::SelectedFile;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Classifier
// ============================================================================

/// Mock classifier that returns queued results
pub struct MockClassifier {
    results: Mutex<VecDeque<Result<Vec<Candidate>, ClassificationError>>>,
    /// Names of the images in every call made
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful result
    pub fn queue_candidates(&self, candidates: Vec<Candidate>) {
        self.results.lock().unwrap().push_back(Ok(candidates));
    }

    /// Queue an error result
    pub fn queue_error(&self, error: GatewayError) {
        self.results.lock().unwrap().push_back(Err(error.into()));
    }

    pub fn recorded_calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, images: &[SelectedFile]) -> Result<Vec<Candidate>, ClassificationError> {
        self.calls
            .lock()
            .unwrap()
            .push(images.iter().map(|i| i.name.clone()).collect());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::transport("No mock result queued").into()))
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(
        &self,
        images: &[SelectedFile],
        progress: &UploadProgress,
    ) -> Result<Vec<Candidate>, ClassificationError> {
        let result = self.record(images);
        progress.report(1, 1);
        result
    }
}

// ============================================================================
// Mock Question Answerer
// ============================================================================

/// A recorded QA call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskCall {
    pub question: String,
    pub label: Option<String>,
}

/// Mock QA service that returns queued answers
pub struct MockAnswerer {
    answers: Mutex<VecDeque<Result<Option<String>, QaError>>>,
    pub calls: Mutex<Vec<AskCall>>,
}

impl MockAnswerer {
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_answer(&self, answer: Option<&str>) {
        self.answers
            .lock()
            .unwrap()
            .push_back(Ok(answer.map(ToString::to_string)));
    }

    pub fn queue_error(&self, error: GatewayError) {
        self.answers.lock().unwrap().push_back(Err(error.into()));
    }

    pub fn recorded_calls(&self) -> Vec<AskCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, question: &str, label: Option<&str>) -> Result<Option<String>, QaError> {
        self.calls.lock().unwrap().push(AskCall {
            question: question.to_string(),
            label: label.map(ToString::to_string),
        });
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::transport("No mock answer queued").into()))
    }
}

impl Default for MockAnswerer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuestionAnswerer for MockAnswerer {
    async fn ask(&self, question: &str, label: Option<&str>) -> Result<Option<String>, QaError> {
        self.record(question, label)
    }
}

// ============================================================================
// Gated mocks (for mid-flight testing)
// ============================================================================

/// Classifier that holds every call until `release` is notified
pub struct GatedClassifier {
    pub inner: MockClassifier,
    /// Notified when a call starts
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedClassifier {
    pub fn new() -> Self {
        Self {
            inner: MockClassifier::new(),
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl Classifier for GatedClassifier {
    async fn classify(
        &self,
        images: &[SelectedFile],
        progress: &UploadProgress,
    ) -> Result<Vec<Candidate>, ClassificationError> {
        let result = self.inner.record(images);
        progress.report(1, 2);
        self.started.notify_one();
        self.release.notified().await;
        progress.report(2, 2);
        result
    }
}

/// QA service that holds every call until `release` is notified
pub struct GatedAnswerer {
    pub inner: MockAnswerer,
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedAnswerer {
    pub fn new() -> Self {
        Self {
            inner: MockAnswerer::new(),
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl QuestionAnswerer for GatedAnswerer {
    async fn ask(&self, question: &str, label: Option<&str>) -> Result<Option<String>, QaError> {
        let result = self.inner.record(question, label);
        self.started.notify_one();
        self.release.notified().await;
        result
    }
}

pub fn jpeg(name: &str) -> SelectedFile {
    SelectedFile::new(name, "image/jpeg", vec![0xFFu8, 0xD8, 0xFF, 0xE0])
}

pub fn text_file(name: &str) -> SelectedFile {
    SelectedFile::new(name, "text/plain", b"notes".to_vec())
}

/// QA service whose every call panics
pub struct PanickingAnswerer;

#[async_trait]
impl QuestionAnswerer for PanickingAnswerer {
    async fn ask(&self, _question: &str, _label: Option<&str>) -> Result<Option<String>, QaError> {
        panic!("answer service crashed")
    }
}
