//! Conversation entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const REPRESENTATIVE_IMAGE_DIR: &str = "/representative_images";
const PLACEHOLDER_IMAGE: &str = "/placeholder.png";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A species guess returned by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    /// Score in `[0, 1]`
    pub confidence: f64,
}

impl Candidate {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: if confidence.is_nan() {
                0.0
            } else {
                confidence.clamp(0.0, 1.0)
            },
        }
    }

    /// Confidence as a percentage with one decimal, e.g. `92.0%`
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }

    /// Path of the reference photo the frontend shows next to this candidate
    pub fn representative_image_path(&self) -> String {
        representative_image_path(&self.label)
    }
}

/// Map a species label to its reference photo path.
///
/// Whitespace runs become a single `_`; an empty label maps to the placeholder.
fn representative_image_path(label: &str) -> String {
    if label.trim().is_empty() {
        return PLACEHOLDER_IMAGE.to_string();
    }
    let safe_label = label.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{REPRESENTATIVE_IMAGE_DIR}/{safe_label}.jpg")
}

/// Reference to an image that was sent as part of a user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub name: String,
    pub media_type: String,
    pub byte_len: usize,
}

/// Message content, keyed by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum MessagePayload {
    Text(String),
    ImageSet(Vec<ImageRef>),
    ClassificationResults(Vec<Candidate>),
    SelectionConfirmation { label: String },
}

impl MessagePayload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePayload::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Suffix appended to a correlation token to form a message id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    Text,
    Image,
    Processing,
    ClassificationResults,
    SelectionPrompt,
    NoResults,
    Error,
    Answer,
    Selection,
    SelectionConfirmation,
    AskPrompt,
}

impl MessageRole {
    pub fn suffix(self) -> &'static str {
        match self {
            MessageRole::Text => "text",
            MessageRole::Image => "image",
            MessageRole::Processing => "processing",
            MessageRole::ClassificationResults => "classification_results",
            MessageRole::SelectionPrompt => "selection_prompt",
            MessageRole::NoResults => "no_results",
            MessageRole::Error => "error",
            MessageRole::Answer => "answer",
            MessageRole::Selection => "selection",
            MessageRole::SelectionConfirmation => "selection_confirmation",
            MessageRole::AskPrompt => "ask_prompt",
        }
    }
}

/// Build the id of the message playing `role` within the request `token`
pub fn message_id(token: &str, role: MessageRole) -> String {
    format!("{token}_{}", role.suffix())
}

/// A message as stored in the log. Fields are fixed once stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    #[serde(flatten)]
    pub payload: MessagePayload,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_processing: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}


/// A message waiting to be stamped by the log
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub id: String,
    pub sender: Sender,
    pub payload: MessagePayload,
    pub is_processing: bool,
    pub is_error: bool,
}

impl NewMessage {
    fn new(id: String, sender: Sender, payload: MessagePayload) -> Self {
        Self {
            id,
            sender,
            payload,
            is_processing: false,
            is_error: false,
        }
    }

    pub fn user_text(token: &str, text: impl Into<String>) -> Self {
        Self::new(
            message_id(token, MessageRole::Text),
            Sender::User,
            MessagePayload::Text(text.into()),
        )
    }

    pub fn user_images(token: &str, images: Vec<ImageRef>) -> Self {
        Self::new(
            message_id(token, MessageRole::Image),
            Sender::User,
            MessagePayload::ImageSet(images),
        )
    }

    pub fn user_selection(token: &str, label: impl Into<String>) -> Self {
        Self::new(
            message_id(token, MessageRole::Selection),
            Sender::User,
            MessagePayload::SelectionConfirmation {
                label: label.into(),
            },
        )
    }

    pub fn bot_text(token: &str, role: MessageRole, text: impl Into<String>) -> Self {
        Self::new(
            message_id(token, role),
            Sender::Bot,
            MessagePayload::Text(text.into()),
        )
    }

    /// Bot text under a fixed id that is not tied to a request
    pub fn bot_text_with_id(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id.into(), Sender::Bot, MessagePayload::Text(text.into()))
    }

    /// Placeholder shown while a backend call for `token` is in flight
    pub fn processing(token: &str, text: impl Into<String>) -> Self {
        Self {
            is_processing: true,
            ..Self::bot_text(token, MessageRole::Processing, text)
        }
    }

    pub fn error(token: &str, text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::bot_text(token, MessageRole::Error, text)
        }
    }

    pub fn classification_results(token: &str, candidates: Vec<Candidate>) -> Self {
        Self::new(
            message_id(token, MessageRole::ClassificationResults),
            Sender::Bot,
            MessagePayload::ClassificationResults(candidates),
        )
    }

    pub(crate) fn stamp(self, timestamp: DateTime<Utc>) -> Message {
        Message {
            id: self.id,
            sender: self.sender,
            payload: self.payload,
            timestamp,
            is_processing: self.is_processing,
            is_error: self.is_error,
        }
    }
}
