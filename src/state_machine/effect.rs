//! Effects produced by state transitions

use crate::conversation::{message_id, MessageRole, NewMessage};
use crate::staging::SelectedFile;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Stamp and append a message to the log
    AppendMessage(NewMessage),

    /// Remove a message by id
    RemoveMessage { id: String },

    /// Start a classify call (spawns as background task)
    RequestClassification {
        token: String,
        images: Vec<SelectedFile>,
    },

    /// Start a QA call (spawns as background task)
    RequestAnswer {
        token: String,
        question: String,
        label: Option<String>,
    },

    /// Clear the staging area and reset upload progress
    FinishSubmission,
}

impl Effect {
    pub fn append(message: NewMessage) -> Self {
        Effect::AppendMessage(message)
    }

    pub fn remove_processing(token: &str) -> Self {
        Effect::RemoveMessage {
            id: message_id(token, MessageRole::Processing),
        }
    }
}
