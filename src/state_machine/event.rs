//! Events that can occur in a session

use crate::conversation::Candidate;
use crate::staging::SelectedFile;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        token: String,
        text: String,
        images: Vec<SelectedFile>,
    },
    SelectSpecies {
        token: String,
        label: String,
    },
    DismissSelection,
    DismissError,
    AttachmentRejected {
        message: String,
    },

    // Classification gateway events
    ClassificationSucceeded {
        token: String,
        candidates: Vec<Candidate>,
    },
    ClassificationFailed {
        token: String,
        message: String,
    },

    // QA gateway events
    AnswerReceived {
        token: String,
        answer: Option<String>,
    },
    AnswerFailed {
        token: String,
        message: String,
    },
}
