//! Session state types

use crate::conversation::Candidate;
use serde::Serialize;

/// Where an answer request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    /// Text-only submission; completes the submission
    Submission,
    /// A species pick that consumed the pending question
    Selection,
}

/// Orchestrator phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Phase {
    /// Ready for user input, no pending backend call
    #[default]
    Idle,

    /// Classify call in flight
    Classifying { token: String, image_count: usize },

    /// Candidates shown, selection surface open
    AwaitingSelection { token: String },

    /// QA call in flight
    Answering {
        token: String,
        label: Option<String>,
        origin: AnswerOrigin,
    },
}

impl Phase {
    /// A backend call is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Classifying { .. } | Phase::Answering { .. })
    }

    /// Correlation token of the outstanding call
    pub fn in_flight_token(&self) -> Option<&str> {
        match self {
            Phase::Classifying { token, .. } | Phase::Answering { token, .. } => Some(token),
            Phase::Idle | Phase::AwaitingSelection { .. } => None,
        }
    }
}

/// Everything the orchestrator remembers about one session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub phase: Phase,
    /// Sticky species label reused by direct questions
    pub selected_species: Option<String>,
    /// Question attached to images, answered once a species is picked
    pub pending_question: Option<String>,
    /// Last classification result set
    pub candidates: Vec<Candidate>,
    /// Dismissible notice for the most recent error
    pub error_notice: Option<String>,
}

impl SessionState {
    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn is_selection_open(&self) -> bool {
        matches!(self.phase, Phase::AwaitingSelection { .. })
    }
}
