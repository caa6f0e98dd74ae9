//! Pure state transition function
//!
//! Given the same state and event this always produces the same new state
//! and effects. Clocks, ids and I/O belong to the runtime.

use super::state::AnswerOrigin;
use super::{Effect, Event, Phase, SessionState};
use crate::conversation::{Candidate, MessageRole, NewMessage};
use crate::phrases;
use crate::staging::SelectedFile;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A request is in progress")]
    Busy,
    #[error("Nothing to send")]
    EmptySubmission,
    #[error("Species label is empty")]
    EmptyLabel,
    #[error("Unexpected event: {0}")]
    UnexpectedEvent(String),
}

/// Pure transition function
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (&state.phase, event) {
        // ============================================================
        // User events
        // ============================================================

        // Busy states reject new work
        (
            Phase::Classifying { .. } | Phase::Answering { .. },
            Event::UserSubmit { .. } | Event::SelectSpecies { .. },
        ) => Err(TransitionError::Busy),

        (_, Event::UserSubmit { token, text, images }) => submit(state, &token, &text, images),

        (_, Event::SelectSpecies { token, label }) => select_species(state, &token, &label),

        (Phase::AwaitingSelection { .. }, Event::DismissSelection) => {
            let mut next = state.clone();
            next.phase = Phase::Idle;
            Ok(TransitionResult::new(next))
        }

        // Nothing open to close
        (_, Event::DismissSelection) => Ok(TransitionResult::new(state.clone())),

        (_, Event::DismissError) => {
            let mut next = state.clone();
            next.error_notice = None;
            Ok(TransitionResult::new(next))
        }

        (_, Event::AttachmentRejected { message }) => {
            let mut next = state.clone();
            next.error_notice = Some(message);
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Classification results
        // ============================================================
        (
            Phase::Classifying { token: current, .. },
            Event::ClassificationSucceeded { token, candidates },
        ) if *current == token => Ok(classified(state, &token, candidates)),

        (Phase::Classifying { token: current, .. }, Event::ClassificationFailed { token, message })
            if *current == token =>
        {
            Ok(classification_failed(state, &token, &message))
        }

        // ============================================================
        // QA results
        // ============================================================
        (
            Phase::Answering {
                token: current,
                origin,
                ..
            },
            Event::AnswerReceived { token, answer },
        ) if *current == token => Ok(answered(state, &token, *origin, answer)),

        (
            Phase::Answering {
                token: current,
                origin,
                ..
            },
            Event::AnswerFailed { token, message },
        ) if *current == token => Ok(answer_failed(state, &token, *origin, &message)),

        // Results for a call that is not in flight
        (phase, event) => Err(TransitionError::UnexpectedEvent(format!(
            "{event:?} in phase {phase:?}"
        ))),
    }
}

fn submit(
    state: &SessionState,
    token: &str,
    text: &str,
    images: Vec<SelectedFile>,
) -> Result<TransitionResult, TransitionError> {
    let question = text.trim();
    if question.is_empty() && images.is_empty() {
        return Err(TransitionError::EmptySubmission);
    }

    let mut next = state.clone();
    next.error_notice = None;

    // Text strictly before its images
    let mut effects = Vec::new();
    if !question.is_empty() {
        effects.push(Effect::append(NewMessage::user_text(token, question)));
    }
    if !images.is_empty() {
        let refs = images.iter().map(SelectedFile::to_image_ref).collect();
        effects.push(Effect::append(NewMessage::user_images(token, refs)));
    }

    if images.is_empty() {
        let label = state.selected_species.clone();
        next.phase = Phase::Answering {
            token: token.to_string(),
            label: label.clone(),
            origin: AnswerOrigin::Submission,
        };
        effects.push(Effect::append(NewMessage::processing(
            token,
            phrases::ANSWERING_DIRECT,
        )));
        effects.push(Effect::RequestAnswer {
            token: token.to_string(),
            question: question.to_string(),
            label,
        });
    } else {
        // A new classification starts a fresh disambiguation
        next.pending_question = (!question.is_empty()).then(|| question.to_string());
        next.candidates.clear();
        next.phase = Phase::Classifying {
            token: token.to_string(),
            image_count: images.len(),
        };
        effects.push(Effect::append(NewMessage::processing(
            token,
            phrases::classifying(images.len()),
        )));
        effects.push(Effect::RequestClassification {
            token: token.to_string(),
            images,
        });
    }

    Ok(TransitionResult::new(next).with_effects(effects))
}

fn classified(state: &SessionState, token: &str, candidates: Vec<Candidate>) -> TransitionResult {
    let mut next = state.clone();

    if candidates.is_empty() {
        next.phase = Phase::Idle;
        next.pending_question = None;
        return TransitionResult::new(next)
            .with_effect(Effect::remove_processing(token))
            .with_effect(Effect::append(NewMessage::bot_text(
                token,
                MessageRole::NoResults,
                phrases::NO_MATCH,
            )))
            .with_effect(Effect::FinishSubmission);
    }

    let prompt = phrases::selection_prompt(state.pending_question.is_some());
    next.phase = Phase::AwaitingSelection {
        token: token.to_string(),
    };
    next.candidates.clone_from(&candidates);

    TransitionResult::new(next)
        .with_effect(Effect::remove_processing(token))
        .with_effect(Effect::append(NewMessage::classification_results(
            token, candidates,
        )))
        .with_effect(Effect::append(NewMessage::bot_text(
            token,
            MessageRole::SelectionPrompt,
            prompt,
        )))
        .with_effect(Effect::FinishSubmission)
}

fn classification_failed(state: &SessionState, token: &str, reason: &str) -> TransitionResult {
    let text = phrases::classification_failed(reason);
    let mut next = state.clone();
    next.phase = Phase::Idle;
    next.pending_question = None;
    next.error_notice = Some(text.clone());

    TransitionResult::new(next)
        .with_effect(Effect::remove_processing(token))
        .with_effect(Effect::append(NewMessage::error(token, text)))
        .with_effect(Effect::FinishSubmission)
}

fn select_species(
    state: &SessionState,
    token: &str,
    label: &str,
) -> Result<TransitionResult, TransitionError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(TransitionError::EmptyLabel);
    }

    let mut next = state.clone();
    next.phase = Phase::Idle;
    next.selected_species = Some(label.to_string());

    let mut effects = vec![
        Effect::append(NewMessage::user_selection(token, label)),
        Effect::append(NewMessage::bot_text(
            token,
            MessageRole::SelectionConfirmation,
            phrases::selected(label),
        )),
    ];

    // Taken in this transition, so a later pick cannot answer it again
    match next.pending_question.take() {
        Some(question) => {
            next.phase = Phase::Answering {
                token: token.to_string(),
                label: Some(label.to_string()),
                origin: AnswerOrigin::Selection,
            };
            effects.push(Effect::append(NewMessage::processing(
                token,
                phrases::ANSWERING_SELECTED,
            )));
            effects.push(Effect::RequestAnswer {
                token: token.to_string(),
                question,
                label: Some(label.to_string()),
            });
        }
        None => effects.push(Effect::append(NewMessage::bot_text(
            token,
            MessageRole::AskPrompt,
            phrases::ask_about(label),
        ))),
    }

    Ok(TransitionResult::new(next).with_effects(effects))
}

fn answered(
    state: &SessionState,
    token: &str,
    origin: AnswerOrigin,
    answer: Option<String>,
) -> TransitionResult {
    let text = answer
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| phrases::FALLBACK_ANSWER.to_string());

    let mut next = state.clone();
    next.phase = Phase::Idle;

    TransitionResult::new(next)
        .with_effect(Effect::remove_processing(token))
        .with_effect(Effect::append(NewMessage::bot_text(
            token,
            MessageRole::Answer,
            text,
        )))
        .with_effects(finish_if_submission(origin))
}

fn answer_failed(
    state: &SessionState,
    token: &str,
    origin: AnswerOrigin,
    reason: &str,
) -> TransitionResult {
    let text = phrases::answer_failed(reason);
    let mut next = state.clone();
    next.phase = Phase::Idle;
    next.error_notice = Some(text.clone());

    TransitionResult::new(next)
        .with_effect(Effect::remove_processing(token))
        .with_effect(Effect::append(NewMessage::error(token, text)))
        .with_effects(finish_if_submission(origin))
}

fn finish_if_submission(origin: AnswerOrigin) -> Option<Effect> {
    match origin {
        AnswerOrigin::Submission => Some(Effect::FinishSubmission),
        AnswerOrigin::Selection => None,
    }
}
