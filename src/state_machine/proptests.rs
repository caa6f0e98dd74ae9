//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::conversation::{Candidate, MessageLog};
use crate::staging::SelectedFile;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// What a user or gateway does next; turned into an [`Event`] against the
/// current state so results carry the in-flight token.
#[derive(Debug, Clone)]
enum Action {
    Submit { text: String, images: usize },
    Select { label: String },
    DismissSelection,
    DismissError,
    ClassifyOk { candidates: Vec<Candidate> },
    ClassifyFail { message: String },
    Answer { answer: Option<String> },
    AnswerFail { message: String },
    StaleResult,
}

struct Driver {
    state: SessionState,
    log: MessageLog,
    next_token: usize,
}

impl Driver {
    fn new() -> Self {
        Self {
            state: SessionState::default(),
            log: MessageLog::new(),
            next_token: 0,
        }
    }

    fn mint(&mut self) -> String {
        self.next_token += 1;
        format!("t{}", self.next_token)
    }

    fn event_for(&mut self, action: Action) -> Event {
        let in_flight = self
            .state
            .phase
            .in_flight_token()
            .unwrap_or("none")
            .to_string();
        match action {
            Action::Submit { text, images } => Event::UserSubmit {
                token: self.mint(),
                text,
                images: (0..images).map(test_image).collect(),
            },
            Action::Select { label } => Event::SelectSpecies {
                token: self.mint(),
                label,
            },
            Action::DismissSelection => Event::DismissSelection,
            Action::DismissError => Event::DismissError,
            Action::ClassifyOk { candidates } => Event::ClassificationSucceeded {
                token: in_flight,
                candidates,
            },
            Action::ClassifyFail { message } => Event::ClassificationFailed {
                token: in_flight,
                message,
            },
            Action::Answer { answer } => Event::AnswerReceived {
                token: in_flight,
                answer,
            },
            Action::AnswerFail { message } => Event::AnswerFailed {
                token: in_flight,
                message,
            },
            Action::StaleResult => Event::AnswerReceived {
                token: "stale".to_string(),
                answer: None,
            },
        }
    }

    /// Apply the log effects the way the runtime does
    fn apply(&mut self, result: TransitionResult) {
        for effect in &result.effects {
            match effect {
                Effect::AppendMessage(message) => {
                    assert!(
                        self.log.append(message.clone()).is_some(),
                        "duplicate id {}",
                        message.id
                    );
                }
                Effect::RemoveMessage { id } => {
                    assert!(self.log.remove(id).is_some(), "missing {id}");
                }
                _ => {}
            }
        }
        self.state = result.new_state;
    }
}

fn test_image(index: usize) -> SelectedFile {
    SelectedFile::new(format!("leaf_{index}.jpg"), "image/jpeg", vec![0xFFu8, 0xD8])
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_candidate() -> impl Strategy<Value = Candidate> {
    ("[A-Z][a-z]{2,10}( [a-z]{2,8})?", 0.0f64..=1.0)
        .prop_map(|(label, confidence)| Candidate::new(label, confidence))
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        ("[a-zA-Z ?]{0,20}", 0usize..4)
            .prop_map(|(text, images)| Action::Submit { text, images }),
        "[a-zA-Z ]{0,12}".prop_map(|label| Action::Select { label }),
        Just(Action::DismissSelection),
        Just(Action::DismissError),
        proptest::collection::vec(arb_candidate(), 0..4)
            .prop_map(|candidates| Action::ClassifyOk { candidates }),
        "[a-zA-Z ]{1,20}".prop_map(|message| Action::ClassifyFail { message }),
        proptest::option::of("[a-zA-Z ]{0,20}").prop_map(|answer| Action::Answer { answer }),
        "[a-zA-Z ]{1,20}".prop_map(|message| Action::AnswerFail { message }),
        Just(Action::StaleResult),
    ]
}

fn arb_busy_state() -> impl Strategy<Value = SessionState> {
    let phase = prop_oneof![
        (1usize..4).prop_map(|image_count| Phase::Classifying {
            token: "busy".to_string(),
            image_count,
        }),
        (
            proptest::option::of("[A-Z][a-z]{3,8}"),
            prop_oneof![Just(AnswerOrigin::Submission), Just(AnswerOrigin::Selection)]
        )
            .prop_map(|(label, origin)| Phase::Answering {
                token: "busy".to_string(),
                label,
                origin,
            }),
    ];
    (phase, proptest::option::of("[a-z ]{1,20}")).prop_map(|(phase, pending_question)| {
        SessionState {
            phase,
            pending_question,
            ..SessionState::default()
        }
    })
}

// ============================================================================
// State Validity Checkers
// ============================================================================

fn processing_ids(log: &MessageLog) -> Vec<&str> {
    log.messages()
        .iter()
        .filter(|m| m.is_processing)
        .map(|m| m.id.as_str())
        .collect()
}

fn effects_match_phase(effects: &[Effect], new_state: &SessionState) -> bool {
    for effect in effects {
        match effect {
            Effect::RequestClassification { token, .. } => {
                if !matches!(&new_state.phase, Phase::Classifying { token: t, .. } if t == token) {
                    return false;
                }
            }
            Effect::RequestAnswer { token, .. } => {
                if !matches!(&new_state.phase, Phase::Answering { token: t, .. } if t == token) {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // A processing placeholder exists exactly while a call is in flight
    #[test]
    fn prop_processing_message_tracks_in_flight_call(
        actions in proptest::collection::vec(arb_action(), 0..30)
    ) {
        let mut driver = Driver::new();
        for action in actions {
            let event = driver.event_for(action);
            if let Ok(result) = transition(&driver.state, event) {
                driver.apply(result);
            }

            let live = processing_ids(&driver.log);
            match driver.state.phase.in_flight_token() {
                Some(token) => prop_assert_eq!(live, vec![format!("{token}_processing")]),
                None => prop_assert!(live.is_empty(), "lingering placeholder: {:?}", live),
            }
        }
    }

    // Gateway requests are only issued together with the matching busy phase
    #[test]
    fn prop_requests_match_phase(
        actions in proptest::collection::vec(arb_action(), 0..30)
    ) {
        let mut driver = Driver::new();
        for action in actions {
            let event = driver.event_for(action);
            if let Ok(result) = transition(&driver.state, event) {
                prop_assert!(effects_match_phase(&result.effects, &result.new_state));
                driver.apply(result);
            }
            prop_assert!(
                !driver.state.is_selection_open() || !driver.state.candidates.is_empty(),
                "selection open without candidates"
            );
        }
    }

    // Busy phases reject new work and leave state untouched
    #[test]
    fn prop_busy_rejects_user_work(
        state in arb_busy_state(),
        text in "[a-z ]{0,20}",
        images in 0usize..3,
        label in "[A-Z][a-z]{2,8}",
    ) {
        let submit = Event::UserSubmit {
            token: "new".to_string(),
            text,
            images: (0..images).map(test_image).collect(),
        };
        prop_assert_eq!(transition(&state, submit).unwrap_err(), TransitionError::Busy);

        let select = Event::SelectSpecies { token: "new".to_string(), label };
        prop_assert_eq!(transition(&state, select).unwrap_err(), TransitionError::Busy);
    }

    // Whitespace-only submissions never produce effects
    #[test]
    fn prop_blank_submission_rejected(text in "[ \t\n]{0,10}") {
        let event = Event::UserSubmit {
            token: "t".to_string(),
            text,
            images: vec![],
        };
        prop_assert_eq!(
            transition(&SessionState::default(), event).unwrap_err(),
            TransitionError::EmptySubmission
        );
    }

    // A successful pick always consumes the pending question
    #[test]
    fn prop_pick_consumes_pending_question(
        pending in proptest::option::of("[a-z ]{1,20}"),
        label in "[A-Z][a-z]{2,8}",
    ) {
        let state = SessionState {
            phase: Phase::AwaitingSelection { token: "c".to_string() },
            pending_question: pending.clone(),
            candidates: vec![Candidate::new(label.clone(), 0.5)],
            ..SessionState::default()
        };
        let result = transition(&state, Event::SelectSpecies {
            token: "s".to_string(),
            label: label.clone(),
        }).unwrap();

        prop_assert_eq!(result.new_state.is_busy(), pending.is_some());
        prop_assert_eq!(result.new_state.pending_question.as_deref(), None);
        prop_assert_eq!(result.new_state.selected_species.as_deref(), Some(label.as_str()));
    }

    // Candidate order from the gateway is kept in the result message
    #[test]
    fn prop_candidate_order_preserved(
        candidates in proptest::collection::vec(arb_candidate(), 1..6)
    ) {
        let state = SessionState {
            phase: Phase::Classifying { token: "c".to_string(), image_count: 1 },
            ..SessionState::default()
        };
        let result = transition(&state, Event::ClassificationSucceeded {
            token: "c".to_string(),
            candidates: candidates.clone(),
        }).unwrap();

        let shown = result.effects.iter().find_map(|e| match e {
            Effect::AppendMessage(m) => match &m.payload {
                crate::conversation::MessagePayload::ClassificationResults(c) => Some(c.clone()),
                _ => None,
            },
            _ => None,
        });
        prop_assert_eq!(shown, Some(candidates.clone()));
        prop_assert_eq!(result.new_state.candidates, candidates);
    }
}
