//! Session runtime executor

use super::{Command, SessionSnapshot};
use crate::config::SessionConfig;
use crate::conversation::{MessageLog, NewMessage};
use crate::error::{SessionError, ValidationError};
use crate::gateway::{Classifier, QuestionAnswerer, UploadProgress};
use crate::phrases;
use crate::staging::{SelectedFile, UploadStagingArea};
use crate::state_machine::{transition, Effect, Event, SessionState, TransitionError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

const WELCOME_ID: &str = "welcome";

/// Owns everything mutable about one session and applies events to it
pub struct SessionRuntime<C, Q>
where
    C: Classifier + 'static,
    Q: QuestionAnswerer + 'static,
{
    state: SessionState,
    log: MessageLog,
    staging: UploadStagingArea,
    classifier: Arc<C>,
    answerer: Arc<Q>,
    command_rx: mpsc::Receiver<Command>,
    /// Gateway results re-enter the session here
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    progress: UploadProgress,
    progress_rx: watch::Receiver<u8>,
}

impl<C, Q> SessionRuntime<C, Q>
where
    C: Classifier + 'static,
    Q: QuestionAnswerer + 'static,
{
    pub(crate) fn new(
        classifier: C,
        answerer: Q,
        config: &SessionConfig,
        command_rx: mpsc::Receiver<Command>,
    ) -> (Self, watch::Receiver<SessionSnapshot>) {
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let (progress, progress_rx) = UploadProgress::new();

        let mut log = MessageLog::new();
        if config.greeting {
            log.append(NewMessage::bot_text_with_id(WELCOME_ID, phrases::WELCOME));
        }

        let runtime = Self {
            state: SessionState::default(),
            log,
            staging: UploadStagingArea::new(),
            classifier: Arc::new(classifier),
            answerer: Arc::new(answerer),
            command_rx,
            event_tx,
            event_rx,
            snapshot_tx,
            progress,
            progress_rx,
        };
        runtime.publish();
        (runtime, snapshot_rx)
    }

    pub async fn run(mut self) {
        tracing::info!("Starting session runtime");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.event_rx.recv() => {
                    self.handle_result(event);
                }
                Ok(()) = self.progress_rx.changed() => {
                    self.publish();
                }
            }
        }

        tracing::info!("Session runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { text, reply } => {
                let token = format!("msg_{}", uuid::Uuid::new_v4());
                let event = Event::UserSubmit {
                    token,
                    text,
                    images: self.staging.files(),
                };
                let result = self.apply(event).map_err(session_error);
                self.respond(reply, result);
            }

            Command::Attach { files, reply } => {
                let result = self.attach(files);
                self.respond(reply, result);
            }

            Command::RemoveImage { index, reply } => {
                let result = self.ensure_idle().and_then(|()| {
                    self.staging
                        .remove_at(index)
                        .map(drop)
                        .map_err(SessionError::from)
                });
                self.respond(reply, result);
            }

            Command::ClearImages { reply } => {
                let result = self.ensure_idle().map(|()| self.staging.clear());
                self.respond(reply, result);
            }

            Command::SelectSpecies {
                label,
                token,
                reply,
            } => {
                let token = self.selection_token(token);
                let result = self
                    .apply(Event::SelectSpecies { token, label })
                    .map_err(session_error);
                self.respond(reply, result);
            }

            Command::DismissSelection { reply } => {
                let result = self.apply(Event::DismissSelection).map_err(session_error);
                self.respond(reply, result);
            }

            Command::DismissError { reply } => {
                let result = self.apply(Event::DismissError).map_err(session_error);
                self.respond(reply, result);
            }
        }
    }

    fn attach(&mut self, files: Vec<SelectedFile>) -> Result<usize, SessionError> {
        self.ensure_idle()?;
        match self.staging.add(files) {
            Ok(staged) => Ok(staged),
            Err(e) => {
                if let ValidationError::NoValidImages { rejected } = &e {
                    tracing::debug!(rejected, "No image among selected files");
                    self.apply(Event::AttachmentRejected {
                        message: phrases::INVALID_FILES.to_string(),
                    })
                    .map_err(session_error)?;
                }
                Err(e.into())
            }
        }
    }

    /// A supplied token is kept unless an earlier entry already carries it
    fn selection_token(&self, supplied: Option<String>) -> String {
        match supplied {
            Some(token) if !self.log.uses_token(&token) => token,
            Some(token) => {
                let fresh = format!("{token}_{}", uuid::Uuid::new_v4());
                tracing::debug!(token = %token, fresh = %fresh, "Selection token already in the log");
                fresh
            }
            None => format!("select_{}", uuid::Uuid::new_v4()),
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.state.is_busy() {
            Err(SessionError::Busy)
        } else {
            Ok(())
        }
    }

    /// Publish, then answer the intent
    fn respond<T>(
        &self,
        reply: tokio::sync::oneshot::Sender<Result<T, SessionError>>,
        result: Result<T, SessionError>,
    ) {
        self.publish();
        if reply.send(result).is_err() {
            tracing::debug!("Intent reply dropped by caller");
        }
    }

    /// Gateway results never fail the session; stale ones are dropped
    fn handle_result(&mut self, event: Event) {
        if let Err(e) = self.apply(event) {
            tracing::warn!(error = %e, "Ignoring gateway result");
        }
        self.publish();
    }

    fn apply(&mut self, event: Event) -> Result<(), TransitionError> {
        let result = transition(&self.state, event)?;
        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage(message) => {
                let id = message.id.clone();
                if self.log.append(message).is_none() {
                    tracing::error!(id = %id, "Refusing to append duplicate message id");
                }
            }

            Effect::RemoveMessage { id } => {
                if self.log.remove(&id).is_none() {
                    tracing::debug!(id = %id, "Message to remove was not in the log");
                }
            }

            Effect::RequestClassification { token, images } => {
                self.progress.reset();
                let classifier = Arc::clone(&self.classifier);
                let progress = self.progress.clone();
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tracing::info!(token = %token, images = images.len(), "Classifying images");
                    let outcome =
                        supervise(async move { classifier.classify(&images, &progress).await })
                            .await
                            .and_then(|r| r.map_err(|e| e.to_string()));
                    let event = match outcome {
                        Ok(candidates) => Event::ClassificationSucceeded { token, candidates },
                        Err(message) => Event::ClassificationFailed { token, message },
                    };
                    if event_tx.send(event).await.is_err() {
                        tracing::debug!("Session stopped before classification finished");
                    }
                });
            }

            Effect::RequestAnswer {
                token,
                question,
                label,
            } => {
                let answerer = Arc::clone(&self.answerer);
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tracing::info!(token = %token, label = ?label, "Asking question");
                    let outcome =
                        supervise(async move { answerer.ask(&question, label.as_deref()).await })
                            .await
                            .and_then(|r| r.map_err(|e| e.to_string()));
                    let event = match outcome {
                        Ok(answer) => Event::AnswerReceived { token, answer },
                        Err(message) => Event::AnswerFailed { token, message },
                    };
                    if event_tx.send(event).await.is_err() {
                        tracing::debug!("Session stopped before the answer arrived");
                    }
                });
            }

            Effect::FinishSubmission => {
                self.staging.clear();
                self.progress.reset();
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.log.messages().to_vec(),
            staged: self.staging.previews(),
            is_busy: self.state.is_busy(),
            upload_progress_percent: self.progress.percent(),
            is_selection_surface_open: self.state.is_selection_open(),
            error_text: self.state.error_notice.clone(),
            candidates: self.state.candidates.clone(),
            selected_species: self.state.selected_species.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

/// Run a gateway call on its own task. A panic comes back as a failure
/// reason so the session still leaves its busy phase.
async fn supervise<F>(call: F) -> Result<F::Output, String>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(call).await.map_err(|e| {
        tracing::error!(error = %e, "Gateway task failed");
        e.to_string()
    })
}

fn session_error(e: TransitionError) -> SessionError {
    match e {
        TransitionError::Busy => SessionError::Busy,
        TransitionError::EmptySubmission => ValidationError::EmptySubmission.into(),
        TransitionError::EmptyLabel => SessionError::InvalidSelection("empty label".to_string()),
        TransitionError::UnexpectedEvent(detail) => SessionError::InvalidSelection(detail),
    }
}
