//! Runtime for driving a chat session
//!
//! One session runs on its own tokio task. The UI talks to it through a
//! [`SessionHandle`]: intents go in over an mpsc channel and each is answered
//! once its transition has been applied and a fresh [`SessionSnapshot`]
//! published on a `watch` channel.

mod executor;

#[cfg(test)]
pub mod testing;


use executor::SessionRuntime;

use crate::config::SessionConfig;
use crate::conversation::{Candidate, Message};
use crate::error::SessionError;
use crate::gateway::{Classifier, QuestionAnswerer};
use crate::staging::{SelectedFile, StagedPreview};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

/// What the UI renders. Published after every applied intent or gateway result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub staged: Vec<StagedPreview>,
    pub is_busy: bool,
    pub upload_progress_percent: u8,
    pub is_selection_surface_open: bool,
    pub error_text: Option<String>,
    pub candidates: Vec<Candidate>,
    pub selected_species: Option<String>,
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Intents sent from a [`SessionHandle`] to the session task
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        text: String,
        reply: Reply<()>,
    },
    Attach {
        files: Vec<SelectedFile>,
        reply: Reply<usize>,
    },
    RemoveImage {
        index: usize,
        reply: Reply<()>,
    },
    ClearImages {
        reply: Reply<()>,
    },
    SelectSpecies {
        label: String,
        token: Option<String>,
        reply: Reply<()>,
    },
    DismissSelection {
        reply: Reply<()>,
    },
    DismissError {
        reply: Reply<()>,
    },
}

/// Handle to interact with a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Submit the composer text together with every staged image
    pub async fn submit_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Command::Submit { text, reply }).await
    }

    /// Stage files; non-images are dropped. Returns how many were staged.
    pub async fn attach_images(&self, files: Vec<SelectedFile>) -> Result<usize, SessionError> {
        self.request(|reply| Command::Attach { files, reply }).await
    }

    pub async fn remove_image(&self, index: usize) -> Result<(), SessionError> {
        self.request(|reply| Command::RemoveImage { index, reply })
            .await
    }

    pub async fn clear_images(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::ClearImages { reply }).await
    }

    /// Pick a species; the session mints the correlation token
    pub async fn select_species(&self, label: impl Into<String>) -> Result<(), SessionError> {
        let label = label.into();
        self.request(|reply| Command::SelectSpecies {
            label,
            token: None,
            reply,
        })
        .await
    }

    /// Pick a species under a UI-supplied correlation token
    pub async fn select_species_with_token(
        &self,
        label: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<(), SessionError> {
        let label = label.into();
        let token = Some(token.into());
        self.request(|reply| Command::SelectSpecies {
            label,
            token,
            reply,
        })
        .await
    }

    /// Close the selection surface without choosing
    pub async fn dismiss_selection(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::DismissSelection { reply })
            .await
    }

    pub async fn dismiss_error(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::DismissError { reply }).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that is notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Resolve once no backend call is outstanding
    pub async fn wait_until_idle(&self) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(|s| !s.is_busy)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(build(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }
}

/// Start a session on a new tokio task and return its handle.
///
/// The task stops once every handle has been dropped.
pub fn spawn_session<C, Q>(classifier: C, answerer: Q, config: SessionConfig) -> SessionHandle
where
    C: Classifier + 'static,
    Q: QuestionAnswerer + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(config.channel_capacity.max(1));
    let (runtime, snapshot_rx) = SessionRuntime::new(classifier, answerer, &config, command_rx);
    tokio::spawn(runtime.run());
    SessionHandle {
        command_tx,
        snapshot_rx,
    }
}
