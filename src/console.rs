//! Line-oriented console front-end
//!
//! Parses stdin lines into intents and renders snapshot changes as text.
//! Everything here only reads [`SessionSnapshot`]s; the session owns state.

use crate::conversation::{Candidate, Message, MessagePayload, Sender};
use crate::runtime::SessionSnapshot;
use crate::staging::SelectedFile;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  /attach <path>...   stage image files
  /remove <n>         unstage image n
  /clear              unstage all images
  /pick <n|label>     choose a species
  /close              close the species list without choosing
  /dismiss            hide the error notice
  /help               show this help
  /quit               exit
Anything else is sent as a question.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickTarget {
    /// Zero-based position in the current candidate list
    Index(usize),
    Label(String),
}

impl PickTarget {
    /// Resolve to a species label against the candidates on screen
    pub fn resolve(&self, candidates: &[Candidate]) -> Result<String, CommandError> {
        match self {
            PickTarget::Index(index) => candidates
                .get(*index)
                .map(|c| c.label.clone())
                .ok_or(CommandError::NoSuchCandidate(index + 1)),
            PickTarget::Label(label) => Ok(label.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Attach(Vec<PathBuf>),
    /// Zero-based index
    Remove(usize),
    Clear,
    Pick(PickTarget),
    Close,
    Dismiss,
    Help,
    Quit,
    Say(String),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command /{0}, try /help")]
    UnknownCommand(String),
    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("not a position: {0} (positions start at 1)")]
    InvalidIndex(String),
    #[error("no candidate number {0}")]
    NoSuchCandidate(usize),
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(ConsoleCommand::Say(line.to_string())));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "attach" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument("attach"));
            }
            ConsoleCommand::Attach(arg.split_whitespace().map(PathBuf::from).collect())
        }
        "remove" => ConsoleCommand::Remove(parse_position(arg, "remove")?),
        "clear" => ConsoleCommand::Clear,
        "pick" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument("pick"));
            }
            if arg.chars().all(|c| c.is_ascii_digit()) {
                ConsoleCommand::Pick(PickTarget::Index(parse_position(arg, "pick")?))
            } else {
                ConsoleCommand::Pick(PickTarget::Label(arg.to_string()))
            }
        }
        "close" => ConsoleCommand::Close,
        "dismiss" => ConsoleCommand::Dismiss,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

/// One-based position on screen to zero-based index
fn parse_position(arg: &str, command: &'static str) -> Result<usize, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingArgument(command));
    }
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(CommandError::InvalidIndex(arg.to_string())),
    }
}

/// Read a file from disk as a picker selection, guessing its media type
pub async fn load_attachment(path: &Path) -> Result<SelectedFile, CommandError> {
    let data = tokio::fs::read(path).await.map_err(|source| CommandError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let name = path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    );
    let media_type = mime_guess::from_path(path).first_or_octet_stream();
    Ok(SelectedFile::new(name, media_type.essence_str(), data))
}

/// Render a single log entry
pub fn render_message(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Bot => "bot",
    };
    match &message.payload {
        MessagePayload::Text(text) if message.is_processing => format!("[{who}] ... {text}"),
        MessagePayload::Text(text) if message.is_error => format!("[{who}] ! {text}"),
        MessagePayload::Text(text) => format!("[{who}] {text}"),
        MessagePayload::ImageSet(images) => {
            let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
            format!("[{who}] sent {} image(s): {}", images.len(), names.join(", "))
        }
        MessagePayload::ClassificationResults(candidates) => {
            let mut out = format!("[{who}] candidates:");
            for (i, candidate) in candidates.iter().enumerate() {
                out.push_str(&format!(
                    "\n  {}. {} ({}) {}",
                    i + 1,
                    candidate.label,
                    candidate.confidence_percent(),
                    candidate.representative_image_path()
                ));
            }
            out
        }
        MessagePayload::SelectionConfirmation { label } => format!("[{who}] picked {label}"),
    }
}

/// Tracks what has already been printed so only changes are rendered
#[derive(Debug, Default)]
pub struct Transcript {
    printed: HashSet<String>,
    last_status: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines for messages not printed before, plus the status line if it changed
    pub fn render_new(&mut self, snapshot: &SessionSnapshot) -> Vec<String> {
        let mut lines: Vec<String> = snapshot
            .messages
            .iter()
            .filter(|m| self.printed.insert(m.id.clone()))
            .map(render_message)
            .collect();

        let status = render_status(snapshot);
        if status != self.last_status {
            if let Some(status) = &status {
                lines.push(status.clone());
            }
            self.last_status = status;
        }
        lines
    }
}

/// Summary of the non-log signals, `None` when there is nothing to show
pub fn render_status(snapshot: &SessionSnapshot) -> Option<String> {
    let mut parts = Vec::new();
    if snapshot.is_busy && snapshot.upload_progress_percent > 0 {
        parts.push(format!("uploading {}%", snapshot.upload_progress_percent));
    }
    if !snapshot.staged.is_empty() {
        parts.push(format!("{} image(s) staged", snapshot.staged.len()));
    }
    if snapshot.is_selection_surface_open {
        parts.push("choose a species with /pick <n>".to_string());
    }
    if let Some(error) = &snapshot.error_text {
        parts.push(format!("error: {error}"));
    }
    (!parts.is_empty()).then(|| format!("-- {}", parts.join(" | ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ImageRef, MessageLog, NewMessage};
    use std::io::Write;

    fn stamped(message: NewMessage) -> Message {
        let mut log = MessageLog::new();
        let stamped = log.append(message).unwrap().clone();
        stamped
    }

    #[test]
    fn test_parse_plain_text_and_blank() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(
            parse_line(" xin chào ").unwrap(),
            Some(ConsoleCommand::Say("xin chào".to_string()))
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_line("/attach a.jpg  b.png").unwrap(),
            Some(ConsoleCommand::Attach(vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.png")
            ]))
        );
        assert_eq!(
            parse_line("/remove 2").unwrap(),
            Some(ConsoleCommand::Remove(1))
        );
        assert_eq!(
            parse_line("/pick 1").unwrap(),
            Some(ConsoleCommand::Pick(PickTarget::Index(0)))
        );
        assert_eq!(
            parse_line("/pick Loài C").unwrap(),
            Some(ConsoleCommand::Pick(PickTarget::Label("Loài C".to_string())))
        );
        assert_eq!(parse_line("/quit").unwrap(), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_line("/remove 0"),
            Err(CommandError::InvalidIndex(_))
        ));
        assert!(matches!(
            parse_line("/attach"),
            Err(CommandError::MissingArgument("attach"))
        ));
        assert!(matches!(
            parse_line("/frobnicate"),
            Err(CommandError::UnknownCommand(name)) if name == "frobnicate"
        ));
    }

    #[test]
    fn test_pick_resolves_against_candidates() {
        let candidates = vec![Candidate::new("Loài A", 0.9), Candidate::new("Loài B", 0.1)];
        assert_eq!(
            PickTarget::Index(1).resolve(&candidates).unwrap(),
            "Loài B"
        );
        assert!(matches!(
            PickTarget::Index(2).resolve(&candidates),
            Err(CommandError::NoSuchCandidate(3))
        ));
    }

    #[tokio::test]
    async fn test_load_attachment_guesses_media_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"\x89PNG").unwrap();

        let loaded = load_attachment(&path).await.unwrap();
        assert_eq!(loaded.name, "leaf.png");
        assert_eq!(loaded.media_type, "image/png");
        assert!(loaded.is_image());
        assert_eq!(&*loaded.data, b"\x89PNG");

        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "hello").unwrap();
        assert!(!load_attachment(&notes).await.unwrap().is_image());

        let missing = load_attachment(&dir.path().join("missing.jpg")).await;
        assert!(matches!(missing, Err(CommandError::Read { .. })));
    }

    #[test]
    fn test_render_messages() {
        let results = stamped(NewMessage::classification_results(
            "t",
            vec![Candidate::new("Loài A", 0.92)],
        ));
        assert_eq!(
            render_message(&results),
            "[bot] candidates:\n  1. Loài A (92.0%) /representative_images/Loài_A.jpg"
        );

        let images = stamped(NewMessage::user_images(
            "t",
            vec![ImageRef {
                name: "a.jpg".to_string(),
                media_type: "image/jpeg".to_string(),
                byte_len: 3,
            }],
        ));
        assert_eq!(render_message(&images), "[you] sent 1 image(s): a.jpg");

        let error = stamped(NewMessage::error("t", "boom"));
        assert_eq!(render_message(&error), "[bot] ! boom");
    }

    #[test]
    fn test_transcript_prints_each_message_once() {
        let mut log = MessageLog::new();
        log.append(NewMessage::user_text("t", "hi"));
        let mut snapshot = SessionSnapshot {
            messages: log.messages().to_vec(),
            ..SessionSnapshot::default()
        };
        let mut transcript = Transcript::new();
        assert_eq!(transcript.render_new(&snapshot), vec!["[you] hi"]);
        assert!(transcript.render_new(&snapshot).is_empty());

        snapshot.error_text = Some("oops".to_string());
        assert_eq!(transcript.render_new(&snapshot), vec!["-- error: oops"]);
        assert!(transcript.render_new(&snapshot).is_empty());
    }
}
