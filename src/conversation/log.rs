//! Append-only message log

use super::message::{Message, NewMessage};
use chrono::{DateTime, TimeDelta, Utc};

/// Time-ordered conversation log.
///
/// Entries are only ever appended or removed by id. Every stamp is strictly
/// later than the previous one, so entries appended in one batch keep their
/// relative order even when the wall clock has not moved.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    entries: Vec<Message>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp and append a message. Returns `None` if the id is already live.
    pub fn append(&mut self, message: NewMessage) -> Option<&Message> {
        if self.contains(&message.id) {
            return None;
        }
        let timestamp = self.next_timestamp(Utc::now());
        self.entries.push(message.stamp(timestamp));
        self.entries.last()
    }

    /// Remove the message with `id`, returning it if it was present
    pub fn remove(&mut self, id: &str) -> Option<Message> {
        let index = self.entries.iter().position(|m| m.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|m| m.id == id)
    }

    /// Whether any live id was derived from `token` (`<token>_<role>`)
    pub fn uses_token(&self, token: &str) -> bool {
        self.entries.iter().any(|m| {
            m.id.strip_prefix(token)
                .is_some_and(|role| role.starts_with('_'))
        })
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.entries.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_timestamp(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::milliseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(stamp);
        stamp
    }
}
