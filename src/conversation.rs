//! Conversation message model and log

mod log;
mod message;

pub use log::MessageLog;
pub use message::{
    message_id, Candidate, ImageRef, Message, MessagePayload, MessageRole, NewMessage, Sender,
};
