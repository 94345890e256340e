//! Message and turn event types
//!
//! These types decouple the conversational engine from the chat gateway:
//! the gateway feeds `InboundMessage`s to a session's turn handler and
//! renders the `TurnEvent`s it emits back onto the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author name attached to every assistant-originated message.
pub const ASSISTANT_AUTHOR: &str = "Assistant";

/// Message received from a chat channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel identifier (e.g., "websocket", "cli")
    pub channel: String,
    /// User identifier
    pub sender_id: String,
    /// Message text content
    pub content: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Message to send to a chat channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Display author of the message
    pub author: String,
    /// Message text content
    pub content: String,
    /// Document previews attached to the message
    pub attachments: Vec<DocumentPreview>,
}

impl OutboundMessage {
    /// Create a new assistant-authored outbound message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            author: ASSISTANT_AUTHOR.to_string(),
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    /// Attach a document preview to the message
    pub fn with_attachment(mut self, preview: DocumentPreview) -> Self {
        self.attachments.push(preview);
        self
    }
}

/// Side-panel document preview element referencing a knowledge-base file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPreview {
    /// Display name (the cited file name)
    pub name: String,
    /// Path of the file under the documents directory
    pub path: String,
    /// Guessed content type of the file
    pub mime: String,
}

/// Events emitted while a single turn is processed.
///
/// Deltas arrive in generation order and must be rendered in that order;
/// `Completed` carries the exact concatenation of every delta, and `Sources`
/// is the separate attribution message that follows the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TurnEvent {
    /// Incremental assistant text output
    Delta { text: String },
    /// The answer message is complete
    Completed { content: String },
    /// Source-attribution footer with preview attachments
    Sources { message: OutboundMessage },
}
