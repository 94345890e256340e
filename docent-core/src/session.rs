//! Per-connection session state
//!
//! One session exists per authenticated connection. It owns its
//! conversational memory exclusively and never outlives the connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;

/// A chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (user, assistant, system)
    pub role: String,
    /// Message content
    pub content: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Rough token estimate for budget accounting (~4 chars per token)
    pub fn estimated_tokens(&self) -> usize {
        (self.content.len() + self.role.len()) / 4
    }
}

/// Bounded conversational memory.
///
/// Holds prior turns up to a fixed token budget; when the budget is
/// exceeded, the oldest messages are evicted first. The buffer never grows
/// unboundedly.
#[derive(Debug, Clone)]
pub struct ChatMemory {
    messages: Vec<ChatMessage>,
    token_budget: usize,
}

impl ChatMemory {
    /// Create a memory buffer with the given token budget
    pub fn new(token_budget: usize) -> Self {
        Self {
            messages: Vec::new(),
            token_budget,
        }
    }

    /// Append a message, evicting oldest messages while over budget.
    ///
    /// The most recent message is always retained, even if it alone
    /// exceeds the budget.
    pub fn push(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
        while self.estimated_tokens() > self.token_budget && self.messages.len() > 1 {
            self.messages.remove(0);
        }
    }

    /// Messages currently held, oldest first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Total estimated tokens currently held
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(ChatMessage::estimated_tokens).sum()
    }

    /// Number of messages currently held
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop all messages
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// A connection-scoped conversation session
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session id
    pub id: Uuid,
    /// Identity granted by the credential gate
    pub identity: Identity,
    /// Session creation time
    pub created_at: DateTime<Utc>,
    /// Full text of the most recent assistant answer
    pub last_message: Option<String>,
}

impl Session {
    /// Create a new session for an authenticated identity
    pub fn new(identity: Identity) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            created_at: Utc::now(),
            last_message: None,
        }
    }

    /// Record the finalized answer of the latest turn
    pub fn set_last_message(&mut self, content: impl Into<String>) {
        self.last_message = Some(content.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_identity() -> Identity {
        Identity {
            identifier: "admin".to_string(),
            role: "admin".to_string(),
            provider: "credentials".to_string(),
        }
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new(admin_identity());
        assert!(session.last_message.is_none());
        assert_eq!(session.identity.role, "admin");
    }

    #[test]
    fn test_last_message_updates() {
        let mut session = Session::new(admin_identity());
        session.set_last_message("Hello, world");
        assert_eq!(session.last_message.as_deref(), Some("Hello, world"));

        session.set_last_message("Second answer");
        assert_eq!(session.last_message.as_deref(), Some("Second answer"));
    }

    #[test]
    fn test_memory_keeps_messages_under_budget() {
        let mut memory = ChatMemory::new(2048);
        memory.push("user", "Hello");
        memory.push("assistant", "Hi there!");

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.messages()[0].role, "user");
        assert_eq!(memory.messages()[1].role, "assistant");
    }

    #[test]
    fn test_memory_evicts_oldest_first() {
        // Budget of ~25 tokens: each 100-char message is ~26 tokens.
        let mut memory = ChatMemory::new(25);
        memory.push("user", "a".repeat(100));
        memory.push("assistant", "b".repeat(100));

        assert_eq!(memory.len(), 1);
        assert!(memory.messages()[0].content.starts_with('b'));
    }

    #[test]
    fn test_memory_never_unbounded() {
        let mut memory = ChatMemory::new(100);
        for i in 0..200 {
            memory.push("user", format!("message number {} with some padding", i));
        }

        assert!(memory.estimated_tokens() <= 100 || memory.len() == 1);
        // Newest message always survives
        assert!(memory.messages().last().unwrap().content.contains("199"));
    }

    #[test]
    fn test_memory_retains_single_oversized_message() {
        let mut memory = ChatMemory::new(10);
        memory.push("user", "x".repeat(500));

        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_memory_clear() {
        let mut memory = ChatMemory::new(2048);
        memory.push("user", "Hello");
        assert!(!memory.is_empty());

        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.estimated_tokens(), 0);
    }
}
