use serde::{Deserialize, Serialize};

pub const GREETING: &str =
    "[ SYSTEM READY ] LifeOS AI initialized. Query tasks, finances, or mood data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub tools: Vec<String>,
    /// Client-side failures; shown to the user, never sent upstream.
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>, tools: Vec<String>) -> Self {
        Self {
            tools,
            ..Self::plain(Role::Assistant, content)
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::plain(Role::Assistant, content)
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tools: Vec::new(),
            is_error: false,
        }
    }
}

/// One turn as the chat endpoint expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with the assistant's ready banner.
    pub fn greeted() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING, Vec::new())],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// History to send along with `pending`: errors and system notes are left out.
    pub fn history_with(&self, pending: &str) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .filter(|message| !message.is_error && message.role != Role::System)
            .map(|message| HistoryEntry {
                role: message.role,
                content: message.content.clone(),
            })
            .chain(std::iter::once(HistoryEntry {
                role: Role::User,
                content: pending.to_string(),
            }))
            .collect()
    }
}
