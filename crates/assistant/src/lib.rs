//! Chat assistant integration: sends user text to the tool-calling backend and invalidates
//! the domain stores whose data the executed tools touched.

pub mod chat;
pub mod conversation;
pub mod providers;
pub mod relay;
pub mod settings;
pub mod tools;

pub use chat::{ChatApi, ChatError, ChatReply, ChatRequest, HttpChatClient};
pub use conversation::{ChatMessage, Conversation, HistoryEntry, Role};
pub use relay::{AssistantRelay, RelayError, RelayReply};
pub use settings::{AssistantSettings, SettingsError, SettingsStore};
