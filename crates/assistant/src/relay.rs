//! Bridges chat input to backend tool execution and turns the tools that ran into bus
//! notifications for the affected domains.

use std::sync::Arc;

use lifeos_core::bus::{EventBus, Topic};
use thiserror::Error;
use tokio::sync::watch;

use crate::chat::{ChatApi, ChatError, ChatReply, ChatRequest};
use crate::conversation::{ChatMessage, Conversation};
use crate::settings::{AssistantSettings, SettingsStore};
use crate::tools::affected_topics;

pub const MISSING_CREDENTIAL_TEXT: &str =
    "[ ERROR ] No API key configured. Navigate to Settings to add your credentials.";
pub const UNREACHABLE_TEXT: &str =
    "[ CONNECTION_ERROR ] Server unreachable. Verify backend is running.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("No API key configured")]
    MissingCredential,
    #[error("Chat backend unreachable: {0}")]
    Unreachable(String),
    #[error("{0}")]
    Backend(String),
}

impl RelayError {
    /// Text shown in the conversation for this failure.
    pub fn display_text(&self) -> String {
        match self {
            RelayError::EmptyMessage => String::new(),
            RelayError::MissingCredential => MISSING_CREDENTIAL_TEXT.to_string(),
            RelayError::Unreachable(_) => UNREACHABLE_TEXT.to_string(),
            RelayError::Backend(message) => format!("[ ERROR ] {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReply {
    pub response: String,
    pub tools_used: Vec<String>,
    /// Topics published for this reply, each once.
    pub published: Vec<Topic>,
}

pub struct AssistantRelay {
    chat: Arc<dyn ChatApi>,
    bus: EventBus,
    settings: watch::Receiver<AssistantSettings>,
}

impl std::fmt::Debug for AssistantRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantRelay")
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl AssistantRelay {
    pub fn new(chat: Arc<dyn ChatApi>, bus: EventBus, settings: &SettingsStore) -> Self {
        Self {
            chat,
            bus,
            settings: settings.subscribe(),
        }
    }

    /// Send `text` with the conversation so far, recording the outcome in `conversation`.
    ///
    /// Topics are published only after a successful answer; configuration, transport and
    /// backend failures leave every store untouched.
    pub async fn send(
        &self,
        conversation: &mut Conversation,
        text: &str,
    ) -> Result<RelayReply, RelayError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RelayError::EmptyMessage);
        }
        let settings = self.settings.borrow().clone();
        let Some(api_key) = settings.api_key else {
            tracing::warn!("chat message dropped: no API key configured");
            return Err(record(conversation, RelayError::MissingCredential));
        };

        let request = ChatRequest {
            message: text.to_string(),
            conversation_history: conversation.history_with(text),
            provider: settings.provider,
            api_key,
            model: settings.model,
        };
        conversation.push(ChatMessage::user(text));

        match self.chat.send(&request).await {
            Ok(ChatReply::Answer {
                response,
                tools_used,
            }) => {
                let published = affected_topics(&tools_used);
                conversation.push(ChatMessage::assistant(response.clone(), tools_used.clone()));
                for topic in &published {
                    self.bus.publish(*topic);
                }
                tracing::info!(tools = ?tools_used, topics = ?published, "assistant reply relayed");
                Ok(RelayReply {
                    response,
                    tools_used,
                    published,
                })
            }
            Ok(ChatReply::Failure(message)) => {
                tracing::warn!(error = %message, "assistant backend reported an error");
                Err(record(conversation, RelayError::Backend(message)))
            }
            Err(err) => {
                tracing::warn!(error = %err, "assistant backend unreachable");
                Err(record(conversation, RelayError::Unreachable(err.to_string())))
            }
        }
    }
}

fn record(conversation: &mut Conversation, err: RelayError) -> RelayError {
    conversation.push(ChatMessage::error(err.display_text()));
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lifeos_core::memory::{settle, Operation};
    use lifeos_core::{Endpoint, MemoryBackend, ResourceClient};
    use lifeos_sync::FinanceStore;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct ScriptedChat {
        replies: Mutex<VecDeque<Result<ChatReply, ChatError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedChat {
        fn replying(reply: Result<ChatReply, ChatError>) -> Arc<Self> {
            let chat = Self::default();
            chat.replies.lock().push_back(reply);
            Arc::new(chat)
        }
    }

    #[async_trait]
    impl ChatApi for ScriptedChat {
        async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
            self.requests.lock().push(request.clone());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::Unreachable("no scripted reply".into())))
        }
    }

    fn answer(tools: &[&str]) -> Result<ChatReply, ChatError> {
        Ok(ChatReply::Answer {
            response: "Done.".into(),
            tools_used: tools.iter().map(|tool| tool.to_string()).collect(),
        })
    }

    fn keyed_settings() -> SettingsStore {
        let settings = SettingsStore::ephemeral();
        settings.set_api_key(Some("gsk_test"));
        settings
    }

    fn count(bus: &EventBus, topic: Topic) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        bus.subscribe(topic, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        hits
    }

    #[tokio::test]
    async fn duplicate_tools_publish_each_topic_once() {
        let bus = EventBus::new();
        let tasks = count(&bus, Topic::TasksChanged);
        let finance = count(&bus, Topic::FinanceChanged);
        let journal = count(&bus, Topic::JournalChanged);
        let chat = ScriptedChat::replying(answer(&["create_task", "add_transaction", "create_task"]));
        let relay = AssistantRelay::new(chat, bus, &keyed_settings());
        let mut conversation = Conversation::new();

        let reply = relay.send(&mut conversation, "plan my week").await.unwrap();

        assert_eq!(reply.published, vec![Topic::TasksChanged, Topic::FinanceChanged]);
        assert_eq!(tasks.load(Ordering::SeqCst), 1);
        assert_eq!(finance.load(Ordering::SeqCst), 1);
        assert_eq!(journal.load(Ordering::SeqCst), 0);
        assert_eq!(conversation.last().unwrap().tools.len(), 3);
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        let bus = EventBus::new();
        let tasks = count(&bus, Topic::TasksChanged);
        let chat = ScriptedChat::replying(answer(&["create_task"]));
        let relay = AssistantRelay::new(chat.clone(), bus, &SettingsStore::ephemeral());
        let mut conversation = Conversation::new();

        let err = relay.send(&mut conversation, "add milk").await.unwrap_err();

        assert_eq!(err, RelayError::MissingCredential);
        assert!(chat.requests.lock().is_empty());
        assert_eq!(tasks.load(Ordering::SeqCst), 0);
        let last = conversation.last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.content, MISSING_CREDENTIAL_TEXT);
    }

    #[tokio::test]
    async fn credential_set_later_is_picked_up() {
        let settings = SettingsStore::ephemeral();
        let chat = ScriptedChat::replying(answer(&[]));
        let relay = AssistantRelay::new(chat.clone(), EventBus::new(), &settings);
        let mut conversation = Conversation::new();
        assert!(relay.send(&mut conversation, "hi").await.is_err());

        settings.set_api_key(Some("sk-late"));
        relay.send(&mut conversation, "hi").await.unwrap();

        assert_eq!(chat.requests.lock()[0].api_key, "sk-late");
    }

    #[tokio::test]
    async fn blank_messages_are_rejected_without_a_trace() {
        let relay = AssistantRelay::new(
            ScriptedChat::replying(answer(&[])),
            EventBus::new(),
            &keyed_settings(),
        );
        let mut conversation = Conversation::new();
        assert_eq!(
            relay.send(&mut conversation, "   ").await,
            Err(RelayError::EmptyMessage)
        );
        assert!(conversation.messages().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_publishes_nothing() {
        let bus = EventBus::new();
        let tasks = count(&bus, Topic::TasksChanged);
        let chat = ScriptedChat::replying(Err(ChatError::Unreachable("connection refused".into())));
        let relay = AssistantRelay::new(chat, bus, &keyed_settings());
        let mut conversation = Conversation::new();

        let err = relay.send(&mut conversation, "add milk").await.unwrap_err();

        assert!(matches!(err, RelayError::Unreachable(_)));
        assert_eq!(tasks.load(Ordering::SeqCst), 0);
        assert_eq!(conversation.last().unwrap().content, UNREACHABLE_TEXT);
    }

    #[tokio::test]
    async fn backend_errors_are_shown_verbatim() {
        let bus = EventBus::new();
        let finance = count(&bus, Topic::FinanceChanged);
        let chat = ScriptedChat::replying(Ok(ChatReply::Failure("Invalid amount".into())));
        let relay = AssistantRelay::new(chat, bus, &keyed_settings());
        let mut conversation = Conversation::new();

        let err = relay.send(&mut conversation, "spend -5").await.unwrap_err();

        assert_eq!(err, RelayError::Backend("Invalid amount".into()));
        assert_eq!(finance.load(Ordering::SeqCst), 0);
        assert_eq!(conversation.last().unwrap().content, "[ ERROR ] Invalid amount");
    }

    #[tokio::test]
    async fn history_excludes_earlier_errors() {
        let chat = Arc::new(ScriptedChat::default());
        chat.replies
            .lock()
            .push_back(Err(ChatError::Unreachable("down".into())));
        chat.replies.lock().push_back(answer(&[]));
        let relay = AssistantRelay::new(chat.clone(), EventBus::new(), &keyed_settings());
        let mut conversation = Conversation::greeted();

        let _ = relay.send(&mut conversation, "first").await;
        relay.send(&mut conversation, "second").await.unwrap();

        let requests = chat.requests.lock();
        let contents: Vec<_> = requests[1]
            .conversation_history
            .iter()
            .map(|entry| entry.content.as_str())
            .collect();
        assert_eq!(
            contents,
            vec![crate::conversation::GREETING, "first", "second"]
        );
    }

    #[tokio::test]
    async fn expense_via_chat_reloads_finance_once() {
        let backend = Arc::new(MemoryBackend::new());
        let finance = FinanceStore::new(ResourceClient::new(backend.clone()));
        let bus = EventBus::new();
        let _guards = finance.attach(&bus);
        let chat = ScriptedChat::replying(answer(&["add_transaction"]));
        let relay = AssistantRelay::new(chat, bus, &keyed_settings());
        let mut conversation = Conversation::new();

        backend.seed(
            Endpoint::Transactions,
            vec![serde_json::json!({
                "title": "Groceries", "amount": "50", "type": "EXPENSE", "date": "2024-05-02"
            })],
        );
        relay
            .send(&mut conversation, "add a $50 grocery expense")
            .await
            .unwrap();
        settle().await;

        assert_eq!(backend.calls(Endpoint::Transactions, Operation::List), 1);
        assert_eq!(finance.transactions().len(), 1);
    }
}
