/// An LLM provider the chat backend can route to, with the models offered for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    pub id: &'static str,
    pub name: &'static str,
    pub key_hint: &'static str,
    /// First entry is the provider's default.
    pub models: &'static [&'static str],
}

pub const DEFAULT_PROVIDER: &str = "groq";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

pub const PROVIDERS: &[Provider] = &[
    Provider {
        id: "groq",
        name: "Groq",
        key_hint: "gsk_...",
        models: &[
            "llama-3.1-8b-instant",
            "llama-3.3-70b-versatile",
            "mixtral-8x7b-32768",
            "gemma2-9b-it",
        ],
    },
    Provider {
        id: "openai",
        name: "OpenAI",
        key_hint: "sk-...",
        models: &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"],
    },
    Provider {
        id: "anthropic",
        name: "Anthropic",
        key_hint: "sk-ant-...",
        models: &[
            "claude-3-5-sonnet-20241022",
            "claude-3-opus-20240229",
            "claude-3-haiku-20240307",
        ],
    },
    Provider {
        id: "together",
        name: "Together AI",
        key_hint: "together_...",
        models: &[
            "meta-llama/Llama-3-70b-chat-hf",
            "mistralai/Mixtral-8x7B-Instruct-v0.1",
            "Qwen/Qwen2-72B-Instruct",
        ],
    },
    Provider {
        id: "openrouter",
        name: "OpenRouter",
        key_hint: "sk-or-...",
        models: &[
            "anthropic/claude-3.5-sonnet",
            "openai/gpt-4o",
            "google/gemini-pro-1.5",
            "mistralai/mistral-large",
        ],
    },
];

pub fn provider(id: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|provider| provider.id == id)
}

pub fn default_model(provider_id: &str) -> Option<&'static str> {
    provider(provider_id).and_then(|provider| provider.models.first().copied())
}
