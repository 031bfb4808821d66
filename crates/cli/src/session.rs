//! One wired-up client session: the event bus, the four domain stores subscribed to it, and
//! the assistant relay publishing on it.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use lifeos_assistant::{AssistantRelay, ChatApi, HttpChatClient, SettingsStore};
use lifeos_core::bus::{EventBus, Subscription};
use lifeos_core::{AppConfig, Endpoint, HttpResourceApi, MemoryBackend, ResourceApi, ResourceClient};
use lifeos_sync::telemetry;
use lifeos_sync::{FinanceStore, JournalStore, ProjectsStore, TasksStore};
use serde_json::json;

pub struct Session {
    pub bus: EventBus,
    pub tasks: TasksStore,
    pub finance: FinanceStore,
    pub projects: ProjectsStore,
    pub journal: JournalStore,
    pub settings: SettingsStore,
    pub relay: AssistantRelay,
    pub telemetry: Arc<telemetry::Handle>,
    _subscriptions: Vec<Subscription>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Talk to the REST backend named by `config`.
    pub fn connect(config: &AppConfig) -> Result<Self> {
        let api = HttpResourceApi::new(config).context("failed to build HTTP client")?;
        let chat = HttpChatClient::new(config).context("failed to build chat client")?;
        Ok(Self::assemble(config, Arc::new(api), Arc::new(chat)))
    }

    /// Resources live in memory, seeded with sample data. Chat still goes to the backend.
    pub fn offline(config: &AppConfig) -> Result<Self> {
        let backend = Arc::new(MemoryBackend::new());
        seed_sample_data(&backend);
        let chat = HttpChatClient::new(config).context("failed to build chat client")?;
        Ok(Self::assemble(config, backend, Arc::new(chat)))
    }

    pub fn assemble(config: &AppConfig, api: Arc<dyn ResourceApi>, chat: Arc<dyn ChatApi>) -> Self {
        let bus = EventBus::new();
        let client = ResourceClient::new(api);
        let telemetry = Arc::new(telemetry::Handle::new());

        let tasks = TasksStore::new(client.clone()).with_telemetry(telemetry.clone());
        let finance = FinanceStore::with_telemetry(client.clone(), telemetry.clone());
        let projects = ProjectsStore::with_telemetry(client.clone(), telemetry.clone());
        let journal = JournalStore::with_telemetry(client, telemetry.clone());

        let mut subscriptions = tasks.attach(&bus);
        subscriptions.extend(finance.attach(&bus));
        subscriptions.extend(projects.attach(&bus));
        subscriptions.extend(journal.attach(&bus));

        let settings = SettingsStore::open(config.settings_path());
        let relay = AssistantRelay::new(chat, bus.clone(), &settings);

        Self {
            bus,
            tasks,
            finance,
            projects,
            journal,
            settings,
            relay,
            telemetry,
            _subscriptions: subscriptions,
        }
    }
}

fn seed_sample_data(backend: &MemoryBackend) {
    let today = backend.today();
    let day = |offset: i64| (today + Duration::days(offset)).format("%Y-%m-%d").to_string();
    let month_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
    let in_month = |offset: i64| {
        (month_start + Duration::days(offset))
            .format("%Y-%m-%d")
            .to_string()
    };

    let projects = backend.seed(
        Endpoint::Projects,
        vec![
            json!({ "name": "Home garden", "color": "#4caf50", "is_active": true }),
            json!({ "name": "Old blog", "color": "#9e9e9e", "is_active": false }),
        ],
    );
    let garden = projects[0];
    backend.seed(
        Endpoint::Objectives,
        vec![
            json!({ "project": garden, "title": "Build raised beds", "status": "COMPLETED" }),
            json!({ "project": garden, "title": "Plant tomatoes", "status": "PENDING" }),
        ],
    );
    backend.seed(
        Endpoint::Tasks,
        vec![
            json!({ "title": "Review weekly budget", "status": "INBOX" }),
            json!({ "title": "Call the bank", "status": "TODO", "due_date": day(0), "due_time": "09:30:00" }),
            json!({ "title": "Buy soil", "status": "TODO", "due_date": day(1), "project": garden }),
            json!({ "title": "Renew passport", "status": "DONE", "due_date": day(-2) }),
        ],
    );

    let categories = backend.seed(
        Endpoint::FinanceCategories,
        vec![
            json!({ "name": "Groceries", "color": "#ff9800" }),
            json!({ "name": "Salary", "color": "#2196f3" }),
        ],
    );
    backend.seed(
        Endpoint::Transactions,
        vec![
            json!({ "title": "Paycheck", "amount": "2400.00", "type": "INCOME", "date": in_month(0), "category": categories[1] }),
            json!({ "title": "Market", "amount": "86.40", "type": "EXPENSE", "date": in_month(1), "category": categories[0] }),
        ],
    );
    backend.seed(
        Endpoint::Budgets,
        vec![json!({
            "category": categories[0],
            "category_name": "Groceries",
            "amount": "300.00",
            "month": today.month(),
            "year": today.year(),
        })],
    );
    backend.seed(
        Endpoint::SavingsGoals,
        vec![json!({ "name": "Emergency fund", "target_amount": "1000.00", "current_amount": "250.00" })],
    );

    let journal = backend.seed(Endpoint::JournalCategories, vec![json!({ "name": "Reflection" })]);
    backend.seed(
        Endpoint::Entries,
        vec![json!({
            "title": "Fresh start",
            "content": "Set up the garden project and a grocery budget.",
            "date": day(-1),
            "category": journal[0],
            "mood": 4,
        })],
    );
    tracing::info!(today = %today, "seeded offline sample data");
}
