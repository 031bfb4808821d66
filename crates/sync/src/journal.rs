use std::sync::Arc;

use lifeos_core::bus::{EventBus, Subscription, Topic};
use lifeos_core::model::{
    DraftError, EntryPatch, JournalCategory, JournalEntry, NewCategory, NewEntry, ResourceId,
};
use lifeos_core::ResourceClient;

use crate::collection::{spawn_on, Collection, LoadState, StoreError};
use crate::telemetry;

#[derive(Clone, Debug)]
pub struct JournalStore {
    entries: Collection<JournalEntry>,
    categories: Collection<JournalCategory>,
}

impl JournalStore {
    pub fn new(client: ResourceClient) -> Self {
        Self::with_telemetry(client, Arc::new(telemetry::Handle::new()))
    }

    pub fn with_telemetry(client: ResourceClient, telemetry: Arc<telemetry::Handle>) -> Self {
        Self {
            entries: Collection::new(client.clone()).with_telemetry(telemetry.clone()),
            categories: Collection::new(client).with_telemetry(telemetry),
        }
    }

    /// Newest first.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.items()
    }

    pub fn categories(&self) -> Vec<JournalCategory> {
        self.categories.items()
    }

    pub fn entries_in(&self, category: ResourceId) -> Vec<JournalEntry> {
        self.entries.with_items(|items| {
            items
                .iter()
                .filter(|entry| entry.category == Some(category))
                .cloned()
                .collect()
        })
    }

    pub fn load_state(&self) -> LoadState {
        match (self.entries.load_state(), self.categories.load_state()) {
            (LoadState::Error(message), _) | (_, LoadState::Error(message)) => {
                LoadState::Error(message)
            }
            (LoadState::Loading, _) | (_, LoadState::Loading) => LoadState::Loading,
            _ => LoadState::Idle,
        }
    }

    /// Entries and categories are replaced together or not at all.
    pub async fn load(&self) -> Result<(), StoreError> {
        let tickets = (self.entries.begin_load(), self.categories.begin_load());
        let (entries, categories) = tokio::join!(self.entries.fetch(), self.categories.fetch());
        match (entries, categories) {
            (Ok(entries), Ok(categories)) => {
                self.entries.finish_load(tickets.0, Ok(entries))?;
                self.categories.finish_load(tickets.1, Ok(categories))
            }
            (Err(err), _) | (_, Err(err)) => {
                self.entries.fail_load(tickets.0, &err);
                self.categories.fail_load(tickets.1, &err);
                Err(err.into())
            }
        }
    }

    pub async fn create_entry(&self, draft: NewEntry) -> Result<JournalEntry, StoreError> {
        if draft.content.trim().is_empty() {
            return Err(DraftError::EmptyTitle.into());
        }
        self.entries.create(&draft).await
    }

    pub async fn update_entry(
        &self,
        id: ResourceId,
        patch: EntryPatch,
    ) -> Result<JournalEntry, StoreError> {
        self.entries.update(id, &patch).await
    }

    pub async fn delete_entry(&self, id: ResourceId) -> Result<(), StoreError> {
        self.entries.delete(id).await
    }

    pub async fn create_category(&self, name: &str) -> Result<JournalCategory, StoreError> {
        if name.trim().is_empty() {
            return Err(DraftError::EmptyTitle.into());
        }
        let draft = NewCategory {
            name: name.trim().to_string(),
            color: None,
        };
        self.categories.create(&draft).await
    }

    pub async fn delete_category(&self, id: ResourceId) -> Result<(), StoreError> {
        self.categories.delete(id).await
    }

    pub fn attach(&self, bus: &EventBus) -> Vec<Subscription> {
        vec![spawn_on(bus, Topic::JournalChanged, self.clone(), |store| async move {
            if let Err(err) = store.load().await {
                tracing::warn!(error = %err, "journal reload failed");
            }
        })]
    }
}
