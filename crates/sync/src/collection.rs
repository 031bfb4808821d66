//! Generic domain store: one in-memory collection mirroring a server endpoint.
//!
//! Every operation that can overwrite the collection takes a ticket from a per-store
//! sequence. A load response is applied only if nothing newer has been applied. A settled
//! update or delete counts as applied at its own ticket, so a load issued before it is dropped
//! when it lands late, and an update's server response is dropped once a load issued after it
//! has landed. Records with a delete in flight are kept out of every load.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use lifeos_core::bus::{EventBus, Subscription, Topic};
use lifeos_core::error::ApiError;
use lifeos_core::model::{DraftError, Resource, ResourceId};
use lifeos_core::{ListSource, ResourceClient};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

use crate::telemetry::{self, Event as TelemetryEvent};

/// What a store does with local state after a generic `update`/`delete` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcilePolicy {
    /// Reload from the server so local state matches the authority again.
    #[default]
    Reload,
    /// Leave the optimistic change in place and only surface the error.
    KeepOptimistic,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Error(String),
}

impl LoadState {
    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Failed to apply local change: {0}")]
    Codec(#[from] serde_json::Error),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error("No {collection} record with id {id}")]
    Missing {
        collection: &'static str,
        id: ResourceId,
    },
}

impl StoreError {
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Api(err) if err.is_transport())
    }
}

struct CollectionState<R> {
    items: Vec<R>,
    load: LoadState,
    issued: u64,
    applied: u64,
    latest_load: u64,
    version: u64,
    pending: usize,
    deleting: HashSet<ResourceId>,
}

impl<R> Default for CollectionState<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            load: LoadState::Idle,
            issued: 0,
            applied: 0,
            latest_load: 0,
            version: 0,
            pending: 0,
            deleting: HashSet::new(),
        }
    }
}

pub struct Collection<R: Resource> {
    client: ResourceClient,
    source: ListSource,
    policy: ReconcilePolicy,
    telemetry: Arc<telemetry::Handle>,
    state: Arc<Mutex<CollectionState<R>>>,
}

impl<R: Resource> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            source: self.source.clone(),
            policy: self.policy,
            telemetry: self.telemetry.clone(),
            state: self.state.clone(),
        }
    }
}

impl<R: Resource> std::fmt::Debug for Collection<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Collection")
            .field("endpoint", &R::ENDPOINT)
            .field("items", &state.items.len())
            .field("load", &state.load)
            .field("version", &state.version)
            .finish()
    }
}

impl<R: Resource> Collection<R> {
    pub fn new(client: ResourceClient) -> Self {
        Self {
            client,
            source: ListSource::All,
            policy: ReconcilePolicy::default(),
            telemetry: Arc::new(telemetry::Handle::new()),
            state: Arc::new(Mutex::new(CollectionState::default())),
        }
    }

    pub fn with_source(mut self, source: ListSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<telemetry::Handle>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn label(&self) -> &'static str {
        R::ENDPOINT.path()
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn items(&self) -> Vec<R> {
        self.state.lock().items.clone()
    }

    pub fn with_items<T>(&self, f: impl FnOnce(&[R]) -> T) -> T {
        f(&self.state.lock().items)
    }

    pub fn get(&self, id: ResourceId) -> Option<R> {
        self.state
            .lock()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load_state(&self) -> LoadState {
        self.state.lock().load.clone()
    }

    /// Bumped on every local change; lets callers cheaply detect that a redraw is due.
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Mutations whose persisting request has not settled yet.
    pub fn pending(&self) -> usize {
        self.state.lock().pending
    }

    /// Replace the collection with the server's list. On failure the previous items stay
    /// and the load state records the error.
    pub async fn load(&self) -> Result<(), StoreError> {
        let ticket = self.begin_load();
        let result = self.fetch().await;
        self.finish_load(ticket, result)
    }

    /// Reload and log instead of returning the error; used after failed mutations and
    /// from bus handlers where nobody is waiting on the result.
    pub async fn reconcile(&self) {
        if let Err(err) = self.load().await {
            tracing::warn!(collection = self.label(), error = %err, "reconciling reload failed");
        }
    }

    /// The server assigns the id, so the record is only added once creation succeeds.
    pub async fn create(&self, draft: &R::Draft) -> Result<R, StoreError> {
        match self.client.create::<R>(draft).await {
            Ok(created) => {
                self.insert_local(created.clone());
                self.record_applied("create");
                Ok(created)
            }
            Err(err) => {
                self.record_failed("create", &err);
                Err(err.into())
            }
        }
    }

    /// Optimistically overlay `patch` on the local record, persist it, then adopt the
    /// server's canonical record. Failure handling follows the store's [`ReconcilePolicy`].
    pub async fn update(&self, id: ResourceId, patch: &R::Patch) -> Result<R, StoreError> {
        let outcome = self.persist_update(id, patch).await;
        if outcome.is_err() && self.policy == ReconcilePolicy::Reload {
            self.reconcile().await;
        }
        outcome
    }

    /// Optimistic update without any failure reconciliation; callers decide what follows.
    pub async fn persist_update(&self, id: ResourceId, patch: &R::Patch) -> Result<R, StoreError> {
        let ticket = self.apply_local(id, patch)?;
        let result = self.client.patch::<R>(id, patch).await;
        self.settle_update(id, ticket, result)
    }

    /// Removes the record immediately, then persists the removal.
    pub async fn delete(&self, id: ResourceId) -> Result<(), StoreError> {
        let ticket = self.begin_delete(id);
        let result = self.client.remove::<R>(id).await;
        let outcome = self.settle_delete(id, ticket, result);
        if outcome.is_err() && self.policy == ReconcilePolicy::Reload {
            self.reconcile().await;
        }
        outcome
    }

    /// `POST <endpoint>/<id>/<action>/` and adopt the returned record.
    pub async fn member_action(
        &self,
        id: ResourceId,
        action: &'static str,
        body: Value,
    ) -> Result<R, StoreError> {
        match self.client.member_action::<R>(id, action, body).await {
            Ok(updated) => {
                self.replace_local(updated.clone());
                self.record_applied(action);
                Ok(updated)
            }
            Err(err) => {
                self.record_failed(action, &err);
                Err(err.into())
            }
        }
    }

    /// Reload whenever `topic` is published on the bus, for as long as the guard lives.
    pub fn reload_on(&self, bus: &EventBus, topic: Topic) -> Subscription {
        spawn_on(bus, topic, self.clone(), |store| async move {
            store.reconcile().await
        })
    }

    pub(crate) async fn fetch(&self) -> Result<Vec<R>, ApiError> {
        self.client.list::<R>(&self.source).await
    }

    pub(crate) fn begin_load(&self) -> u64 {
        let mut state = self.state.lock();
        state.issued += 1;
        state.latest_load = state.issued;
        state.load = LoadState::Loading;
        self.telemetry
            .record(TelemetryEvent::LoadRequested(self.label().into()));
        state.issued
    }

    pub(crate) fn finish_load(
        &self,
        ticket: u64,
        result: Result<Vec<R>, ApiError>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match result {
            Ok(items) => {
                if ticket <= state.applied {
                    tracing::debug!(collection = self.label(), ticket, "dropping stale load");
                    if ticket == state.latest_load {
                        state.load = LoadState::Idle;
                    }
                    self.telemetry
                        .record(TelemetryEvent::StaleDiscarded(self.label().into()));
                    return Ok(());
                }
                let deleting = &state.deleting;
                let items: Vec<R> = dedup_by_id(items)
                    .into_iter()
                    .filter(|item| !deleting.contains(&item.id()))
                    .collect();
                let count = items.len();
                state.items = items;
                state.applied = ticket;
                state.load = LoadState::Idle;
                state.version = state.version.wrapping_add(1);
                self.telemetry.record(TelemetryEvent::LoadCompleted {
                    collection: self.label().into(),
                    count,
                });
                Ok(())
            }
            Err(err) => {
                drop(state);
                self.fail_load(ticket, &err);
                Err(err.into())
            }
        }
    }

    /// Record a failed load without touching the items.
    pub(crate) fn fail_load(&self, ticket: u64, err: &ApiError) {
        let mut state = self.state.lock();
        if ticket > state.applied {
            state.load = LoadState::Error(err.to_string());
        } else if ticket == state.latest_load {
            state.load = LoadState::Idle;
        }
        self.telemetry.record(TelemetryEvent::LoadFailed {
            collection: self.label().into(),
            error: err.to_string(),
        });
    }

    /// Overlay `patch` on the cached record and return the mutation's ticket.
    pub(crate) fn apply_local(&self, id: ResourceId, patch: &R::Patch) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        if let Some(position) = state.items.iter().position(|item| item.id() == id) {
            let merged = merge_patch(&state.items[position], patch)?;
            state.items[position] = merged;
            state.version = state.version.wrapping_add(1);
        }
        state.issued += 1;
        state.pending += 1;
        Ok(state.issued)
    }

    pub(crate) fn settle_update(
        &self,
        id: ResourceId,
        ticket: u64,
        result: Result<R, ApiError>,
    ) -> Result<R, StoreError> {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);
        match result {
            Ok(canonical) => {
                if ticket > state.applied {
                    if let Some(slot) = state.items.iter_mut().find(|item| item.id() == id) {
                        *slot = canonical.clone();
                        state.version = state.version.wrapping_add(1);
                    }
                    state.applied = ticket;
                } else {
                    tracing::debug!(collection = self.label(), id, "newer load superseded update");
                    self.telemetry
                        .record(TelemetryEvent::StaleDiscarded(self.label().into()));
                }
                self.record_applied("update");
                Ok(canonical)
            }
            Err(err) => {
                self.record_failed("update", &err);
                Err(err.into())
            }
        }
    }

    /// Drop the record locally and keep it out of loads until the removal settles.
    pub(crate) fn begin_delete(&self, id: ResourceId) -> u64 {
        let mut state = self.state.lock();
        state.items.retain(|item| item.id() != id);
        state.deleting.insert(id);
        state.version = state.version.wrapping_add(1);
        state.pending += 1;
        state.issued += 1;
        state.issued
    }

    pub(crate) fn settle_delete(
        &self,
        id: ResourceId,
        ticket: u64,
        result: Result<(), ApiError>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);
        state.deleting.remove(&id);
        match result {
            Ok(()) => {
                state.applied = state.applied.max(ticket);
                drop(state);
                self.record_applied("delete");
                Ok(())
            }
            Err(err) => {
                drop(state);
                self.record_failed("delete", &err);
                Err(err.into())
            }
        }
    }

    /// Add a record, replacing one with the same id if a reload already brought it in.
    pub(crate) fn insert_local(&self, record: R) {
        let mut state = self.state.lock();
        if let Some(slot) = state.items.iter_mut().find(|item| item.id() == record.id()) {
            *slot = record;
        } else if R::NEWEST_FIRST {
            state.items.insert(0, record);
        } else {
            state.items.push(record);
        }
        state.version = state.version.wrapping_add(1);
    }

    pub(crate) fn replace_local(&self, record: R) {
        let mut state = self.state.lock();
        if let Some(slot) = state.items.iter_mut().find(|item| item.id() == record.id()) {
            *slot = record;
            state.version = state.version.wrapping_add(1);
        }
    }

    fn record_applied(&self, action: &'static str) {
        self.telemetry.record(TelemetryEvent::MutationApplied {
            collection: self.label().into(),
            action,
        });
    }

    fn record_failed(&self, action: &'static str, err: &ApiError) {
        tracing::warn!(collection = self.label(), action, error = %err, "store mutation failed");
        self.telemetry.record(TelemetryEvent::MutationFailed {
            collection: self.label().into(),
            action,
            error: err.to_string(),
        });
    }
}

/// `{...record, ...patch}` through the serde representation.
fn merge_patch<R: Resource>(record: &R, patch: &R::Patch) -> Result<R, serde_json::Error> {
    let mut base = serde_json::to_value(record)?;
    if let (Value::Object(target), Value::Object(changes)) = (&mut base, serde_json::to_value(patch)?)
    {
        for (key, value) in changes {
            target.insert(key, value);
        }
    }
    serde_json::from_value(base)
}

fn dedup_by_id<R: Resource>(items: Vec<R>) -> Vec<R> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id()))
        .collect()
}

/// Subscribe `reload(store)` to `topic`, running it on the ambient tokio runtime.
pub(crate) fn spawn_on<S, F, Fut>(bus: &EventBus, topic: Topic, store: S, reload: F) -> Subscription
where
    S: Clone + Send + Sync + 'static,
    F: Fn(S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    bus.scoped(topic, move |_| match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(reload(store.clone()));
        }
        Err(_) => {
            tracing::warn!(topic = topic.as_str(), "no async runtime; reload skipped");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lifeos_core::memory::{settle, Operation};
    use lifeos_core::model::{NewTask, Task, TaskPatch, TaskStatus};
    use lifeos_core::{Endpoint, MemoryBackend};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store_with(
        records: Vec<Value>,
        policy: ReconcilePolicy,
    ) -> (Collection<Task>, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(Endpoint::Tasks, records);
        let client = ResourceClient::new(backend.clone());
        (Collection::new(client).with_policy(policy), backend)
    }

    fn task(id: ResourceId, title: &str) -> Task {
        serde_json::from_value(json!({ "id": id, "title": title })).unwrap()
    }

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn load_replaces_collection_wholesale() {
        let (store, _backend) = store_with(
            vec![json!({ "title": "one" }), json!({ "title": "two" })],
            ReconcilePolicy::Reload,
        );
        store.load().await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.load_state(), LoadState::Idle);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_items() {
        let (store, backend) = store_with(vec![json!({ "title": "one" })], ReconcilePolicy::Reload);
        store.load().await.unwrap();
        backend.fail(
            Endpoint::Tasks,
            Operation::List,
            ApiError::Transport("offline".into()),
        );

        assert!(store.load().await.is_err());
        assert_eq!(store.len(), 1);
        assert!(store.load_state().error().is_some());
    }

    #[tokio::test]
    async fn create_appends_only_after_success() {
        let (store, backend) = store_with(vec![], ReconcilePolicy::Reload);
        backend.fail(
            Endpoint::Tasks,
            Operation::Create,
            ApiError::status(400, "title required"),
        );
        assert!(store.create(&NewTask::titled("x")).await.is_err());
        assert!(store.is_empty());

        backend.heal(Endpoint::Tasks, Operation::Create);
        let created = store.create(&NewTask::titled("x")).await.unwrap();
        assert_eq!(store.items(), vec![created]);
    }

    #[tokio::test]
    async fn update_adopts_server_record() {
        let (store, backend) = store_with(vec![json!({ "title": "draft" })], ReconcilePolicy::Reload);
        store.load().await.unwrap();
        let patch = TaskPatch {
            title: Some("final".into()),
            ..TaskPatch::default()
        };
        let updated = store.update(1, &patch).await.unwrap();

        assert_eq!(updated.title, "final");
        assert_eq!(store.get(1).unwrap().title, "final");
        assert_eq!(backend.record(Endpoint::Tasks, 1).unwrap()["title"], "final");
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn failed_update_keeps_optimistic_value_when_asked() {
        let (store, backend) = store_with(
            vec![json!({ "title": "t", "status": "INBOX" })],
            ReconcilePolicy::KeepOptimistic,
        );
        store.load().await.unwrap();
        backend.fail(
            Endpoint::Tasks,
            Operation::Patch,
            ApiError::Transport("offline".into()),
        );

        let patch = TaskPatch::schedule(may_first(), TaskStatus::Todo);
        assert!(store.update(1, &patch).await.is_err());

        let local = store.get(1).unwrap();
        assert_eq!(local.due_date, Some(may_first()));
        assert_eq!(local.status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn failed_update_reloads_under_default_policy() {
        let (store, backend) = store_with(
            vec![json!({ "title": "t", "status": "INBOX" })],
            ReconcilePolicy::Reload,
        );
        store.load().await.unwrap();
        backend.fail(
            Endpoint::Tasks,
            Operation::Patch,
            ApiError::Transport("offline".into()),
        );

        let patch = TaskPatch::schedule(may_first(), TaskStatus::Todo);
        assert!(store.update(1, &patch).await.is_err());

        let local = store.get(1).unwrap();
        assert_eq!(local.due_date, None);
        assert_eq!(local.status, TaskStatus::Inbox);
    }

    #[tokio::test]
    async fn delete_removes_only_the_matching_record() {
        let (store, _backend) = store_with(
            vec![
                json!({ "title": "c" }),
                json!({ "title": "a" }),
                json!({ "title": "b" }),
            ],
            ReconcilePolicy::Reload,
        );
        store.load().await.unwrap();
        store.delete(2).await.unwrap();

        let ids: Vec<_> = store.items().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn failed_delete_is_restored_by_reload() {
        let (store, backend) = store_with(vec![json!({ "title": "keep" })], ReconcilePolicy::Reload);
        store.load().await.unwrap();
        backend.fail(
            Endpoint::Tasks,
            Operation::Remove,
            ApiError::status(500, "boom"),
        );

        assert!(store.delete(1).await.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_stays_removed_when_keeping_optimistic_state() {
        let (store, backend) =
            store_with(vec![json!({ "title": "gone" })], ReconcilePolicy::KeepOptimistic);
        store.load().await.unwrap();
        backend.fail(
            Endpoint::Tasks,
            Operation::Remove,
            ApiError::status(500, "boom"),
        );

        assert!(store.delete(1).await.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn older_load_never_overwrites_newer_one() {
        let (store, _backend) = store_with(vec![], ReconcilePolicy::Reload);
        let older = store.begin_load();
        let newer = store.begin_load();

        store.finish_load(newer, Ok(vec![task(1, "fresh")])).unwrap();
        store.finish_load(older, Ok(vec![task(1, "stale")])).unwrap();

        assert_eq!(store.get(1).unwrap().title, "fresh");
        assert_eq!(store.load_state(), LoadState::Idle);
    }

    #[test]
    fn update_response_is_dropped_after_newer_load() {
        let (store, _backend) = store_with(vec![], ReconcilePolicy::Reload);
        let ticket = store.begin_load();
        store.finish_load(ticket, Ok(vec![task(1, "original")])).unwrap();

        let patch = TaskPatch {
            title: Some("mine".into()),
            ..TaskPatch::default()
        };
        let update_ticket = store.apply_local(1, &patch).unwrap();
        assert_eq!(store.get(1).unwrap().title, "mine");

        let reload = store.begin_load();
        store.finish_load(reload, Ok(vec![task(1, "assistant")])).unwrap();
        store
            .settle_update(1, update_ticket, Ok(task(1, "mine")))
            .unwrap();

        assert_eq!(store.get(1).unwrap().title, "assistant");
    }

    #[test]
    fn load_issued_before_a_settled_update_is_dropped() {
        let (store, _backend) = store_with(vec![], ReconcilePolicy::Reload);
        let ticket = store.begin_load();
        store.finish_load(ticket, Ok(vec![task(1, "original")])).unwrap();

        let early_reload = store.begin_load();
        let patch = TaskPatch {
            title: Some("mine".into()),
            ..TaskPatch::default()
        };
        let update_ticket = store.apply_local(1, &patch).unwrap();
        store
            .settle_update(1, update_ticket, Ok(task(1, "mine")))
            .unwrap();
        store
            .finish_load(early_reload, Ok(vec![task(1, "original")]))
            .unwrap();

        assert_eq!(store.get(1).unwrap().title, "mine");
        assert_eq!(store.load_state(), LoadState::Idle);
    }

    #[test]
    fn in_flight_load_cannot_resurrect_a_deleted_record() {
        let (store, _backend) = store_with(vec![], ReconcilePolicy::Reload);
        let ticket = store.begin_load();
        store
            .finish_load(ticket, Ok(vec![task(1, "keep"), task(2, "drop")]))
            .unwrap();

        let early_reload = store.begin_load();
        let delete_ticket = store.begin_delete(2);
        store
            .finish_load(early_reload, Ok(vec![task(1, "keep"), task(2, "drop")]))
            .unwrap();
        assert_eq!(store.len(), 1);

        let late_reload = store.begin_load();
        store.settle_delete(2, delete_ticket, Ok(())).unwrap();
        store
            .finish_load(late_reload, Ok(vec![task(1, "keep")]))
            .unwrap();

        let ids: Vec<_> = store.items().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(store.pending(), 0);
    }

    #[test]
    fn load_settled_after_delete_is_dropped() {
        let (store, _backend) = store_with(vec![], ReconcilePolicy::Reload);
        let ticket = store.begin_load();
        store
            .finish_load(ticket, Ok(vec![task(1, "keep"), task(2, "drop")]))
            .unwrap();

        let early_reload = store.begin_load();
        let delete_ticket = store.begin_delete(2);
        store.settle_delete(2, delete_ticket, Ok(())).unwrap();
        store
            .finish_load(early_reload, Ok(vec![task(1, "keep"), task(2, "drop")]))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get(2).is_none());
    }

    #[test]
    fn load_with_repeated_ids_keeps_the_first() {
        let (store, _backend) = store_with(vec![], ReconcilePolicy::Reload);
        let ticket = store.begin_load();
        store
            .finish_load(
                ticket,
                Ok(vec![task(7, "first"), task(8, "other"), task(7, "second")]),
            )
            .unwrap();

        let titles: Vec<_> = store.items().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["first", "other"]);
    }

    #[test]
    fn create_never_duplicates_an_id_already_loaded() {
        let (store, _backend) = store_with(vec![], ReconcilePolicy::Reload);
        let ticket = store.begin_load();
        store.finish_load(ticket, Ok(vec![task(4, "via reload")])).unwrap();

        store.insert_local(task(4, "via create"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(4).unwrap().title, "via create");
    }

    #[tokio::test]
    async fn bus_topic_triggers_reload() {
        let (store, backend) = store_with(vec![json!({ "title": "one" })], ReconcilePolicy::Reload);
        let bus = EventBus::new();
        let _guard = store.reload_on(&bus, Topic::TasksChanged);

        bus.publish(Topic::TasksChanged);
        settle().await;

        assert_eq!(backend.calls(Endpoint::Tasks, Operation::List), 1);
        assert_eq!(store.len(), 1);
    }
}
