use std::sync::Arc;

use chrono::NaiveDate;
use lifeos_core::bus::{EventBus, Signal, Subscription, Topic};
use lifeos_core::model::{NewTask, ResourceId, Task, TaskPatch, TaskStatus};
use lifeos_core::ResourceClient;
use parking_lot::Mutex;

use crate::collection::{Collection, LoadState, ReconcilePolicy, StoreError};
use crate::telemetry;

/// Task store plus the view filters the board and calendar read from.
#[derive(Clone, Debug)]
pub struct TasksStore {
    tasks: Collection<Task>,
    editing: Arc<Mutex<Option<Task>>>,
}

impl TasksStore {
    pub fn new(client: ResourceClient) -> Self {
        Self::from_collection(Collection::new(client))
    }

    pub fn from_collection(tasks: Collection<Task>) -> Self {
        Self {
            tasks,
            editing: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_policy(self, policy: ReconcilePolicy) -> Self {
        Self {
            tasks: self.tasks.with_policy(policy),
            ..self
        }
    }

    pub fn with_telemetry(self, telemetry: Arc<telemetry::Handle>) -> Self {
        Self {
            tasks: self.tasks.with_telemetry(telemetry),
            ..self
        }
    }

    pub fn collection(&self) -> &Collection<Task> {
        &self.tasks
    }

    pub fn all(&self) -> Vec<Task> {
        self.tasks.items()
    }

    pub fn get(&self, id: ResourceId) -> Option<Task> {
        self.tasks.get(id)
    }

    pub fn load_state(&self) -> LoadState {
        self.tasks.load_state()
    }

    pub async fn load(&self) -> Result<(), StoreError> {
        self.tasks.load().await
    }

    pub async fn create(&self, draft: NewTask) -> Result<Task, StoreError> {
        draft.require_title()?;
        let task = self.tasks.create(&draft).await?;
        tracing::info!(id = task.id, title = %task.title, "task created");
        Ok(task)
    }

    pub async fn update(&self, id: ResourceId, patch: TaskPatch) -> Result<Task, StoreError> {
        self.tasks.update(id, &patch).await
    }

    pub async fn delete(&self, id: ResourceId) -> Result<(), StoreError> {
        self.tasks.delete(id).await
    }

    pub async fn complete(&self, id: ResourceId) -> Result<Task, StoreError> {
        self.update(id, TaskPatch::status(TaskStatus::Done)).await
    }

    /// Move a task onto `date`. An inbox task becomes TODO; other statuses are kept.
    ///
    /// The optimistic placement is applied before the request goes out and the store is
    /// reloaded afterwards whatever the outcome, so a failed persist leaves the task exactly
    /// as the server last reported it.
    pub async fn reschedule(&self, id: ResourceId, date: NaiveDate) -> Result<Task, StoreError> {
        let current = self.tasks.get(id).ok_or(StoreError::Missing {
            collection: self.tasks.label(),
            id,
        })?;
        let patch = TaskPatch::schedule(date, current.status.when_scheduled());
        tracing::debug!(id, %date, from = %current.status, "rescheduling task");

        let outcome = self.tasks.persist_update(id, &patch).await;
        self.tasks.reconcile().await;
        outcome
    }

    /// Unscheduled, unfinished tasks.
    pub fn inbox(&self) -> Vec<Task> {
        self.filtered(Task::is_in_inbox)
    }

    pub fn todo(&self) -> Vec<Task> {
        self.filtered(|task| task.status == TaskStatus::Todo)
    }

    pub fn done(&self) -> Vec<Task> {
        self.filtered(|task| task.status == TaskStatus::Done)
    }

    /// Calendar cell contents: timed tasks first by time, then the rest by board order.
    pub fn on_date(&self, date: NaiveDate) -> Vec<Task> {
        let mut tasks = self.filtered(|task| task.due_date == Some(date));
        tasks.sort_by(|a, b| {
            a.due_time
                .is_none()
                .cmp(&b.due_time.is_none())
                .then(a.due_time.cmp(&b.due_time))
                .then(a.order.cmp(&b.order))
        });
        tasks
    }

    fn filtered(&self, keep: impl Fn(&Task) -> bool) -> Vec<Task> {
        self.tasks
            .with_items(|items| items.iter().filter(|task| keep(task)).cloned().collect())
    }

    /// Reload on `tasks-changed` and track `edit-task` requests. Drop the guards to detach.
    pub fn attach(&self, bus: &EventBus) -> Vec<Subscription> {
        let editing = self.editing.clone();
        let edit = bus.scoped(Topic::EditTask, move |signal| {
            match signal.payload_as::<Task>() {
                Some(task) => {
                    tracing::debug!(id = task.id, "task opened for editing");
                    *editing.lock() = Some(task);
                }
                None => tracing::warn!("edit-task signal without a task payload"),
            }
        });
        vec![self.tasks.reload_on(bus, Topic::TasksChanged), edit]
    }

    /// Ask whoever renders the editor to open task `id`.
    pub fn request_edit(&self, bus: &EventBus, id: ResourceId) -> Result<(), StoreError> {
        let task = self.tasks.get(id).ok_or(StoreError::Missing {
            collection: self.tasks.label(),
            id,
        })?;
        bus.emit(Signal::with_payload(Topic::EditTask, &task)?);
        Ok(())
    }

    pub fn editing(&self) -> Option<Task> {
        self.editing.lock().clone()
    }

    pub fn clear_editing(&self) {
        self.editing.lock().take();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use lifeos_core::api::{Endpoint, ListSource, ResourceApi};
    use lifeos_core::error::{ApiError, ApiResult};
    use lifeos_core::memory::{settle, Operation};
    use lifeos_core::MemoryBackend;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{json, Value};
    use tokio::sync::Semaphore;

    /// Holds every PATCH until the test releases it, so in-flight state can be inspected.
    pub(crate) struct GatedApi {
        pub(crate) inner: Arc<MemoryBackend>,
        pub(crate) gate: Semaphore,
    }

    impl GatedApi {
        pub(crate) fn new(inner: Arc<MemoryBackend>) -> Arc<Self> {
            Arc::new(Self {
                inner,
                gate: Semaphore::new(0),
            })
        }
    }

    #[async_trait]
    impl ResourceApi for GatedApi {
        async fn list(&self, endpoint: Endpoint, source: &ListSource) -> ApiResult<Vec<Value>> {
            self.inner.list(endpoint, source).await
        }

        async fn create(&self, endpoint: Endpoint, fields: Value) -> ApiResult<Value> {
            self.inner.create(endpoint, fields).await
        }

        async fn patch(&self, endpoint: Endpoint, id: ResourceId, fields: Value) -> ApiResult<Value> {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|err| ApiError::Transport(err.to_string()))?;
            permit.forget();
            self.inner.patch(endpoint, id, fields).await
        }

        async fn remove(&self, endpoint: Endpoint, id: ResourceId) -> ApiResult<()> {
            self.inner.remove(endpoint, id).await
        }

        async fn member_action(
            &self,
            endpoint: Endpoint,
            id: ResourceId,
            action: &str,
            body: Value,
        ) -> ApiResult<Value> {
            self.inner.member_action(endpoint, id, action, body).await
        }
    }

    pub(crate) fn may(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn store(records: Vec<Value>) -> (TasksStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(Endpoint::Tasks, records);
        (TasksStore::new(ResourceClient::new(backend.clone())), backend)
    }

    #[tokio::test]
    async fn views_follow_due_date_and_status() {
        let (tasks, _backend) = store(vec![
            json!({ "title": "inbox", "status": "INBOX" }),
            json!({ "title": "unscheduled todo", "status": "TODO" }),
            json!({ "title": "unscheduled done", "status": "DONE" }),
            json!({ "title": "scheduled", "status": "TODO", "due_date": "2024-05-01" }),
        ]);
        tasks.load().await.unwrap();

        let titles = |list: Vec<Task>| list.into_iter().map(|t| t.title).collect::<Vec<_>>();
        assert_eq!(titles(tasks.inbox()), vec!["inbox", "unscheduled todo"]);
        assert_eq!(titles(tasks.todo()), vec!["unscheduled todo", "scheduled"]);
        assert_eq!(titles(tasks.done()), vec!["unscheduled done"]);
    }

    #[tokio::test]
    async fn calendar_cell_orders_timed_tasks_first() {
        let (tasks, _backend) = store(vec![
            json!({ "title": "untimed", "due_date": "2024-05-01", "order": 0 }),
            json!({ "title": "late", "due_date": "2024-05-01", "due_time": "17:00:00" }),
            json!({ "title": "early", "due_date": "2024-05-01", "due_time": "08:30:00" }),
            json!({ "title": "other day", "due_date": "2024-05-02" }),
        ]);
        tasks.load().await.unwrap();

        let titles: Vec<_> = tasks.on_date(may(1)).into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["early", "late", "untimed"]);
    }

    #[tokio::test]
    async fn empty_titles_never_reach_the_server() {
        let (tasks, backend) = store(vec![]);
        let err = tasks.create(NewTask::titled("  ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Draft(_)));
        assert_eq!(backend.calls(Endpoint::Tasks, Operation::Create), 0);
    }

    #[rstest]
    #[case("INBOX", "TODO")]
    #[case("TODO", "TODO")]
    #[case("DONE", "DONE")]
    #[tokio::test]
    async fn reschedule_only_promotes_inbox_tasks(#[case] from: &str, #[case] to: &str) {
        let (tasks, backend) = store(vec![json!({ "title": "t", "status": from })]);
        tasks.load().await.unwrap();

        let task = tasks.reschedule(1, may(1)).await.unwrap();

        assert_eq!(task.due_date, Some(may(1)));
        assert_eq!(task.status.as_str(), to);
        assert_eq!(tasks.get(1).unwrap(), task);
        assert_eq!(backend.calls(Endpoint::Tasks, Operation::List), 2);
    }

    #[tokio::test]
    async fn failed_reschedule_shows_optimistic_state_then_reverts() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(Endpoint::Tasks, vec![json!({ "title": "t", "status": "INBOX" })]);
        backend.fail(
            Endpoint::Tasks,
            Operation::Patch,
            ApiError::Transport("offline".into()),
        );
        let api = GatedApi::new(backend.clone());
        let tasks = TasksStore::new(ResourceClient::new(api.clone()))
            .with_policy(ReconcilePolicy::KeepOptimistic);
        tasks.load().await.unwrap();

        let pending = tokio::spawn({
            let tasks = tasks.clone();
            async move { tasks.reschedule(1, may(1)).await }
        });
        settle().await;

        let optimistic = tasks.get(1).unwrap();
        assert_eq!(optimistic.due_date, Some(may(1)));
        assert_eq!(optimistic.status, TaskStatus::Todo);
        assert_eq!(tasks.collection().pending(), 1);

        api.gate.add_permits(1);
        assert!(pending.await.unwrap().is_err());

        let reverted = tasks.get(1).unwrap();
        assert_eq!(reverted.due_date, None);
        assert_eq!(reverted.status, TaskStatus::Inbox);
    }

    #[tokio::test]
    async fn reschedule_of_unknown_task_is_rejected() {
        let (tasks, _backend) = store(vec![]);
        let err = tasks.reschedule(42, may(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing { id: 42, .. }));
    }

    #[tokio::test]
    async fn complete_marks_done() {
        let (tasks, backend) = store(vec![json!({ "title": "t", "status": "TODO" })]);
        tasks.load().await.unwrap();
        tasks.complete(1).await.unwrap();
        assert_eq!(tasks.get(1).unwrap().status, TaskStatus::Done);
        assert_eq!(backend.record(Endpoint::Tasks, 1).unwrap()["status"], "DONE");
    }

    #[tokio::test]
    async fn edit_requests_travel_over_the_bus() {
        let (tasks, _backend) = store(vec![json!({ "title": "Write report" })]);
        tasks.load().await.unwrap();
        let bus = EventBus::new();
        let guards = tasks.attach(&bus);

        tasks.request_edit(&bus, 1).unwrap();
        assert_eq!(tasks.editing().map(|t| t.title), Some("Write report".into()));

        tasks.clear_editing();
        drop(guards);
        tasks.request_edit(&bus, 1).unwrap();
        assert!(tasks.editing().is_none());
    }

    #[tokio::test]
    async fn builders_keep_the_editing_slot_shared_with_clones() {
        let (tasks, _backend) = store(vec![json!({ "title": "Write report" })]);
        let handle = tasks.clone();
        let tasks = tasks
            .with_policy(ReconcilePolicy::KeepOptimistic)
            .with_telemetry(Arc::new(telemetry::Handle::new()));
        tasks.load().await.unwrap();
        let bus = EventBus::new();
        let _guards = tasks.attach(&bus);

        tasks.request_edit(&bus, 1).unwrap();

        assert_eq!(handle.editing().map(|t| t.title), Some("Write report".into()));
    }

    #[tokio::test]
    async fn tasks_changed_reloads_from_server() {
        let (tasks, backend) = store(vec![]);
        let bus = EventBus::new();
        let _guards = tasks.attach(&bus);
        backend.seed(Endpoint::Tasks, vec![json!({ "title": "from assistant" })]);

        bus.publish(Topic::TasksChanged);
        settle().await;

        assert_eq!(tasks.all().len(), 1);
    }
}
