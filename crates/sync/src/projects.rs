use std::collections::HashMap;
use std::sync::Arc;

use lifeos_core::bus::{EventBus, Subscription, Topic};
use lifeos_core::model::{
    DraftError, NewObjective, NewProject, Objective, ObjectivePatch, Project, ProjectPatch,
    ResourceId,
};
use lifeos_core::{ListSource, ResourceClient};
use parking_lot::Mutex;

use crate::collection::{spawn_on, Collection, LoadState, StoreError};
use crate::telemetry;

/// Projects plus their objectives, fetched per project on first use.
///
/// Project `stats` are aggregated by the server, so every objective mutation reloads the
/// project list once it settles.
#[derive(Clone, Debug)]
pub struct ProjectsStore {
    client: ResourceClient,
    telemetry: Arc<telemetry::Handle>,
    projects: Collection<Project>,
    objectives: Arc<Mutex<HashMap<ResourceId, Collection<Objective>>>>,
}

impl ProjectsStore {
    pub fn new(client: ResourceClient) -> Self {
        Self::with_telemetry(client, Arc::new(telemetry::Handle::new()))
    }

    pub fn with_telemetry(client: ResourceClient, telemetry: Arc<telemetry::Handle>) -> Self {
        Self {
            projects: Collection::new(client.clone()).with_telemetry(telemetry.clone()),
            client,
            telemetry,
            objectives: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn projects(&self) -> Vec<Project> {
        self.projects.items()
    }

    pub fn get(&self, id: ResourceId) -> Option<Project> {
        self.projects.get(id)
    }

    pub fn active(&self) -> Vec<Project> {
        self.projects
            .with_items(|items| items.iter().filter(|p| p.is_active).cloned().collect())
    }

    pub fn archived(&self) -> Vec<Project> {
        self.projects
            .with_items(|items| items.iter().filter(|p| !p.is_active).cloned().collect())
    }

    pub fn load_state(&self) -> LoadState {
        self.projects.load_state()
    }

    pub async fn load(&self) -> Result<(), StoreError> {
        self.projects.load().await
    }

    pub async fn create_project(&self, draft: NewProject) -> Result<Project, StoreError> {
        if draft.name.trim().is_empty() {
            return Err(DraftError::EmptyTitle.into());
        }
        self.projects.create(&draft).await
    }

    pub async fn update_project(
        &self,
        id: ResourceId,
        patch: ProjectPatch,
    ) -> Result<Project, StoreError> {
        self.projects.update(id, &patch).await
    }

    pub async fn delete_project(&self, id: ResourceId) -> Result<(), StoreError> {
        self.projects.delete(id).await?;
        self.objectives.lock().remove(&id);
        Ok(())
    }

    /// Objectives already fetched for `project`; empty until [`Self::load_objectives`] ran.
    pub fn objectives(&self, project: ResourceId) -> Vec<Objective> {
        self.objectives
            .lock()
            .get(&project)
            .map(Collection::items)
            .unwrap_or_default()
    }

    pub async fn load_objectives(&self, project: ResourceId) -> Result<Vec<Objective>, StoreError> {
        let collection = self.objective_collection(project);
        collection.load().await?;
        Ok(collection.items())
    }

    pub async fn create_objective(&self, draft: NewObjective) -> Result<Objective, StoreError> {
        if draft.title.trim().is_empty() {
            return Err(DraftError::EmptyTitle.into());
        }
        let created = self.objective_collection(draft.project).create(&draft).await?;
        self.refresh_stats().await;
        Ok(created)
    }

    /// Flip PENDING and COMPLETED.
    pub async fn toggle_objective(&self, objective: &Objective) -> Result<Objective, StoreError> {
        let patch = ObjectivePatch {
            status: Some(objective.status.toggled()),
            ..ObjectivePatch::default()
        };
        let outcome = self
            .objective_collection(objective.project)
            .update(objective.id, &patch)
            .await;
        self.refresh_stats().await;
        outcome
    }

    pub async fn delete_objective(
        &self,
        id: ResourceId,
        project: ResourceId,
    ) -> Result<(), StoreError> {
        let outcome = self.objective_collection(project).delete(id).await;
        self.refresh_stats().await;
        outcome
    }

    /// Reload projects and any objective lists already fetched.
    pub async fn reload_all(&self) {
        self.projects.reconcile().await;
        let loaded: Vec<_> = self.objectives.lock().values().cloned().collect();
        for collection in loaded {
            collection.reconcile().await;
        }
    }

    pub fn attach(&self, bus: &EventBus) -> Vec<Subscription> {
        vec![spawn_on(bus, Topic::ProjectsChanged, self.clone(), |store| async move {
            store.reload_all().await
        })]
    }

    fn objective_collection(&self, project: ResourceId) -> Collection<Objective> {
        self.objectives
            .lock()
            .entry(project)
            .or_insert_with(|| {
                Collection::new(self.client.clone())
                    .with_source(ListSource::filter("project", project))
                    .with_telemetry(self.telemetry.clone())
            })
            .clone()
    }

    async fn refresh_stats(&self) {
        if let Err(err) = self.projects.load().await {
            tracing::warn!(error = %err, "failed to refresh project stats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifeos_core::memory::{settle, Operation};
    use lifeos_core::model::ObjectiveStatus;
    use lifeos_core::{Endpoint, MemoryBackend};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn seeded() -> (ProjectsStore, Arc<MemoryBackend>, ResourceId) {
        let backend = Arc::new(MemoryBackend::new());
        let ids = backend.seed(
            Endpoint::Projects,
            vec![
                json!({ "name": "Garden", "is_active": true }),
                json!({ "name": "Old blog", "is_active": false }),
            ],
        );
        (ProjectsStore::new(ResourceClient::new(backend.clone())), backend, ids[0])
    }

    #[tokio::test]
    async fn active_and_archived_split_on_flag() {
        let (projects, _backend, _) = seeded();
        projects.load().await.unwrap();

        let names = |list: Vec<Project>| list.into_iter().map(|p| p.name).collect::<Vec<_>>();
        assert_eq!(names(projects.active()), vec!["Garden"]);
        assert_eq!(names(projects.archived()), vec!["Old blog"]);
    }

    #[tokio::test]
    async fn objectives_load_per_project() {
        let (projects, backend, garden) = seeded();
        backend.seed(
            Endpoint::Objectives,
            vec![
                json!({ "project": garden, "title": "Dig" }),
                json!({ "project": garden + 1, "title": "Write post" }),
            ],
        );
        assert!(projects.objectives(garden).is_empty());

        let loaded = projects.load_objectives(garden).await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(projects.objectives(garden)[0].title, "Dig");
    }

    #[tokio::test]
    async fn objective_mutations_refresh_project_stats() {
        let (projects, _backend, garden) = seeded();
        projects.load().await.unwrap();

        let objective = projects
            .create_objective(NewObjective {
                project: garden,
                title: "Plant tomatoes".into(),
                deadline: None,
            })
            .await
            .unwrap();
        assert_eq!(projects.get(garden).unwrap().stats.objectives, 1);

        let toggled = projects.toggle_objective(&objective).await.unwrap();
        assert_eq!(toggled.status, ObjectiveStatus::Completed);
        assert_eq!(projects.get(garden).unwrap().stats.objectives_completed, 1);

        projects.delete_objective(objective.id, garden).await.unwrap();
        assert!(projects.objectives(garden).is_empty());
        assert_eq!(projects.get(garden).unwrap().stats.objectives, 0);
    }

    #[tokio::test]
    async fn projects_changed_reloads_fetched_objectives() {
        let (projects, backend, garden) = seeded();
        projects.load_objectives(garden).await.unwrap();
        let bus = EventBus::new();
        let _guards = projects.attach(&bus);
        backend.seed(
            Endpoint::Objectives,
            vec![json!({ "project": garden, "title": "Added by assistant" })],
        );

        bus.publish(Topic::ProjectsChanged);
        settle().await;

        assert_eq!(backend.calls(Endpoint::Projects, Operation::List), 1);
        assert_eq!(projects.objectives(garden).len(), 1);
    }
}
