//! Resource client seam: a JSON-level transport trait and a typed facade over it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::model::{Resource, ResourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Tasks,
    Transactions,
    FinanceCategories,
    Budgets,
    SavingsGoals,
    Projects,
    Objectives,
    Entries,
    JournalCategories,
}

impl Endpoint {
    pub const ALL: &'static [Endpoint] = &[
        Endpoint::Tasks,
        Endpoint::Transactions,
        Endpoint::FinanceCategories,
        Endpoint::Budgets,
        Endpoint::SavingsGoals,
        Endpoint::Projects,
        Endpoint::Objectives,
        Endpoint::Entries,
        Endpoint::JournalCategories,
    ];

    /// Path segment under the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Tasks => "tasks",
            Endpoint::Transactions => "transactions",
            Endpoint::FinanceCategories => "finance-categories",
            Endpoint::Budgets => "budgets",
            Endpoint::SavingsGoals => "savings-goals",
            Endpoint::Projects => "projects",
            Endpoint::Objectives => "objectives",
            Endpoint::Entries => "entries",
            Endpoint::JournalCategories => "categories",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Which slice of an endpoint a collection mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    All,
    /// `GET <endpoint>/?<key>=<value>`
    Filter { key: &'static str, value: String },
    /// `GET <endpoint>/<action>/`
    Action(&'static str),
}

impl ListSource {
    pub fn filter(key: &'static str, value: impl ToString) -> Self {
        ListSource::Filter {
            key,
            value: value.to_string(),
        }
    }
}

/// Raw REST operations. Implementations throw [`ApiError`] on any non-success status
/// and treat an empty (204) response as success without a payload.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list(&self, endpoint: Endpoint, source: &ListSource) -> ApiResult<Vec<Value>>;

    async fn create(&self, endpoint: Endpoint, fields: Value) -> ApiResult<Value>;

    async fn patch(&self, endpoint: Endpoint, id: ResourceId, fields: Value) -> ApiResult<Value>;

    async fn remove(&self, endpoint: Endpoint, id: ResourceId) -> ApiResult<()>;

    /// `POST <endpoint>/<id>/<action>/`
    async fn member_action(
        &self,
        endpoint: Endpoint,
        id: ResourceId,
        action: &str,
        body: Value,
    ) -> ApiResult<Value>;
}

/// Typed view over a shared [`ResourceApi`].
#[derive(Clone)]
pub struct ResourceClient {
    api: Arc<dyn ResourceApi>,
}

impl fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClient").finish_non_exhaustive()
    }
}

impl ResourceClient {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        Self { api }
    }

    pub async fn list<R: Resource>(&self, source: &ListSource) -> ApiResult<Vec<R>> {
        let raw = self.api.list(R::ENDPOINT, source).await?;
        raw.into_iter()
            .map(|value| serde_json::from_value(value).map_err(ApiError::from))
            .collect()
    }

    pub async fn create<R: Resource>(&self, draft: &R::Draft) -> ApiResult<R> {
        let body = serde_json::to_value(draft)?;
        let created = self.api.create(R::ENDPOINT, body).await?;
        Ok(serde_json::from_value(created)?)
    }

    pub async fn patch<R: Resource>(&self, id: ResourceId, patch: &R::Patch) -> ApiResult<R> {
        let body = serde_json::to_value(patch)?;
        let updated = self.api.patch(R::ENDPOINT, id, body).await?;
        Ok(serde_json::from_value(updated)?)
    }

    pub async fn remove<R: Resource>(&self, id: ResourceId) -> ApiResult<()> {
        self.api.remove(R::ENDPOINT, id).await
    }

    pub async fn member_action<R: Resource>(
        &self,
        id: ResourceId,
        action: &str,
        body: Value,
    ) -> ApiResult<R> {
        let value = self.api.member_action(R::ENDPOINT, id, action, body).await?;
        Ok(serde_json::from_value(value)?)
    }
}
