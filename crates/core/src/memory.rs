//! In-memory [`ResourceApi`] that behaves like the REST backend: it assigns ids, computes the
//! server-side aggregates (budget spending, goal progress, project stats) and can be told to
//! fail specific operations. Used by tests across the workspace and by offline sessions.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use crate::api::{Endpoint, ListSource, ResourceApi};
use crate::error::{ApiError, ApiResult};
use crate::model::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Patch,
    Remove,
    Action,
}

#[derive(Default)]
struct MemoryState {
    next_id: ResourceId,
    tables: BTreeMap<Endpoint, Vec<Value>>,
    failures: HashMap<(Endpoint, Operation), ApiError>,
    calls: HashMap<(Endpoint, Operation), usize>,
}

pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    today: NaiveDate,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_today(Utc::now().date_naive())
    }

    /// Pin the date used for "current month" budget queries.
    pub fn with_today(today: NaiveDate) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            today,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Insert records as if they already existed server-side; returns the assigned ids.
    pub fn seed(&self, endpoint: Endpoint, records: Vec<Value>) -> Vec<ResourceId> {
        let mut state = self.state.lock();
        records
            .into_iter()
            .map(|record| insert(&mut state, endpoint, record))
            .collect()
    }

    pub fn records(&self, endpoint: Endpoint) -> Vec<Value> {
        let state = self.state.lock();
        state
            .tables
            .get(&endpoint)
            .map(|rows| rows.iter().map(|row| derive(&state, endpoint, row)).collect())
            .unwrap_or_default()
    }

    pub fn record(&self, endpoint: Endpoint, id: ResourceId) -> Option<Value> {
        self.records(endpoint)
            .into_iter()
            .find(|row| row_id(row) == Some(id))
    }

    /// Every subsequent `op` on `endpoint` fails with `error` until healed.
    pub fn fail(&self, endpoint: Endpoint, op: Operation, error: ApiError) {
        self.state.lock().failures.insert((endpoint, op), error);
    }

    pub fn heal(&self, endpoint: Endpoint, op: Operation) {
        self.state.lock().failures.remove(&(endpoint, op));
    }

    pub fn calls(&self, endpoint: Endpoint, op: Operation) -> usize {
        self.state
            .lock()
            .calls
            .get(&(endpoint, op))
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, endpoint: Endpoint, op: Operation) -> ApiResult<parking_lot::MutexGuard<'_, MemoryState>> {
        let mut state = self.state.lock();
        *state.calls.entry((endpoint, op)).or_insert(0) += 1;
        if let Some(error) = state.failures.get(&(endpoint, op)) {
            return Err(error.clone());
        }
        Ok(state)
    }
}

/// Give spawned reload tasks a chance to run to completion on the current runtime.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn insert(state: &mut MemoryState, endpoint: Endpoint, record: Value) -> ResourceId {
    let mut fields = match record {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let id = match fields.get("id").and_then(Value::as_i64) {
        Some(id) => {
            state.next_id = state.next_id.max(id);
            id
        }
        None => {
            state.next_id += 1;
            state.next_id
        }
    };
    fields.insert("id".into(), json!(id));
    state
        .tables
        .entry(endpoint)
        .or_default()
        .push(Value::Object(fields));
    id
}

fn row_id(row: &Value) -> Option<ResourceId> {
    row.get("id").and_then(Value::as_i64)
}

fn not_found(endpoint: Endpoint, id: ResourceId) -> ApiError {
    ApiError::status(404, format!("No {} record with id {}", endpoint, id))
}

fn decimal(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::String(raw)) => Decimal::from_str(raw).unwrap_or(Decimal::ZERO),
        Some(Value::Number(number)) => Decimal::from_str(&number.to_string()).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

fn date(value: Option<&Value>) -> Option<NaiveDate> {
    value
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

fn field_matches(row: &Value, key: &str, expected: &str) -> bool {
    match row.get(key) {
        Some(Value::String(raw)) => raw == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

fn percentage(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    let pct = (part / whole * Decimal::ONE_HUNDRED)
        .round_dp(1)
        .min(Decimal::ONE_HUNDRED);
    pct.to_f64().unwrap_or(0.0)
}

/// Attach the fields the real backend computes on every read.
fn derive(state: &MemoryState, endpoint: Endpoint, row: &Value) -> Value {
    let mut out = row.clone();
    match endpoint {
        Endpoint::Budgets => {
            let category = row.get("category").cloned().unwrap_or(Value::Null);
            let month = row.get("month").and_then(Value::as_u64);
            let year = row.get("year").and_then(Value::as_i64);
            let spent: Decimal = state
                .tables
                .get(&Endpoint::Transactions)
                .into_iter()
                .flatten()
                .filter(|tx| tx.get("type").and_then(Value::as_str) == Some("EXPENSE"))
                .filter(|tx| tx.get("category") == Some(&category))
                .filter(|tx| {
                    date(tx.get("date")).is_some_and(|d| {
                        Some(u64::from(d.month())) == month && Some(i64::from(d.year())) == year
                    })
                })
                .map(|tx| decimal(tx.get("amount")))
                .sum();
            let amount = decimal(row.get("amount"));
            out["spent"] = json!(spent.to_string());
            out["percentage"] = json!(percentage(spent, amount));
        }
        Endpoint::SavingsGoals => {
            let current = decimal(row.get("current_amount"));
            let target = decimal(row.get("target_amount"));
            out["current_amount"] = json!(current.to_string());
            out["percentage"] = json!(percentage(current, target));
            out["is_completed"] = json!(!target.is_zero() && current >= target);
        }
        Endpoint::Projects => {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            let linked = |endpoint: Endpoint| -> Vec<&Value> {
                state
                    .tables
                    .get(&endpoint)
                    .into_iter()
                    .flatten()
                    .filter(|item| item.get("project") == Some(&id))
                    .collect()
            };
            let objectives = linked(Endpoint::Objectives);
            let completed = objectives
                .iter()
                .filter(|o| o.get("status").and_then(Value::as_str) == Some("COMPLETED"))
                .count();
            out["stats"] = json!({
                "tasks": linked(Endpoint::Tasks).len(),
                "transactions": linked(Endpoint::Transactions).len(),
                "entries": linked(Endpoint::Entries).len(),
                "objectives": objectives.len(),
                "objectives_completed": completed,
            });
        }
        _ => {}
    }
    out
}

#[async_trait]
impl ResourceApi for MemoryBackend {
    async fn list(&self, endpoint: Endpoint, source: &ListSource) -> ApiResult<Vec<Value>> {
        let state = self.enter(endpoint, Operation::List)?;
        let rows = state.tables.get(&endpoint).cloned().unwrap_or_default();
        let today = self.today;
        let selected = rows.into_iter().filter(|row| match source {
            ListSource::All => true,
            ListSource::Filter { key, value } => field_matches(row, key, value),
            ListSource::Action("current_month") => {
                row.get("month").and_then(Value::as_u64) == Some(u64::from(today.month()))
                    && row.get("year").and_then(Value::as_i64) == Some(i64::from(today.year()))
            }
            ListSource::Action(_) => false,
        });
        Ok(selected.map(|row| derive(&state, endpoint, &row)).collect())
    }

    async fn create(&self, endpoint: Endpoint, fields: Value) -> ApiResult<Value> {
        let mut state = self.enter(endpoint, Operation::Create)?;
        let mut fields = fields;
        if let Some(map) = fields.as_object_mut() {
            map.remove("id");
        }
        let id = insert(&mut state, endpoint, fields);
        let row = state
            .tables
            .get(&endpoint)
            .and_then(|rows| rows.iter().find(|row| row_id(row) == Some(id)))
            .cloned()
            .ok_or_else(|| not_found(endpoint, id))?;
        Ok(derive(&state, endpoint, &row))
    }

    async fn patch(&self, endpoint: Endpoint, id: ResourceId, fields: Value) -> ApiResult<Value> {
        let mut state = self.enter(endpoint, Operation::Patch)?;
        let row = state
            .tables
            .get_mut(&endpoint)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            .ok_or_else(|| not_found(endpoint, id))?;
        if let (Some(target), Value::Object(patch)) = (row.as_object_mut(), fields) {
            for (key, value) in patch {
                if key != "id" {
                    target.insert(key, value);
                }
            }
        }
        let row = row.clone();
        Ok(derive(&state, endpoint, &row))
    }

    async fn remove(&self, endpoint: Endpoint, id: ResourceId) -> ApiResult<()> {
        let mut state = self.enter(endpoint, Operation::Remove)?;
        let rows = state.tables.entry(endpoint).or_default();
        let before = rows.len();
        rows.retain(|row| row_id(row) != Some(id));
        if rows.len() == before {
            return Err(not_found(endpoint, id));
        }
        Ok(())
    }

    async fn member_action(
        &self,
        endpoint: Endpoint,
        id: ResourceId,
        action: &str,
        body: Value,
    ) -> ApiResult<Value> {
        let mut state = self.enter(endpoint, Operation::Action)?;
        if endpoint != Endpoint::SavingsGoals || action != "add_funds" {
            return Err(ApiError::status(404, format!("Unknown action '{}'", action)));
        }
        let row = state
            .tables
            .get_mut(&endpoint)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            .ok_or_else(|| not_found(endpoint, id))?;
        let amount = decimal(body.get("amount"));
        if amount <= Decimal::ZERO {
            return Err(ApiError::status(400, "Amount must be positive"));
        }
        let current = decimal(row.get("current_amount")) + amount;
        row["current_amount"] = json!(current.to_string());
        let row = row.clone();
        Ok(derive(&state, endpoint, &row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn may(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let backend = MemoryBackend::with_today(may(10));
        let first = backend
            .create(Endpoint::Tasks, json!({ "title": "a" }))
            .await
            .unwrap();
        let second = backend
            .create(Endpoint::Tasks, json!({ "title": "b", "id": 99 }))
            .await
            .unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
    }

    #[tokio::test]
    async fn budgets_report_current_month_expenses() {
        let backend = MemoryBackend::with_today(may(10));
        backend.seed(
            Endpoint::Budgets,
            vec![
                json!({ "category": 3, "amount": "200", "month": 5, "year": 2024 }),
                json!({ "category": 3, "amount": "200", "month": 4, "year": 2024 }),
            ],
        );
        backend.seed(
            Endpoint::Transactions,
            vec![
                json!({ "title": "food", "amount": "50", "type": "EXPENSE", "date": "2024-05-02", "category": 3 }),
                json!({ "title": "pay", "amount": "900", "type": "INCOME", "date": "2024-05-02", "category": 3 }),
                json!({ "title": "old", "amount": "70", "type": "EXPENSE", "date": "2024-04-02", "category": 3 }),
            ],
        );

        let current = backend
            .list(Endpoint::Budgets, &ListSource::Action("current_month"))
            .await
            .unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0]["spent"], "50");
        assert_eq!(current[0]["percentage"], 25.0);
    }

    #[tokio::test]
    async fn injected_failures_count_calls_and_can_be_healed() {
        let backend = MemoryBackend::new();
        backend.fail(
            Endpoint::Tasks,
            Operation::List,
            ApiError::Transport("offline".into()),
        );
        assert!(backend.list(Endpoint::Tasks, &ListSource::All).await.is_err());
        backend.heal(Endpoint::Tasks, Operation::List);
        assert!(backend.list(Endpoint::Tasks, &ListSource::All).await.is_ok());
        assert_eq!(backend.calls(Endpoint::Tasks, Operation::List), 2);
    }

    #[tokio::test]
    async fn add_funds_updates_progress_and_completion() {
        let backend = MemoryBackend::new();
        let ids = backend.seed(
            Endpoint::SavingsGoals,
            vec![json!({ "name": "Trip", "target_amount": "100", "current_amount": "40" })],
        );
        let goal = backend
            .member_action(Endpoint::SavingsGoals, ids[0], "add_funds", json!({ "amount": "60" }))
            .await
            .unwrap();
        assert_eq!(goal["current_amount"], "100");
        assert_eq!(goal["is_completed"], true);
    }

    #[tokio::test]
    async fn project_stats_follow_linked_records() {
        let backend = MemoryBackend::new();
        let ids = backend.seed(Endpoint::Projects, vec![json!({ "name": "Garden" })]);
        backend.seed(
            Endpoint::Objectives,
            vec![
                json!({ "project": ids[0], "title": "Dig", "status": "COMPLETED" }),
                json!({ "project": ids[0], "title": "Plant", "status": "PENDING" }),
            ],
        );
        let project = backend.record(Endpoint::Projects, ids[0]).unwrap();
        assert_eq!(project["stats"]["objectives"], 2);
        assert_eq!(project["stats"]["objectives_completed"], 1);
    }
}
