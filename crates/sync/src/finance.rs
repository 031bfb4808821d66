use std::sync::Arc;

use lifeos_core::bus::{EventBus, Subscription, Topic};
use lifeos_core::error::ApiError;
use lifeos_core::model::{
    Budget, DraftError, FinanceCategory, NewBudget, NewCategory, NewSavingsGoal, NewTransaction,
    ResourceId, SavingsGoal, Transaction, TransactionKind,
};
use lifeos_core::{ListSource, ResourceClient};
use rust_decimal::Decimal;
use serde_json::json;

use crate::collection::{spawn_on, Collection, LoadState, StoreError};
use crate::telemetry;

/// Transactions, categories, current-month budgets and savings goals.
///
/// Budget `spent` and goal progress are computed by the server, so any mutation that moves
/// money re-fetches the affected collection instead of adjusting it locally.
#[derive(Clone, Debug)]
pub struct FinanceStore {
    transactions: Collection<Transaction>,
    categories: Collection<FinanceCategory>,
    budgets: Collection<Budget>,
    goals: Collection<SavingsGoal>,
}

impl FinanceStore {
    pub fn new(client: ResourceClient) -> Self {
        Self::with_telemetry(client, Arc::new(telemetry::Handle::new()))
    }

    pub fn with_telemetry(client: ResourceClient, telemetry: Arc<telemetry::Handle>) -> Self {
        Self {
            transactions: Collection::new(client.clone()).with_telemetry(telemetry.clone()),
            categories: Collection::new(client.clone()).with_telemetry(telemetry.clone()),
            budgets: Collection::new(client.clone())
                .with_source(ListSource::Action("current_month"))
                .with_telemetry(telemetry.clone()),
            goals: Collection::new(client).with_telemetry(telemetry),
        }
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.items()
    }

    pub fn categories(&self) -> Vec<FinanceCategory> {
        self.categories.items()
    }

    pub fn budgets(&self) -> Vec<Budget> {
        self.budgets.items()
    }

    pub fn goals(&self) -> Vec<SavingsGoal> {
        self.goals.items()
    }

    /// Combined state of the four collections; any error wins over loading.
    pub fn load_state(&self) -> LoadState {
        let states = [
            self.transactions.load_state(),
            self.categories.load_state(),
            self.budgets.load_state(),
            self.goals.load_state(),
        ];
        if let Some(failed) = states.iter().find(|state| state.error().is_some()) {
            return failed.clone();
        }
        if states.contains(&LoadState::Loading) {
            return LoadState::Loading;
        }
        LoadState::Idle
    }

    /// Fetch all four collections concurrently. Nothing is replaced unless every request
    /// succeeds; otherwise each collection keeps its items and records the first failure.
    pub async fn load(&self) -> Result<(), StoreError> {
        let tickets = (
            self.transactions.begin_load(),
            self.categories.begin_load(),
            self.budgets.begin_load(),
            self.goals.begin_load(),
        );
        let (transactions, categories, budgets, goals) = tokio::join!(
            self.transactions.fetch(),
            self.categories.fetch(),
            self.budgets.fetch(),
            self.goals.fetch(),
        );
        let fetched = (|| Ok::<_, ApiError>((transactions?, categories?, budgets?, goals?)))();
        match fetched {
            Ok((transactions, categories, budgets, goals)) => {
                self.transactions.finish_load(tickets.0, Ok(transactions))?;
                self.categories.finish_load(tickets.1, Ok(categories))?;
                self.budgets.finish_load(tickets.2, Ok(budgets))?;
                self.goals.finish_load(tickets.3, Ok(goals))
            }
            Err(err) => {
                self.transactions.fail_load(tickets.0, &err);
                self.categories.fail_load(tickets.1, &err);
                self.budgets.fail_load(tickets.2, &err);
                self.goals.fail_load(tickets.3, &err);
                Err(err.into())
            }
        }
    }

    pub async fn create_transaction(
        &self,
        draft: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        draft.validate()?;
        let created = self.transactions.create(&draft).await?;
        self.refresh_budgets().await;
        Ok(created)
    }

    pub async fn delete_transaction(&self, id: ResourceId) -> Result<(), StoreError> {
        let outcome = self.transactions.delete(id).await;
        self.refresh_budgets().await;
        outcome
    }

    pub async fn create_category(&self, draft: NewCategory) -> Result<FinanceCategory, StoreError> {
        self.categories.create(&draft).await
    }

    pub async fn create_budget(&self, draft: NewBudget) -> Result<Budget, StoreError> {
        if draft.amount <= Decimal::ZERO {
            return Err(DraftError::NonPositiveAmount.into());
        }
        self.budgets.create(&draft).await
    }

    pub async fn create_goal(&self, draft: NewSavingsGoal) -> Result<SavingsGoal, StoreError> {
        if draft.target_amount <= Decimal::ZERO {
            return Err(DraftError::NonPositiveAmount.into());
        }
        self.goals.create(&draft).await
    }

    pub async fn add_funds(&self, id: ResourceId, amount: Decimal) -> Result<SavingsGoal, StoreError> {
        if amount <= Decimal::ZERO {
            return Err(DraftError::NonPositiveAmount.into());
        }
        self.goals
            .member_action(id, "add_funds", json!({ "amount": amount.to_string() }))
            .await
    }

    pub async fn delete_goal(&self, id: ResourceId) -> Result<(), StoreError> {
        self.goals.delete(id).await
    }

    pub fn total_income(&self) -> Decimal {
        self.total_of(TransactionKind::Income)
    }

    pub fn total_expenses(&self) -> Decimal {
        self.total_of(TransactionKind::Expense)
    }

    pub fn balance(&self) -> Decimal {
        self.total_income() - self.total_expenses()
    }

    fn total_of(&self, kind: TransactionKind) -> Decimal {
        self.transactions.with_items(|items| {
            items
                .iter()
                .filter(|tx| tx.kind == kind)
                .map(|tx| tx.amount)
                .sum()
        })
    }

    /// Budgets whose server-reported usage is at or above `threshold` percent.
    pub fn budget_alerts(&self, threshold: f64) -> Vec<Budget> {
        self.budgets.with_items(|items| {
            items
                .iter()
                .filter(|budget| budget.percentage >= threshold)
                .cloned()
                .collect()
        })
    }

    pub fn category_name(&self, id: ResourceId) -> Option<String> {
        self.categories.get(id).map(|category| category.name)
    }

    pub fn attach(&self, bus: &EventBus) -> Vec<Subscription> {
        vec![spawn_on(bus, Topic::FinanceChanged, self.clone(), |store| async move {
            if let Err(err) = store.load().await {
                tracing::warn!(error = %err, "finance reload failed");
            }
        })]
    }

    async fn refresh_budgets(&self) {
        if let Err(err) = self.budgets.load().await {
            tracing::warn!(error = %err, "failed to refresh budgets after transaction change");
        }
    }
}
