use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::Endpoint;

/// Server-assigned identifier shared by every resource.
pub type ResourceId = i64;

/// A server resource cached by a domain store.
///
/// `Draft` is the body sent on creation (the server assigns the id) and `Patch`
/// is a partial update whose unset fields are skipped on serialization, so that
/// overlaying it on a record yields `{...record, ...patch}`.
pub trait Resource: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    type Draft: Serialize + Send + Sync;
    type Patch: Serialize + Send + Sync;

    const ENDPOINT: Endpoint;

    /// Newly created records are shown first (transactions, journal entries).
    const NEWEST_FIRST: bool = false;

    fn id(&self) -> ResourceId;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    #[default]
    Inbox,
    Todo,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Inbox => "INBOX",
            TaskStatus::Todo => "TODO",
            TaskStatus::Done => "DONE",
        }
    }

    /// A task cannot be scheduled and remain in the inbox.
    pub fn when_scheduled(self) -> Self {
        match self {
            TaskStatus::Inbox => TaskStatus::Todo,
            other => other,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inbox" => Ok(TaskStatus::Inbox),
            "todo" | "to-do" => Ok(TaskStatus::Todo),
            "done" => Ok(TaskStatus::Done),
            other => Err(anyhow!(
                "Unknown status '{}': expected inbox|todo|done",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: ResourceId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_time: Option<NaiveTime>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub project: Option<ResourceId>,
    #[serde(default)]
    pub energy_level: Option<u8>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Unscheduled and not finished.
    pub fn is_in_inbox(&self) -> bool {
        self.due_date.is_none() && self.status != TaskStatus::Done
    }
}

impl Resource for Task {
    type Draft = NewTask;
    type Patch = TaskPatch;

    const ENDPOINT: Endpoint = Endpoint::Tasks;

    fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ResourceId>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn require_title(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        Ok(())
    }
}

/// Partial task update. `Some(None)` on a nullable field clears it.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_time: Option<Option<NaiveTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Option<ResourceId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<Option<u8>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn schedule(date: NaiveDate, status: TaskStatus) -> Self {
        Self {
            due_date: Some(Some(date)),
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(anyhow!(
                "Unknown transaction type '{}': expected income|expense",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: ResourceId,
    pub title: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: Option<ResourceId>,
    #[serde(default)]
    pub project: Option<ResourceId>,
}

impl Resource for Transaction {
    type Draft = NewTransaction;
    type Patch = TransactionPatch;

    const ENDPOINT: Endpoint = Endpoint::Transactions;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewTransaction {
    pub title: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ResourceId>,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        if self.amount <= Decimal::ZERO {
            return Err(DraftError::NonPositiveAmount);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct TransactionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<ResourceId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinanceCategory {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
}

impl Resource for FinanceCategory {
    type Draft = NewCategory;
    type Patch = CategoryPatch;

    const ENDPOINT: Endpoint = Endpoint::FinanceCategories;

    fn id(&self) -> ResourceId {
        self.id
    }
}

/// Creation body shared by finance and journal categories.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct NewCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub id: ResourceId,
    pub category: ResourceId,
    #[serde(default)]
    pub category_name: Option<String>,
    pub amount: Decimal,
    pub month: u32,
    pub year: i32,
    /// Computed by the server from current-period expenses; never summed locally.
    #[serde(default)]
    pub spent: Decimal,
    #[serde(default)]
    pub percentage: f64,
}

impl Resource for Budget {
    type Draft = NewBudget;
    type Patch = BudgetPatch;

    const ENDPOINT: Endpoint = Endpoint::Budgets;

    fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewBudget {
    pub category: ResourceId,
    pub amount: Decimal,
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct BudgetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingsGoal {
    pub id: ResourceId,
    pub name: String,
    pub target_amount: Decimal,
    #[serde(default)]
    pub current_amount: Decimal,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub percentage: f64,
}

impl SavingsGoal {
    /// Progress towards the target, clamped to 100 for display.
    pub fn display_percentage(&self) -> Decimal {
        if self.target_amount.is_zero() {
            return Decimal::ZERO;
        }
        let pct = self.current_amount / self.target_amount * Decimal::ONE_HUNDRED;
        pct.min(Decimal::ONE_HUNDRED).round_dp(1)
    }
}

impl Resource for SavingsGoal {
    type Draft = NewSavingsGoal;
    type Patch = SavingsGoalPatch;

    const ENDPOINT: Endpoint = Endpoint::SavingsGoals;

    fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewSavingsGoal {
    pub name: String,
    pub target_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct SavingsGoalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProjectStats {
    #[serde(default)]
    pub tasks: u32,
    #[serde(default)]
    pub transactions: u32,
    #[serde(default)]
    pub entries: u32,
    #[serde(default)]
    pub objectives: u32,
    #[serde(default)]
    pub objectives_completed: u32,
}

impl ProjectStats {
    pub fn objective_progress(&self) -> f64 {
        if self.objectives == 0 {
            return 0.0;
        }
        f64::from(self.objectives_completed) / f64::from(self.objectives) * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Aggregated server-side; refreshed by reloading projects.
    #[serde(default)]
    pub stats: ProjectStats,
}

fn default_true() -> bool {
    true
}

impl Resource for Project {
    type Draft = NewProject;
    type Patch = ProjectPatch;

    const ENDPOINT: Endpoint = Endpoint::Projects;

    fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct NewProject {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectiveStatus {
    #[default]
    Pending,
    Completed,
}

impl ObjectiveStatus {
    pub fn toggled(self) -> Self {
        match self {
            ObjectiveStatus::Pending => ObjectiveStatus::Completed,
            ObjectiveStatus::Completed => ObjectiveStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Objective {
    pub id: ResourceId,
    pub project: ResourceId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: ObjectiveStatus,
}

impl Resource for Objective {
    type Draft = NewObjective;
    type Patch = ObjectivePatch;

    const ENDPOINT: Endpoint = Endpoint::Objectives;

    fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewObjective {
    pub project: ResourceId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct ObjectivePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ObjectiveStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: ResourceId,
    #[serde(default)]
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: Option<ResourceId>,
    #[serde(default)]
    pub project: Option<ResourceId>,
    #[serde(default)]
    pub mood: Option<u8>,
    #[serde(default)]
    pub energy: Option<u8>,
}

impl Resource for JournalEntry {
    type Draft = NewEntry;
    type Patch = EntryPatch;

    const ENDPOINT: Endpoint = Endpoint::Entries;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewEntry {
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<ResourceId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Option<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalCategory {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl Resource for JournalCategory {
    type Draft = NewCategory;
    type Patch = CategoryPatch;

    const ENDPOINT: Endpoint = Endpoint::JournalCategories;

    fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    EmptyTitle,
    NonPositiveAmount,
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftError::EmptyTitle => write!(f, "Title cannot be empty"),
            DraftError::NonPositiveAmount => write!(f, "Amount must be positive"),
        }
    }
}

impl std::error::Error for DraftError {}
