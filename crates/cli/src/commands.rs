use std::fmt;
use std::io::Write;

use anyhow::{Context, Result};
use lifeos_assistant::providers;
use lifeos_assistant::{Conversation, RelayError};
use lifeos_core::{ApiError, NewTask, ResourceId, Task, TaskStatus};
use lifeos_sync::StoreError;

use crate::cli::{
    AddArgs, ChatArgs, CliCommand, DeleteArgs, RescheduleArgs, SettingsAction, SettingsArgs,
    TaskView,
};
use crate::session::Session;

/// Budgets at or past this share of their amount are flagged in the finance summary.
const BUDGET_ALERT_PERCENT: f64 = 80.0;

pub async fn execute<W: Write>(session: &Session, command: CliCommand, writer: &mut W) -> Result<()> {
    match command {
        CliCommand::Tasks(args) => list_tasks(session, args.view, writer).await,
        CliCommand::Add(args) => add_task(session, args, writer).await,
        CliCommand::Done(args) => {
            session.tasks.load().await?;
            let task = session.tasks.complete(args.id).await?;
            writeln!(writer, "Completed {}", TaskLine(&task))?;
            Ok(())
        }
        CliCommand::Reschedule(args) => reschedule(session, args, writer).await,
        CliCommand::Delete(args) => delete_tasks(session, &args, writer).await,
        CliCommand::Finance => finance_summary(session, writer).await,
        CliCommand::Projects => projects_summary(session, writer).await,
        CliCommand::Journal => journal_summary(session, writer).await,
        CliCommand::Chat(args) => chat(session, args, writer).await,
        CliCommand::Settings(args) => settings(session, args, writer),
    }
}

async fn list_tasks<W: Write>(session: &Session, view: TaskView, writer: &mut W) -> Result<()> {
    session.tasks.load().await.context("failed to load tasks")?;
    let tasks = match view {
        TaskView::All => session.tasks.all(),
        TaskView::Inbox => session.tasks.inbox(),
        TaskView::Todo => session.tasks.todo(),
        TaskView::Done => session.tasks.done(),
    };
    if tasks.is_empty() {
        writeln!(writer, "No tasks")?;
    }
    for task in &tasks {
        writeln!(writer, "{}", TaskLine(task))?;
    }
    Ok(())
}

async fn add_task<W: Write>(session: &Session, args: AddArgs, writer: &mut W) -> Result<()> {
    let mut draft = NewTask::titled(args.title.join(" "));
    if let Some(date) = args.due {
        draft.due_date = Some(date);
        draft.status = draft.status.when_scheduled();
    }
    let task = session.tasks.create(draft).await?;
    writeln!(writer, "Added {}", TaskLine(&task))?;
    Ok(())
}

async fn reschedule<W: Write>(session: &Session, args: RescheduleArgs, writer: &mut W) -> Result<()> {
    session.tasks.load().await?;
    let task = session.tasks.reschedule(args.id, args.date).await?;
    writeln!(writer, "Moved {}", TaskLine(&task))?;
    Ok(())
}

async fn delete_tasks<W: Write>(session: &Session, args: &DeleteArgs, writer: &mut W) -> Result<()> {
    session.tasks.load().await?;
    let mut summary = DeleteSummary::default();
    for &id in &args.ids {
        if session.tasks.get(id).is_none() {
            summary.missing.push(id);
            continue;
        }
        match session.tasks.delete(id).await {
            Ok(()) => summary.deleted += 1,
            Err(StoreError::Api(ApiError::Status { status: 404, .. })) => summary.missing.push(id),
            Err(err) => return Err(err.into()),
        }
    }
    summary.write_to(writer)
}

#[derive(Default)]
struct DeleteSummary {
    deleted: usize,
    missing: Vec<ResourceId>,
}

impl DeleteSummary {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{}", SummaryLine::deleted(self.deleted))?;
        if !self.missing.is_empty() {
            let ids: Vec<String> = self.missing.iter().map(ToString::to_string).collect();
            writeln!(writer, "Not found: {}", ids.join(", "))?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Deleted(usize),
    NoneDeleted,
}

impl SummaryLine {
    fn deleted(count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(count)
        } else {
            SummaryLine::NoneDeleted
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Deleted(count) => {
                write!(
                    f,
                    "Deleted {} task{}",
                    count,
                    if *count == 1 { "" } else { "s" }
                )
            }
            SummaryLine::NoneDeleted => write!(f, "No tasks deleted"),
        }
    }
}

struct TaskLine<'a>(&'a Task);

impl fmt::Display for TaskLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.0;
        let mark = if task.status == TaskStatus::Done { "x" } else { " " };
        write!(f, "[{}] #{} {}", mark, task.id, task.title)?;
        if let Some(date) = task.due_date {
            write!(f, " ({}", date)?;
            if let Some(time) = task.due_time {
                write!(f, " {}", time.format("%H:%M"))?;
            }
            write!(f, ")")?;
        }
        if task.status == TaskStatus::Inbox {
            write!(f, " [inbox]")?;
        }
        Ok(())
    }
}

async fn finance_summary<W: Write>(session: &Session, writer: &mut W) -> Result<()> {
    let finance = &session.finance;
    finance.load().await.context("failed to load finance data")?;

    writeln!(writer, "Balance: {}", finance.balance())?;
    writeln!(
        writer,
        "Income: {}  Expenses: {}",
        finance.total_income(),
        finance.total_expenses()
    )?;

    let alerts: Vec<ResourceId> = finance
        .budget_alerts(BUDGET_ALERT_PERCENT)
        .iter()
        .map(|budget| budget.id)
        .collect();
    let budgets = finance.budgets();
    if !budgets.is_empty() {
        writeln!(writer, "Budgets this month:")?;
    }
    for budget in &budgets {
        let name = budget
            .category_name
            .clone()
            .or_else(|| finance.category_name(budget.category))
            .unwrap_or_else(|| format!("category {}", budget.category));
        let flag = if alerts.contains(&budget.id) { " !" } else { "" };
        writeln!(
            writer,
            "  {}: {} / {} ({:.1}%){}",
            name, budget.spent, budget.amount, budget.percentage, flag
        )?;
    }

    let goals = finance.goals();
    if !goals.is_empty() {
        writeln!(writer, "Savings goals:")?;
    }
    for goal in &goals {
        let done = if goal.is_completed { " done" } else { "" };
        writeln!(
            writer,
            "  {}: {} / {} ({}%){}",
            goal.name,
            goal.current_amount,
            goal.target_amount,
            goal.display_percentage(),
            done
        )?;
    }
    Ok(())
}

async fn projects_summary<W: Write>(session: &Session, writer: &mut W) -> Result<()> {
    session.projects.load().await.context("failed to load projects")?;
    let projects = session.projects.projects();
    if projects.is_empty() {
        writeln!(writer, "No projects")?;
    }
    for project in &projects {
        let stats = &project.stats;
        writeln!(
            writer,
            "#{} {}{}: {}/{} objectives ({:.0}%), {} tasks",
            project.id,
            project.name,
            if project.is_active { "" } else { " (archived)" },
            stats.objectives_completed,
            stats.objectives,
            stats.objective_progress(),
            stats.tasks
        )?;
    }
    Ok(())
}

async fn journal_summary<W: Write>(session: &Session, writer: &mut W) -> Result<()> {
    let journal = &session.journal;
    journal.load().await.context("failed to load journal")?;
    let categories = journal.categories();
    let entries = journal.entries();
    if entries.is_empty() {
        writeln!(writer, "No journal entries")?;
    }
    for entry in &entries {
        write!(writer, "{} {}", entry.date, entry.title)?;
        if let Some(name) = entry
            .category
            .and_then(|id| categories.iter().find(|category| category.id == id))
            .map(|category| category.name.as_str())
        {
            write!(writer, " [{}]", name)?;
        }
        if let Some(mood) = entry.mood {
            write!(writer, " mood {}/5", mood)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

async fn chat<W: Write>(session: &Session, args: ChatArgs, writer: &mut W) -> Result<()> {
    if let Some(key) = args.api_key.as_deref() {
        session.settings.set_api_key(Some(key));
    }
    let mut conversation = Conversation::greeted();
    match session
        .relay
        .send(&mut conversation, &args.message.join(" "))
        .await
    {
        Ok(reply) => {
            writeln!(writer, "{}", reply.response)?;
            if !reply.tools_used.is_empty() {
                writeln!(writer, "tools: {}", reply.tools_used.join(", "))?;
            }
            if !reply.published.is_empty() {
                let topics: Vec<&str> = reply.published.iter().map(|topic| topic.as_str()).collect();
                writeln!(writer, "refreshing: {}", topics.join(", "))?;
            }
            Ok(())
        }
        Err(RelayError::EmptyMessage) => Err(RelayError::EmptyMessage.into()),
        Err(err) => {
            writeln!(writer, "{}", err.display_text())?;
            Ok(())
        }
    }
}

fn settings<W: Write>(session: &Session, args: SettingsArgs, writer: &mut W) -> Result<()> {
    match args.action.unwrap_or(SettingsAction::Show) {
        SettingsAction::Show => {}
        SettingsAction::Provider { id } => session.settings.set_provider(&id)?,
        SettingsAction::Model { id } => session.settings.set_model(&id)?,
    }
    let current = session.settings.current();
    let name = providers::provider(&current.provider)
        .map(|provider| provider.name)
        .unwrap_or(current.provider.as_str());
    writeln!(writer, "Provider: {} ({})", name, current.provider)?;
    writeln!(writer, "Model: {}", current.model)?;
    writeln!(
        writer,
        "API key: {}",
        if current.has_credential() {
            "set for this session"
        } else {
            "not set (pass --api-key or LIFEOS_AI_KEY)"
        }
    )?;
    Ok(())
}
