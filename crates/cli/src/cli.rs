use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use lifeos_core::model::ResourceId;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lifeos",
    version,
    about = "Tasks, finance, projects and journal from the terminal, with an assistant that can change them.",
    after_help = "Examples:\n  lifeos tasks --view inbox\n  lifeos add Call the bank --due 2024-05-01\n  lifeos reschedule 12 2024-05-03\n  lifeos chat \"add a $50 grocery expense\" --api-key gsk_...\n  lifeos --offline finance"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Backend base URL (defaults to $LIFEOS_API_URL or http://127.0.0.1:8000/api)
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Tracing filter directive, e.g. "info" or "lifeos_sync=debug"
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    /// Use an in-memory backend seeded with sample data instead of the REST API
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List tasks
    Tasks(TasksArgs),
    /// Create a task
    Add(AddArgs),
    /// Mark a task as done
    Done(IdArgs),
    /// Move a task onto a calendar date
    Reschedule(RescheduleArgs),
    /// Delete one or more tasks by id
    Delete(DeleteArgs),
    /// Show balance, budgets and savings goals
    Finance,
    /// Show projects and objective progress
    Projects,
    /// Show journal entries, newest first
    Journal,
    /// Send a message to the assistant
    Chat(ChatArgs),
    /// Inspect or change assistant settings
    Settings(SettingsArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskView {
    #[default]
    All,
    Inbox,
    Todo,
    Done,
}

#[derive(Args, Debug, Clone)]
pub struct TasksArgs {
    #[arg(long, value_enum, default_value_t = TaskView::All)]
    pub view: TaskView,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title
    #[arg(value_name = "TITLE", required = true)]
    pub title: Vec<String>,

    /// Schedule the task (YYYY-MM-DD); scheduled tasks skip the inbox
    #[arg(long = "due", value_name = "DATE")]
    pub due: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    #[arg(value_name = "ID")]
    pub id: ResourceId,
}

#[derive(Args, Debug, Clone)]
pub struct RescheduleArgs {
    #[arg(value_name = "ID")]
    pub id: ResourceId,

    /// Target date (YYYY-MM-DD)
    #[arg(value_name = "DATE")]
    pub date: NaiveDate,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<ResourceId>,
}

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    #[arg(value_name = "MESSAGE", required = true)]
    pub message: Vec<String>,

    /// Provider credential for this session only; never written to disk
    #[arg(long, env = "LIFEOS_AI_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: Option<SettingsAction>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Print the current provider and model (default)
    Show,
    /// Switch provider; the model resets to the provider's default
    Provider { id: String },
    /// Pick a model for the current provider
    Model { id: String },
}
