//! Which backend tools invalidate which domain.

use std::collections::HashMap;

use lifeos_core::bus::Topic;
use once_cell::sync::Lazy;

const TASK_TOOLS: &[&str] = &["create_task", "complete_task", "delete_task", "update_task"];
const FINANCE_TOOLS: &[&str] = &[
    "add_transaction",
    "create_savings_goal",
    "add_funds_to_goal",
    "delete_savings_goal",
];
const JOURNAL_TOOLS: &[&str] = &[
    "write_journal_entry",
    "delete_journal_entry",
    "update_journal_entry",
];
const PROJECT_TOOLS: &[&str] = &[
    "create_project",
    "add_project_objective",
    "add_project_objectives_batch",
    "complete_objective",
    "delete_project",
    "delete_objective",
];

static TOOL_TOPICS: Lazy<HashMap<&'static str, Topic>> = Lazy::new(|| {
    [
        (TASK_TOOLS, Topic::TasksChanged),
        (FINANCE_TOOLS, Topic::FinanceChanged),
        (JOURNAL_TOOLS, Topic::JournalChanged),
        (PROJECT_TOOLS, Topic::ProjectsChanged),
    ]
    .into_iter()
    .flat_map(|(tools, topic)| tools.iter().map(move |tool| (*tool, topic)))
    .collect()
});

/// Domain a mutating tool touches. Read-only and unknown tools have none.
pub fn topic_for(tool: &str) -> Option<Topic> {
    TOOL_TOPICS.get(tool).copied()
}

/// Topics to publish for one response: each at most once, in first-seen order.
pub fn affected_topics<S: AsRef<str>>(tools: &[S]) -> Vec<Topic> {
    let mut topics = Vec::new();
    for topic in tools.iter().filter_map(|tool| topic_for(tool.as_ref())) {
        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }
    topics
}
