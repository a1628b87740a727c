//! Todoist task creation through its email-to-task gateway.
//!
//! Todoist parses the subject line of an incoming message: `<date …>` sets
//! the due date, `@name` adds a label, `p1`..`p3` sets the priority and
//! `+First\ Last` assigns the task.

use std::time::Duration;

use serde_json::{Value, json};

use super::email::Outbox;
use super::non_blank;
use crate::config::TODOIST_EMAIL;
use crate::dispatch::{Arguments, ParamSpec, ToolDescriptor, ToolError, ToolOutcome, ToolSet};
use crate::upstream::Mailer;

/// Label attached to every task created here.
const SOURCE_LABEL: &str = "MCP";
const PRIORITIES: &[&str] = &["p1", "p2", "p3", ""];

/// Fields that end up in the subject line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRequest<'a> {
    pub title: &'a str,
    pub date: &'a str,
    pub priority: &'a str,
    pub labels: &'a [String],
    pub assignee: &'a str,
}

/// Build the gateway subject line for a task.
pub fn encode_subject(task: &TaskRequest<'_>) -> String {
    let mut parts = vec![task.title.trim().to_string()];

    let date = task.date.trim();
    if !date.is_empty() {
        parts.push(format!("<date {date}>"));
    }

    let labels = std::iter::once(SOURCE_LABEL).chain(task.labels.iter().map(String::as_str));
    for label in labels.map(str::trim).filter(|l| !l.is_empty()) {
        if label.starts_with('@') {
            parts.push(label.to_string());
        } else {
            parts.push(format!("@{label}"));
        }
    }

    if !task.priority.is_empty() {
        parts.push(task.priority.to_string());
    }

    let assignee = task.assignee.trim();
    if !assignee.is_empty() {
        let escaped = assignee.replace(' ', "\\ ");
        if escaped.starts_with('+') {
            parts.push(escaped);
        } else {
            parts.push(format!("+{escaped}"));
        }
    }

    parts.join(" ")
}

pub struct TodoistTools<M: Mailer> {
    outbox: Outbox<M>,
    gateway: Option<String>,
    timeout: Duration,
    descriptors: Vec<ToolDescriptor>,
}

impl<M: Mailer + 'static> TodoistTools<M> {
    /// Create the Todoist tool set.
    ///
    /// # Arguments
    /// * `outbox` - mailer used to reach the gateway
    /// * `gateway` - the project's Todoist email address
    /// * `timeout` - reported per-call limit
    ///
    /// # Returns
    /// A tool set exposing `create_todoist_task`.
    pub fn new(outbox: Outbox<M>, gateway: Option<String>, timeout: Duration) -> Self {
        Self {
            outbox,
            gateway,
            timeout,
            descriptors: descriptors(),
        }
    }

    async fn create_task(&self, args: &Arguments) -> ToolOutcome<Value> {
        let task = TaskRequest {
            title: non_blank(args, "title")?,
            date: args.str_or_empty("date"),
            priority: args.str_or_empty("priority"),
            labels: args.strings("labels"),
            assignee: args.str_or_empty("assignee"),
        };
        let subject = encode_subject(&task);

        let mut missing = self.outbox.missing().to_vec();
        if self.gateway.is_none() {
            missing.push(TODOIST_EMAIL);
        }
        let Some(gateway) = self.gateway.as_deref().filter(|_| missing.is_empty()) else {
            return Err(ToolError::configuration_missing(&missing));
        };

        self.outbox
            .send(gateway, &subject, args.str_or_empty("description"), false)
            .await?;

        Ok(json!({
            "created": true,
            "title": task.title.trim(),
            "subject": subject,
        }))
    }
}

impl<M: Mailer + 'static> ToolSet for TodoistTools<M> {
    fn server_name(&self) -> &'static str {
        "todoist"
    }

    fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn cancel_safe(&self) -> bool {
        false
    }

    async fn call(&self, tool: &'static str, args: Arguments) -> ToolOutcome<Value> {
        match tool {
            "create_todoist_task" => self.create_task(&args).await,
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "create_todoist_task",
            "Create a Todoist task by email. Supports due dates, labels, priority and assignee.",
        )
        .param(ParamSpec::string("title").required().describe("Task title"))
        .param(
            ParamSpec::string("description")
                .default_str("")
                .describe("Task description, sent as the email body"),
        )
        .param(ParamSpec::string("date").default_str("").describe(
            "Due date in natural language (e.g. 'tomorrow', 'next Monday', 'every other day')",
        ))
        .param(
            ParamSpec::string("priority")
                .default_str("")
                .one_of(PRIORITIES)
                .describe("p1 (highest), p2 or p3"),
        )
        .param(ParamSpec::string_array("labels").describe("Extra labels; @MCP is always added"))
        .param(
            ParamSpec::string("assignee")
                .default_str("")
                .describe("Assignee full name for shared projects"),
        ),
    ]
}
