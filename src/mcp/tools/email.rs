//! Email sending tool and the shared SMTP outbox.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use super::{map_join_error, non_blank};
use crate::dispatch::{Arguments, ParamSpec, ToolDescriptor, ToolError, ToolOutcome, ToolSet};
use crate::upstream::mail::parse_mailbox;
use crate::upstream::{MailError, Mailer, OutgoingMail};

/// A configured mailer and its sender address, or the settings that are
/// missing for one.
pub struct Outbox<M: Mailer> {
    inner: Result<(Arc<M>, String), Vec<&'static str>>,
}

impl<M: Mailer + 'static> Outbox<M> {
    pub fn new(mailer: M, sender: impl Into<String>) -> Self {
        Self {
            inner: Ok((Arc::new(mailer), sender.into())),
        }
    }

    pub fn unconfigured(missing: Vec<&'static str>) -> Self {
        Self {
            inner: Err(missing),
        }
    }

    pub fn missing(&self) -> &[&'static str] {
        match &self.inner {
            Ok(_) => &[],
            Err(missing) => missing,
        }
    }

    /// Submit one message on the blocking pool.
    pub async fn send(&self, to: &str, subject: &str, body: &str, html: bool) -> ToolOutcome<()> {
        let (mailer, sender) = self
            .inner
            .as_ref()
            .map_err(|missing| ToolError::configuration_missing(missing))?;

        let mail = OutgoingMail {
            from: sender.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            html,
        };
        let mailer = Arc::clone(mailer);
        tokio::task::spawn_blocking(move || mailer.send(&mail))
            .await
            .map_err(map_join_error)?
            .map_err(ToolError::from)
    }
}

pub struct EmailTools<M: Mailer> {
    outbox: Outbox<M>,
    timeout: Duration,
    descriptors: Vec<ToolDescriptor>,
}

impl<M: Mailer + 'static> EmailTools<M> {
    /// Create the email tool set.
    ///
    /// # Arguments
    /// * `outbox` - configured mailer, or the missing SMTP settings
    /// * `timeout` - reported per-call limit; the SMTP socket timeout bounds the send
    ///
    /// # Returns
    /// A tool set exposing `send_email`.
    pub fn new(outbox: Outbox<M>, timeout: Duration) -> Self {
        Self {
            outbox,
            timeout,
            descriptors: descriptors(),
        }
    }

    async fn send_email(&self, args: &Arguments) -> ToolOutcome<Value> {
        let to = non_blank(args, "to")?.trim();
        parse_mailbox(to).map_err(|e| match e {
            MailError::InvalidAddress { message, .. } => ToolError::invalid_parameter("to", message),
            other => other.into(),
        })?;
        let subject = args.required_str("subject")?;
        let body = args.required_str("body")?;

        self.outbox
            .send(to, subject, body, args.bool_or("html", false))
            .await?;

        Ok(json!({ "sent": true, "to": to, "subject": subject }))
    }
}

impl<M: Mailer + 'static> ToolSet for EmailTools<M> {
    fn server_name(&self) -> &'static str {
        "email"
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
            "send_email" => self.send_email(&args).await,
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("send_email", "Send an email through the configured SMTP relay.")
            .param(ParamSpec::string("to").required().describe("Recipient address"))
            .param(ParamSpec::string("subject").required().describe("Subject line"))
            .param(ParamSpec::string("body").required().describe("Message body"))
            .param(
                ParamSpec::boolean("html")
                    .default_bool(false)
                    .describe("Send the body as HTML"),
            ),
    ]
}
