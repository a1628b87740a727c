//! SMTP submission.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use miette::Diagnostic;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::dispatch::ToolError;

#[derive(Error, Diagnostic, Debug)]
pub enum MailError {
    #[error("Invalid address '{address}': {message}")]
    #[diagnostic(code(toolbelt::mail::invalid_address))]
    InvalidAddress { address: String, message: String },

    #[error("Failed to build message: {0}")]
    #[diagnostic(code(toolbelt::mail::build))]
    Build(String),

    #[error("SMTP error: {0}")]
    #[diagnostic(code(toolbelt::mail::smtp))]
    Smtp(String),

    #[error("SMTP connection timed out: {0}")]
    #[diagnostic(code(toolbelt::mail::timeout))]
    Timeout(String),
}

impl MailError {
    /// Classify a transport failure by the I/O error underneath it.
    pub fn from_transport(err: &(dyn StdError + 'static)) -> Self {
        if timed_out(err) {
            MailError::Timeout(err.to_string())
        } else {
            MailError::Smtp(err.to_string())
        }
    }
}

impl From<MailError> for ToolError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Timeout(_) => ToolError::timeout("SMTP submission"),
            other => ToolError::upstream(other.to_string()),
        }
    }
}

/// True if any error in the `source` chain is an I/O timeout. A socket
/// read timeout surfaces as `WouldBlock` on Unix and `TimedOut` elsewhere.
pub fn timed_out(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(io_err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Parse an address the way the SMTP transport will.
pub fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        })
}

/// A message ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub html: bool,
}

impl OutgoingMail {
    pub fn to_message(&self) -> Result<Message, MailError> {
        let content_type = if self.html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };
        Message::builder()
            .from(parse_mailbox(&self.from)?)
            .to(parse_mailbox(&self.to)?)
            .subject(self.subject.clone())
            .header(content_type)
            .body(self.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

/// Sends mail. Blocking; callers run it on the blocking pool.
#[cfg_attr(test, automock)]
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Connection settings for an SMTP relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

/// STARTTLS + login submission through `lettre`.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    /// Build a STARTTLS transport for the relay.
    ///
    /// # Arguments
    /// * `settings` - relay host, port, credentials and the socket timeout
    ///
    /// # Returns
    /// The mailer, or `MailError::Smtp` if the relay host is unusable.
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let transport = SmtpTransport::starttls_relay(&settings.host)
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();
        Ok(Self { transport })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = mail.to_message()?;
        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|e| MailError::from_transport(&e))
    }
}
