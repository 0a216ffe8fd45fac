//! Outbound email.
//!
//! Handlers talk to a [`Mailer`]; production uses [`SendGridMailer`], local
//! development the [`LogMailer`], and tests the [`MemoryMailer`].
mod messages;
mod sendgrid;

use std::sync::Mutex;

use thiserror::Error;

pub use messages::{contact_email, reset_password_email, verification_email};
pub use sendgrid::{SendGridMailer, SendGridMailerBuilder};

/// Errors that can occur while delivering mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Mail provider rejected the message: status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid mailer configuration: {0}")]
    Config(String),

    #[error("Could not build the message: {0}")]
    Message(String),
}

/// A named mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub name: String,
    pub email: String,
}

impl Address {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: Address,
    pub to: Address,
    pub subject: String,
    pub body: String,
}

/// Delivers email.
///
/// Implementations must be shareable across request workers.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        tracing::info!(
            "Email {:?} to {} <{}>:\n{}",
            email.subject,
            email.to.name,
            email.to.email,
            email.body
        );
        Ok(())
    }
}

/// Keeps sent messages in memory, optionally failing every delivery.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
    failing: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails, as if the provider were down.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<Email> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError::Rejected {
                status: 503,
                body: "mailer is failing".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(email.clone());
        Ok(())
    }
}

impl<M: Mailer + ?Sized> Mailer for std::sync::Arc<M> {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        (**self).send(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email {
            from: Address::new("Pathfork App", "app@example.com"),
            to: Address::new("Someone", "someone@example.com"),
            subject: "Hi".to_string(),
            body: "Hello".to_string(),
        }
    }

    #[test]
    fn memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        mailer.send(&email()).unwrap();

        assert_eq!(mailer.sent(), vec![email()]);
    }

    #[test]
    fn failing_mailer_sends_nothing() {
        let mailer = MemoryMailer::failing();

        assert!(matches!(
            mailer.send(&email()),
            Err(MailError::Rejected { status: 503, .. })
        ));
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn log_mailer_always_succeeds() {
        assert!(LogMailer.send(&email()).is_ok());
    }
}
