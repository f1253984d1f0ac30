//! Best-effort outbound email.
//!
//! Credential operations never wait on mail delivery. They hand an [`Email`]
//! to the [`Notifier`], which queues it on a bounded [`MailDispatcher`]
//! drained by a fixed pool of workers. A full queue drops the message; a
//! failed send is counted and logged. Nothing is retried.

pub mod dispatcher;
pub mod smtp;

pub use dispatcher::{DispatchStats, MailDispatcher};
pub use smtp::{LogMailer, SmtpMailer};

use crate::observability::hash_for_correlation;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Recipient and body are redacted; the body carries a one-time link.
impl fmt::Debug for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Email")
            .field("to", &hash_for_correlation(&self.to))
            .field("subject", &self.subject)
            .field("body", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Builds the activation and password-reset messages.
#[derive(Debug, Clone)]
pub struct MailTemplates {
    activation_url: String,
    reset_url: String,
}

impl MailTemplates {
    pub fn new(activation_url: impl Into<String>, reset_url: impl Into<String>) -> Self {
        Self {
            activation_url: activation_url.into(),
            reset_url: reset_url.into(),
        }
    }

    pub fn activation(&self, to: &str, token: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: "Activation link".to_string(),
            body: format!("Your activation link: {}{}", self.activation_url, token),
        }
    }

    pub fn password_reset(&self, to: &str, token: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: "Change password".to_string(),
            body: format!("Your change password link: {}{}", self.reset_url, token),
        }
    }
}

/// Fire-and-forget front door used by the credential service.
#[derive(Clone)]
pub struct Notifier {
    dispatcher: MailDispatcher,
    templates: MailTemplates,
}

impl Notifier {
    pub fn new(dispatcher: MailDispatcher, templates: MailTemplates) -> Self {
        Self {
            dispatcher,
            templates,
        }
    }

    pub fn send_activation(&self, to: &str, token: &str) {
        self.dispatcher.enqueue(self.templates.activation(to, token));
    }

    pub fn send_password_reset(&self, to: &str, token: &str) {
        self.dispatcher
            .enqueue(self.templates.password_reset(to, token));
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.dispatcher.stats()
    }
}

/// Mailer test doubles.
pub mod mock {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Records every message it is asked to send.
    pub struct RecordingMailer {
        sent: Mutex<Vec<Email>>,
        fail: bool,
    }

    impl RecordingMailer {
        /// A mailer whose sends always succeed.
        pub fn accepting() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        /// A mailer that records the attempt and then fails it.
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub async fn sent(&self) -> Vec<Email> {
            self.sent.lock().await.clone()
        }

        /// Wait until at least `count` messages were attempted or `timeout`
        /// passes, then return what was recorded.
        pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Email> {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let sent = self.sent().await;
                if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &Email) -> Result<(), MailError> {
            self.sent.lock().await.push(email.clone());
            if self.fail {
                return Err(MailError::Transport("mock transport failure".to_string()));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_templates() {
        let templates = MailTemplates::new(
            "https://app.example.com/activate/",
            "https://app.example.com/reset/",
        );

        let activation = templates.activation("alice@x.com", "abc");
        assert_eq!(activation.to, "alice@x.com");
        assert_eq!(activation.subject, "Activation link");
        assert_eq!(
            activation.body,
            "Your activation link: https://app.example.com/activate/abc"
        );

        let reset = templates.password_reset("alice@x.com", "xyz");
        assert_eq!(reset.subject, "Change password");
        assert_eq!(
            reset.body,
            "Your change password link: https://app.example.com/reset/xyz"
        );
    }

    #[test]
    fn test_email_debug_redacts_body_and_recipient() {
        let email = MailTemplates::new("u/", "r/").activation("alice@x.com", "secret-token");
        let rendered = format!("{:?}", email);
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("alice@x.com"));
    }
}
