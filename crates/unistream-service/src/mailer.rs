//! Outbound account email.
//!
//! The service only needs one message: the verification link sent at
//! registration. [`LogMailer`] writes it to the log so local setups work
//! without an SMTP relay.

/// Errors raised while handing a message to the mail transport.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The transport refused the message.
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Delivers account emails.
pub trait Mailer: Send + Sync {
    /// Send the account confirmation link to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the message.
    fn send_verification(&self, to: &str, name: &str, token: &str) -> Result<(), MailError>;
}

/// Mailer that logs each message instead of sending it.
#[derive(Debug, Clone)]
pub struct LogMailer {
    frontend_url: String,
}

impl LogMailer {
    /// Links in logged messages point at `frontend_url`.
    #[must_use]
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            frontend_url: frontend_url.into(),
        }
    }

    /// Confirmation link for `token`.
    #[must_use]
    pub fn verification_link(&self, token: &str) -> String {
        format!(
            "{}/verify?token={token}",
            self.frontend_url.trim_end_matches('/')
        )
    }
}

impl Mailer for LogMailer {
    fn send_verification(&self, to: &str, name: &str, token: &str) -> Result<(), MailError> {
        tracing::info!(
            to = %to,
            name = %name,
            link = %self.verification_link(token),
            "Verification email"
        );
        Ok(())
    }
}

/// Send the confirmation email. Failures are logged, never returned.
pub fn deliver_verification(mailer: &dyn Mailer, to: &str, name: &str, token: &str) {
    if let Err(e) = mailer.send_verification(to, name, token) {
        tracing::warn!(to = %to, error = %e, "Failed to send verification email");
    }
}
