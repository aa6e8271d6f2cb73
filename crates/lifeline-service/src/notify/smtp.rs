//! SMTP-backed notifier.
//!
//! Uses connection pooling for efficient batch sending.

use futures::future::BoxFuture;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};

use lifeline_core::config::SmtpConfig;

use super::{EmailMessage, Notifier, NotifyError, NotifyResult};

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// ## Summary
    /// Creates a pooled SMTP notifier from the configured relay.
    ///
    /// ## Errors
    /// Returns an error if the relay host cannot be resolved into a
    /// transport.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifyError::Send(e.to_string()))?
            .port(config.port)
            .credentials(creds)
            .build();

        tracing::info!(
            host = %config.host,
            port = config.port,
            from = %config.from_address,
            "Created SMTP notifier"
        );

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    fn build_message(&self, email: &EmailMessage) -> Result<Message, NotifyError> {
        let from = self
            .from_address
            .parse()
            .map_err(|e| NotifyError::InvalidAddress(format!("From: {e}")))?;
        let to = email
            .to
            .parse()
            .map_err(|e| NotifyError::InvalidAddress(format!("To '{}': {e}", email.to)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| NotifyError::Send(e.to_string()))
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, NotifyResult> {
        Box::pin(async move {
            let built = self.build_message(&message)?;

            self.transport
                .send(built)
                .await
                .map_err(|e| NotifyError::Send(e.to_string()))?;

            tracing::info!(to = %message.to, subject = %message.subject, "Email sent successfully");
            Ok(())
        })
    }
}
