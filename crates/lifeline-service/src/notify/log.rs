//! Logging notifier used when SMTP is disabled.
//!
//! Local and development deployments log outbound mail instead of sending
//! it, the same way the upstream deployment logs SMS instead of delivering
//! it.

use futures::future::BoxFuture;

use super::{EmailMessage, Notifier, NotifyResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, NotifyResult> {
        Box::pin(async move {
            tracing::info!(
                to = %message.to,
                subject = %message.subject,
                body = %message.body,
                "Email logged (not sent)"
            );
            Ok(())
        })
    }
}
