//! Outbound notification contract.
//!
//! One explicit interface, injected wherever mail leaves the system: the
//! tracker engine (unblock notices), account flows (verification codes),
//! and the call coordinators (request alerts, confirmation links).
//! Notification failures are the caller's to log; state changes are never
//! rolled back because an email did not go out.

pub mod log;
pub mod smtp;
pub mod templates;

use futures::future::BoxFuture;
use thiserror::Error;

/// A fully rendered outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Send failed: {0}")]
    Send(String),
}

pub type NotifyResult = std::result::Result<(), NotifyError>;

pub trait Notifier: Send + Sync {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, NotifyResult>;
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, NotifyResult> {
        (**self).send(message)
    }
}
