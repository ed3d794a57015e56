//! Notification channels
//!
//! Fire-and-forget senders used by the fulfillment dispatcher. Failures
//! map into [`NotifyError`] for the caller to log; nothing here retries
//! or escalates.

pub mod email;
pub mod push;

pub use email::SendGridMailer;
pub use push::OneSignalPusher;

use async_trait::async_trait;
use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notification configuration error: {message}")]
    Configuration { message: String },

    #[error("Network error sending notification: {message}")]
    Network { message: String },

    #[error("Notification service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body_html: &str) -> NotifyResult<()>;
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// Deliver a push notification addressed by the buyer's external
    /// user reference.
    async fn send(&self, user_ref: &str, title: &str, message: &str) -> NotifyResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockMailer;

    #[async_trait]
    impl EmailSender for MockMailer {
        async fn send(&self, _to: &str, _subject: &str, _body_html: &str) -> NotifyResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn trait_can_be_implemented_by_mock_mailer() {
        let mailer: Box<dyn EmailSender> = Box::new(MockMailer);
        mailer
            .send("buyer@example.com", "Order confirmed", "<p>Thanks!</p>")
            .await
            .expect("mock send should succeed");
    }
}
