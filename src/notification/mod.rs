//! Outbound alert delivery.

pub mod slack;

pub use slack::SlackNotifier;

use async_trait::async_trait;

/// Best-effort message sink. Implementations log their own failures; nothing
/// propagates back to the detector.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &str);
}
