//! Notifier trait — delivers plain-text alerts to one fixed destination.

use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name, for logs.
    fn name(&self) -> &str;

    /// Send a message. Implementations retry internally and report the final
    /// outcome; they never fail the caller.
    async fn notify(&self, text: &str) -> bool;
}
