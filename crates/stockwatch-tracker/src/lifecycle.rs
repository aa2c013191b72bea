//! Run lifecycle: wait for the tracker task or a shutdown request, and send
//! the final notification.

use std::future::Future;
use stockwatch_core::traits::Notifier;
use tokio::task::{JoinError, JoinHandle};

use crate::engine::RunSummary;

/// Sent when the tracker is interrupted.
pub const STOP_MESSAGE: &str = "🛑 Stock tracker stopped manually";

/// Alert sent when the tracker dies on an unexpected error.
pub fn crash_message(reason: &str) -> String {
    format!("💥 Tracker crashed: {reason}")
}

/// How a supervised run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunExit {
    /// The loop returned on its own.
    Finished(RunSummary),
    /// Shutdown was requested first; the task was aborted.
    Stopped,
    /// The task panicked or was cancelled. Holds the reason.
    Crashed(String),
}

/// Wait for `handle` or `shutdown`, whichever comes first.
///
/// On shutdown the task is aborted and [`STOP_MESSAGE`] is sent. On a
/// panic the crash alert is sent. A clean finish sends nothing.
pub async fn supervise<F>(
    mut handle: JoinHandle<RunSummary>,
    shutdown: F,
    notifier: &dyn Notifier,
) -> RunExit
where
    F: Future<Output = ()>,
{
    tokio::select! {
        joined = &mut handle => match joined {
            Ok(summary) => {
                tracing::info!(
                    "✅ Tracker finished after {} check(s): {}",
                    summary.checks,
                    summary.result
                );
                RunExit::Finished(summary)
            }
            Err(e) => {
                let reason = panic_reason(e);
                let message = crash_message(&reason);
                tracing::error!("{message}");
                if !notifier.notify(&message).await {
                    tracing::warn!("⚠️ Crash notification could not be delivered");
                }
                RunExit::Crashed(reason)
            }
        },
        _ = shutdown => {
            handle.abort();
            tracing::info!("👋 Tracker stopped by user");
            if !notifier.notify(STOP_MESSAGE).await {
                tracing::warn!("⚠️ Stop notification could not be delivered");
            }
            RunExit::Stopped
        }
    }
}

/// Panic message of a failed task, or the join error itself.
pub fn panic_reason(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
