//! Tracker engine — the main loop that checks stock and sleeps in between.
//! Runs until the product is found; interrupts are handled in `lifecycle`.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use stockwatch_core::config::TrackerConfig;
use stockwatch_core::traits::{Notifier, Sleeper};
use stockwatch_core::types::StockResult;

use crate::checker::StockChecker;
use crate::session::{ProductSession, SessionManager};

/// Maximum relative deviation applied to the check interval.
const JITTER_FRACTION: f64 = 0.1;

/// How a finished run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Checks performed, the successful one included.
    pub checks: u64,
    pub result: StockResult,
}

/// The polling loop around a [`StockChecker`].
pub struct Tracker<S = SessionManager> {
    checker: StockChecker<S>,
    notifier: Arc<dyn Notifier>,
    sleeper: Arc<dyn Sleeper>,
    interval: Duration,
    product_name: String,
}

impl<S: ProductSession> Tracker<S> {
    pub fn new(
        checker: StockChecker<S>,
        notifier: Arc<dyn Notifier>,
        sleeper: Arc<dyn Sleeper>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            checker,
            notifier,
            sleeper,
            interval: Duration::from_secs(config.tracker.check_interval_secs),
            product_name: config.product.display_name.clone(),
        }
    }

    pub fn checker(&self) -> &StockChecker<S> {
        &self.checker
    }

    fn startup_message(&self) -> String {
        format!(
            "🤖 Stock Tracker Started\nMonitoring: {}\nCheck interval: {} minutes",
            self.product_name,
            self.interval.as_secs() / 60
        )
    }

    /// Log the banner and send the startup notification.
    pub async fn announce(&self) {
        let secs = self.interval.as_secs();
        tracing::info!("{}", "=".repeat(50));
        tracing::info!("{} Stock Tracker Started", self.product_name);
        tracing::info!("Check Interval: {} seconds ({} minutes)", secs, secs / 60);
        tracing::info!(
            "Started at: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        tracing::info!("{}", "=".repeat(50));

        if !self.notifier.notify(&self.startup_message()).await {
            tracing::warn!("⚠️ Startup notification could not be delivered");
        }
    }

    /// Announce, then check until the product is found.
    pub async fn run(&mut self) -> RunSummary {
        self.announce().await;

        let mut checks = 0u64;
        loop {
            checks += 1;
            tracing::info!(
                "🔍 Check #{checks} at {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );

            let result = self.checker.check().await;
            if result.is_found() {
                tracing::info!("🎉 Product found in stock! Stopping tracker.");
                return RunSummary { checks, result };
            }

            let sleep_for = jittered(self.interval, &mut rand::thread_rng());
            tracing::info!(
                "😴 Sleeping for {:.0} seconds until next check...",
                sleep_for.as_secs_f64()
            );
            self.sleeper.sleep(sleep_for).await;
        }
    }
}

/// `interval` shifted by a uniform random ±10%.
pub fn jittered<R: Rng>(interval: Duration, rng: &mut R) -> Duration {
    let base = interval.as_secs_f64();
    let jitter = rng.gen_range(-JITTER_FRACTION..=JITTER_FRACTION) * base;
    Duration::from_secs_f64((base + jitter).max(0.0))
}
