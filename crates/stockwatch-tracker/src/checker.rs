//! Stock checker — one polling invocation with retry, backoff and session
//! recovery.
//!
//! Per invocation: `Requesting → Classifying → {Succeeded, Retrying, Exhausted}`.
//!
//! | Response | Action | Retry budget |
//! |----------|--------|--------------|
//! | 401 / 403 | refresh session, wait 2s, retry | not consumed |
//! | other non-200, transport error | backoff 5s · 2^(n-1), retry | consumed |
//! | 200 without product data | `Inconclusive` | — |
//! | 200 with product data | `Found` / `NotFound` | — |

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use stockwatch_core::config::ProductConfig;
use stockwatch_core::error::{FetchError, Result, is_auth_status};
use stockwatch_core::traits::{Notifier, Sleeper};
use stockwatch_core::types::{AttemptOutcome, PollAttempt, Product, StockResult};

use crate::headers::RequestTemplate;
use crate::session::{ProductSession, RawResponse, SessionManager};

/// Retry configuration for a single check.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Bounded attempts for generic failures.
    pub max_retries: u32,
    /// Delay after the first generic failure; doubles each time.
    pub initial_backoff: Duration,
    /// Fixed wait after a session refresh.
    pub auth_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(5),
            auth_retry_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the `attempt`-th failure (1-based): 5s, 10s, 20s...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.pow(attempt.saturating_sub(1))
    }
}

/// Everything that happened during one check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub result: StockResult,
    pub attempts: Vec<PollAttempt>,
    /// Session refreshes triggered by 401/403.
    pub refreshes: u32,
    /// Bounded retry budget consumed.
    pub retries_used: u32,
}

/// How a single response was classified.
enum Classified {
    Auth(u16),
    Retry(AttemptOutcome, String),
    Done(AttemptOutcome, StockResult),
}

pub struct StockChecker<S = SessionManager> {
    session: S,
    notifier: Arc<dyn Notifier>,
    sleeper: Arc<dyn Sleeper>,
    template: RequestTemplate,
    api_url: String,
    shop_link: String,
    policy: RetryPolicy,
}

impl<S: ProductSession> StockChecker<S> {
    pub fn new(
        session: S,
        product: &ProductConfig,
        notifier: Arc<dyn Notifier>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        Ok(Self {
            session,
            notifier,
            sleeper,
            template: RequestTemplate::new(product)?,
            api_url: product.api_url(),
            shop_link: product.referer(),
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Run one check and return only the result.
    pub async fn check(&mut self) -> StockResult {
        self.check_detailed().await.result
    }

    /// Run one check. Never fails: every classifiable problem ends up in the
    /// returned result.
    pub async fn check_detailed(&mut self) -> CheckReport {
        let max = self.policy.max_retries;
        let mut attempt = 0u32;
        let mut report = CheckReport {
            result: StockResult::Inconclusive,
            attempts: Vec::new(),
            refreshes: 0,
            retries_used: 0,
        };

        while attempt < max {
            let headers = self.template.headers();
            let classified = match self.session.fetch(&self.api_url, headers).await {
                Ok(response) => classify_response(&response),
                Err(e) => classify_error(e),
            };

            match classified {
                Classified::Auth(status) => {
                    tracing::warn!("🔐 {status} {} - refreshing session...", auth_label(status));
                    report.attempts.push(PollAttempt {
                        attempt,
                        outcome: AttemptOutcome::AuthFailure { status },
                    });
                    self.session.refresh();
                    report.refreshes += 1;
                    // Same attempt index; the retry budget is untouched
                    self.sleeper.sleep(self.policy.auth_retry_delay).await;
                    continue;
                }
                Classified::Retry(outcome, message) => {
                    tracing::error!("❌ {message} (attempt {}/{max})", attempt + 1);
                    report.attempts.push(PollAttempt { attempt, outcome });
                    attempt += 1;
                    report.retries_used = attempt;
                }
                Classified::Done(outcome, result) => {
                    report.attempts.push(PollAttempt { attempt, outcome });
                    self.report_result(&result).await;
                    report.result = result;
                    return report;
                }
            }

            if attempt < max {
                let backoff = self.policy.backoff(attempt);
                tracing::info!("⏳ Retrying in {} seconds...", backoff.as_secs());
                self.sleeper.sleep(backoff).await;
            }
        }

        tracing::error!("❌ All retry attempts failed");
        report
    }

    async fn report_result(&self, result: &StockResult) {
        match result {
            StockResult::Found {
                name,
                quantity,
                price,
            } => {
                tracing::info!("🎉 PRODUCT IN STOCK! {name} - {quantity} units available");
                let message = in_stock_message(name, quantity, price, &self.shop_link);
                if !self.notifier.notify(&message).await {
                    tracing::warn!(
                        "⚠️ In-stock alert could not be delivered via {}",
                        self.notifier.name()
                    );
                }
            }
            StockResult::NotFound => {}
            StockResult::Inconclusive => {
                tracing::warn!("⚠️ No product data found in API response");
            }
        }
    }
}

/// Alert text for an in-stock product.
pub fn in_stock_message(name: &str, quantity: &str, price: &str, link: &str) -> String {
    format!("✅ IN STOCK: {name}\nAvailable: {quantity}\nPrice: ₹{price}\n👉 {link}")
}

fn auth_label(status: u16) -> &'static str {
    if status == 401 { "Unauthorized" } else { "Forbidden" }
}

fn classify_response(response: &RawResponse) -> Classified {
    if is_auth_status(response.status) {
        return Classified::Auth(response.status);
    }
    if response.status != 200 {
        return Classified::Retry(
            AttemptOutcome::HttpError {
                status: response.status,
            },
            format!("HTTP {} error", response.status),
        );
    }

    let body: Value = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(e) => {
            return Classified::Retry(
                AttemptOutcome::Transport { kind: "decode" },
                format!("Unexpected API response format: {e}"),
            );
        }
    };

    let product = body
        .get("data")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|first| serde_json::from_value::<Product>(first.clone()).ok());

    let Some(product) = product else {
        return Classified::Done(AttemptOutcome::NoData, StockResult::Inconclusive);
    };

    let name = product.display_name();
    if product.in_stock() {
        Classified::Done(
            AttemptOutcome::InStock,
            StockResult::Found {
                name,
                quantity: product.quantity(),
                price: product.display_price(),
            },
        )
    } else {
        tracing::info!("📦 Product still out of stock: {name}");
        Classified::Done(AttemptOutcome::OutOfStock, StockResult::NotFound)
    }
}

fn classify_error(error: FetchError) -> Classified {
    if let Some(status) = error.status() {
        if is_auth_status(status) {
            return Classified::Auth(status);
        }
        return Classified::Retry(
            AttemptOutcome::HttpError { status },
            format!("HTTP error: {error}"),
        );
    }
    let message = match &error {
        FetchError::Timeout => "Request timeout".to_string(),
        FetchError::Connect(_) => "Connection error".to_string(),
        other => other.to_string(),
    };
    Classified::Retry(
        AttemptOutcome::Transport {
            kind: error.kind(),
        },
        message,
    )
}
