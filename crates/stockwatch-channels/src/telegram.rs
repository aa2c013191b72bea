//! Telegram Bot channel — plain-text alerts via `sendMessage`, with retry.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use stockwatch_core::config::TelegramConfig;
use stockwatch_core::error::{Result, StockwatchError};
use stockwatch_core::traits::{Notifier, Sleeper, TokioSleeper};

/// Total send attempts per notification.
const MAX_ATTEMPTS: u32 = 3;

/// Telegram notifier bound to a single chat.
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: reqwest::Client,
    backoff_base: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            backoff_base: Duration::from_secs(1),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the timer used between retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    /// Delay after the given failed attempt (0-based): 1s, 2s, 4s...
    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.pow(attempt)
    }

    /// Send a text message to the configured chat. Single try.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| StockwatchError::Notify(format!("sendMessage failed: {e}")))?;

        let status = response.status();
        let result: TelegramApiResponse<serde_json::Value> = response.json().await.map_err(|e| {
            StockwatchError::Notify(format!("Invalid send response ({status}): {e}"))
        })?;

        if !result.ok {
            return Err(StockwatchError::Notify(format!(
                "Send failed: {}",
                result.description.unwrap_or_else(|| status.to_string())
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, text: &str) -> bool {
        for attempt in 0..MAX_ATTEMPTS {
            match self.send_message(text).await {
                Ok(()) => {
                    tracing::info!("✅ Telegram notification sent successfully");
                    return true;
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Telegram notification failed (attempt {}/{}): {e}",
                        attempt + 1,
                        MAX_ATTEMPTS
                    );
                    if attempt + 1 < MAX_ATTEMPTS {
                        self.sleeper.sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }
        false
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}
