//! # Stockwatch Channels
//! Notification channel implementations.

pub mod telegram;

pub use telegram::TelegramNotifier;
