//! # Stockwatch Core
//! Shared configuration, error taxonomy, domain types and traits.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::TrackerConfig;
pub use error::{ConfigError, FetchError, Result, StockwatchError};
pub use traits::{Notifier, RecordingSleeper, Sleeper, TokioSleeper};
pub use types::{AttemptOutcome, PollAttempt, Product, StockResult};
