//! Trait seams between the tracker and the outside world.

pub mod notifier;
pub mod sleeper;

pub use notifier::Notifier;
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
