//! # Stockwatch Tracker
//!
//! The polling core: a replaceable HTTP session, a stock checker that
//! recovers from stale credentials, and the jittered loop driving it.
//!
//! ```text
//! Tracker (jittered sleep loop)
//!   └── StockChecker::check()
//!         ├── SessionManager::fetch() ── GET product API
//!         │     └── 401/403 → refresh() (swap in a new session), retry
//!         ├── other errors → backoff 5s, 10s → Inconclusive
//!         └── in stock → Notifier
//!
//! supervise(): tracker task vs. shutdown → stop / crash notification
//! ```

pub mod checker;
pub mod engine;
pub mod headers;
pub mod lifecycle;
pub mod session;

pub use checker::{CheckReport, RetryPolicy, StockChecker};
pub use engine::{RunSummary, Tracker, jittered};
pub use headers::{RequestTemplate, transaction_id};
pub use lifecycle::{RunExit, STOP_MESSAGE, crash_message, panic_reason, supervise};
pub use session::{ProductSession, RawResponse, SessionManager};
