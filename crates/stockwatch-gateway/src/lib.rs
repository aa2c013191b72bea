//! # Stockwatch Gateway
//! Liveness endpoints so hosting platforms can see the tracker is up.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
